//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();
    let memory = &config.memory;

    if memory.max_session_memory == 0 {
        errors.push("memory.max_session_memory must be > 0".to_string());
    }
    if memory.max_active_sessions == 0 {
        errors.push("memory.max_active_sessions must be > 0".to_string());
    }
    if memory.session_timeout_secs == 0 {
        errors.push("memory.session_timeout_secs must be > 0".to_string());
    }
    if memory.history_limit == 0 {
        errors.push("memory.history_limit must be > 0".to_string());
    }
    if memory.persistence.enabled && memory.persistence.path.as_os_str().is_empty() {
        errors.push("memory.persistence.path is required when persistence is enabled".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.to_ascii_lowercase().as_str()) {
        errors.push(format!(
            "logging.format must be one of {}",
            LOG_FORMATS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.memory.max_active_sessions = 0;
        config.memory.session_timeout_secs = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("memory.max_active_sessions"));
        assert!(err.contains("memory.session_timeout_secs"));
    }

    #[test]
    fn test_validate_persistence_path_required_when_enabled() {
        let mut config = Config::default();
        config.memory.persistence.path = PathBuf::new();
        assert!(validate_config(&config).is_err());

        config.memory.persistence.enabled = false;
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
