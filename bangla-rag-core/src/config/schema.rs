//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for bangla-rag
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Days to keep rotated log files
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u64,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            overrides: HashMap::new(),
        }
    }
}

/// Session memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum messages kept per session; oldest are dropped first
    #[serde(default = "default_max_session_memory")]
    pub max_session_memory: usize,
    /// Inactivity window after which a session expires
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Maximum sessions held in memory at once
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions: usize,
    /// Persist the store every N appended messages (0 disables)
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval: u64,
    /// Default number of messages returned by history lookups in the pipeline
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Exchanges rendered into the chat context handed to the answer source
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,
    /// Character cap of the rendered chat context
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,
    /// Disk persistence of the session document
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

fn default_max_session_memory() -> usize {
    50
}

fn default_session_timeout_secs() -> u64 {
    3600
}

fn default_max_active_sessions() -> usize {
    100
}

fn default_autosave_interval() -> u64 {
    5
}

fn default_history_limit() -> usize {
    10
}

fn default_context_messages() -> usize {
    3
}

fn default_context_max_chars() -> usize {
    500
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_session_memory: default_max_session_memory(),
            session_timeout_secs: default_session_timeout_secs(),
            max_active_sessions: default_max_active_sessions(),
            autosave_interval: default_autosave_interval(),
            history_limit: default_history_limit(),
            context_messages: default_context_messages(),
            context_max_chars: default_context_max_chars(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Memory configuration without disk persistence
    pub fn in_memory() -> Self {
        Self {
            persistence: PersistenceConfig {
                enabled: false,
                ..PersistenceConfig::default()
            },
            ..Self::default()
        }
    }

    /// Session timeout as fractional seconds, matching store timestamps
    pub fn timeout_secs_f64(&self) -> f64 {
        self.session_timeout_secs as f64
    }
}

/// Persistence of the session document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether sessions are written to disk
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path of the JSON session document
    #[serde(default = "default_sessions_path")]
    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_sessions_path() -> PathBuf {
    PathBuf::from("memory").join("chat_sessions.json")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_sessions_path(),
        }
    }
}

impl PersistenceConfig {
    /// Path of the document when persistence is enabled
    pub fn active_path(&self) -> Option<&PathBuf> {
        self.enabled.then_some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.max_session_memory, 50);
        assert_eq!(config.session_timeout_secs, 3600);
        assert_eq!(config.max_active_sessions, 100);
        assert_eq!(config.autosave_interval, 5);
        assert!(config.persistence.enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"memory":{"max_active_sessions":2}}"#).unwrap();
        assert_eq!(config.memory.max_active_sessions, 2);
        assert_eq!(config.memory.max_session_memory, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_in_memory_disables_persistence() {
        let config = MemoryConfig::in_memory();
        assert!(config.persistence.active_path().is_none());
    }
}
