//! Query language tags, detection and normalization

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of Bengali-block characters above which a query counts as Bengali
const BENGALI_RATIO_THRESHOLD: f64 = 0.3;
/// Share of Latin letters that, alongside Bengali script, makes a query mixed
const LATIN_RATIO_THRESHOLD: f64 = 0.3;

/// Detected language of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Bengali
    Bn,
    /// English
    En,
    /// Bengali and English in one query
    Mixed,
}

impl Language {
    /// Wire tag of the language
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Bn => "bn",
            Language::En => "en",
            Language::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bn" => Ok(Language::Bn),
            "en" => Ok(Language::En),
            "mixed" => Ok(Language::Mixed),
            other => Err(crate::Error::Validation(format!(
                "unknown language tag '{}'",
                other
            ))),
        }
    }
}

/// Language detection collaborator consumed by the pipeline
pub trait LanguageDetector: Send + Sync {
    /// Tag a raw query
    fn detect(&self, query: &str) -> Language;
}

/// Detector based on the share of Bengali script in the query
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptRatioDetector;

impl LanguageDetector for ScriptRatioDetector {
    fn detect(&self, query: &str) -> Language {
        detect_language(query)
    }
}

fn is_bengali(c: char) -> bool {
    ('\u{0980}'..='\u{09FF}').contains(&c)
}

/// Tag a query as Bengali, English or mixed by character counts
pub fn detect_language(query: &str) -> Language {
    let mut total = 0usize;
    let mut bengali = 0usize;
    let mut latin = 0usize;

    for c in query.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_bengali(c) {
            bengali += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    if total == 0 {
        return Language::En;
    }

    let bengali_ratio = bengali as f64 / total as f64;
    let latin_ratio = latin as f64 / total as f64;

    if bengali_ratio > BENGALI_RATIO_THRESHOLD {
        if latin_ratio > LATIN_RATIO_THRESHOLD {
            Language::Mixed
        } else {
            Language::Bn
        }
    } else {
        Language::En
    }
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\u{0980}-\u{09FF}\w\s?।]").expect("valid regex"));

/// Trim, drop punctuation other than `?` and `।`, and collapse whitespace
pub fn normalize_query(query: &str) -> String {
    let stripped = DISALLOWED.replace_all(query.trim(), " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bengali() {
        assert_eq!(detect_language("অনুপমের বাবা কী করতেন?"), Language::Bn);
    }

    #[test]
    fn test_detect_english() {
        assert_eq!(detect_language("What did Anupam's father do?"), Language::En);
        assert_eq!(detect_language("   "), Language::En);
    }

    #[test]
    fn test_detect_english_with_quoted_bengali_word() {
        assert_eq!(
            detect_language("Who is referred to as 'সুপুরুষ' in Anupam's language?"),
            Language::En
        );
    }

    #[test]
    fn test_detect_mixed() {
        assert_eq!(detect_language("Anupam অনুপমের বাবা lawyer ছিলেন"), Language::Mixed);
    }

    #[test]
    fn test_normalize_keeps_bengali_punctuation() {
        assert_eq!(
            normalize_query("  কল্যাণী   কে?!  সে কোথায়। "),
            "কল্যাণী কে? সে কোথায়।"
        );
        assert_eq!(normalize_query("what's   my\tlast query?"), "what s my last query?");
    }

    #[test]
    fn test_language_tag_roundtrip() {
        assert_eq!("BN".parse::<Language>().unwrap(), Language::Bn);
        assert_eq!(Language::Mixed.to_string(), "mixed");
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), "\"en\"");
    }
}
