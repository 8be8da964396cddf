//! Detection of queries about the conversation rather than the corpus

use tracing::debug;

use super::phrases::{MemoryIntent, PhraseTable, MEMORY_PHRASES};
use crate::language::Language;

/// Stateless predicate over a query and its detected language
///
/// Any phrase of the language's table contained anywhere in the lower-cased
/// query is a hit. Recall is favoured over precision: an ordinary corpus
/// question containing a generic trigger such as "before" is classified as a
/// memory query.
#[derive(Debug, Clone)]
pub struct MemoryQueryClassifier {
    table: PhraseTable,
}

impl Default for MemoryQueryClassifier {
    fn default() -> Self {
        Self::new(MEMORY_PHRASES.clone())
    }
}

impl MemoryQueryClassifier {
    /// Classifier over a custom phrase table
    pub fn new(table: PhraseTable) -> Self {
        Self { table }
    }

    /// The intent a memory query refers to, or `None` for corpus queries
    pub fn classify(&self, query: &str, language: Language) -> Option<MemoryIntent> {
        let text = query.to_lowercase();
        let (intent, phrase) = self.table.find(&text, language)?;
        debug!("Memory query detected: matched '{}' ({:?})", phrase, intent);
        Some(intent)
    }

    /// Whether the query asks about the conversation itself
    pub fn is_memory_query(&self, query: &str, language: Language) -> bool {
        self.classify(query, language).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bengali_memory_queries() {
        let classifier = MemoryQueryClassifier::default();
        assert!(classifier.is_memory_query("আমার শেষ প্রশ্ন কী ছিল?", Language::Bn));
        assert!(classifier.is_memory_query("আগের উত্তরটা কী ছিল?", Language::Bn));
        assert!(classifier.is_memory_query(
            "আগের কথোপকথনে আমি কি জিজ্ঞেস করেছিলাম?",
            Language::Bn
        ));
    }

    #[test]
    fn test_english_memory_queries_are_case_insensitive() {
        let classifier = MemoryQueryClassifier::default();
        assert!(classifier.is_memory_query("what was my last query?", Language::En));
        assert!(classifier.is_memory_query("Tell me about my PREVIOUS question", Language::En));
        assert!(classifier.is_memory_query("What did you say?", Language::En));
    }

    #[test]
    fn test_corpus_queries_are_not_memory_queries() {
        let classifier = MemoryQueryClassifier::default();
        assert!(!classifier.is_memory_query("অনুপমের বাবা কী করতেন?", Language::Bn));
        assert!(!classifier.is_memory_query(
            "What was Kalyani's actual age at the time of marriage?",
            Language::En
        ));
    }

    #[test]
    fn test_language_tag_selects_table() {
        let classifier = MemoryQueryClassifier::default();
        assert!(!classifier.is_memory_query("what was my last query?", Language::Bn));
        assert!(classifier.is_memory_query("what was my last query?", Language::Mixed));
    }

    #[test]
    fn test_classify_reports_intent() {
        let classifier = MemoryQueryClassifier::default();
        assert_eq!(
            classifier.classify("শেষ উত্তর আবার বলো", Language::Bn),
            Some(MemoryIntent::LastAnswer)
        );
        assert_eq!(
            classifier.classify("show our conversation", Language::En),
            Some(MemoryIntent::Combined)
        );
    }

    #[test]
    fn test_generic_before_trigger_is_a_known_false_positive() {
        let classifier = MemoryQueryClassifier::default();
        assert!(classifier.is_memory_query("what happened before the wedding?", Language::En));
    }
}
