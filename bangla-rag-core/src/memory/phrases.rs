//! Phrase tables driving memory-query detection
//!
//! Matching is plain substring containment over the lower-cased query. Adding
//! a language or a phrase only touches the tables below.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::language::Language;

/// What part of the conversation a phrase refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryIntent {
    /// The user's previous question
    LastQuestion,
    /// The assistant's previous answer
    LastAnswer,
    /// The previous exchange or the conversation as a whole
    Combined,
}

/// Phrases of one language signalling one intent
#[derive(Debug, Clone)]
pub struct PhraseSet {
    pub language: Language,
    pub intent: MemoryIntent,
    pub phrases: Vec<String>,
}

/// Ordered collection of phrase sets
#[derive(Debug, Clone, Default)]
pub struct PhraseTable {
    sets: Vec<PhraseSet>,
}

impl PhraseTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add phrases for a language and intent; phrases are stored lower-cased
    pub fn with(mut self, language: Language, intent: MemoryIntent, phrases: &[&str]) -> Self {
        self.add(language, intent, phrases.iter().copied());
        self
    }

    /// Add phrases for a language and intent
    pub fn add<'a>(
        &mut self,
        language: Language,
        intent: MemoryIntent,
        phrases: impl IntoIterator<Item = &'a str>,
    ) {
        let phrases = phrases.into_iter().map(|p| p.to_lowercase()).collect();
        self.sets.push(PhraseSet {
            language,
            intent,
            phrases,
        });
    }

    /// Sets consulted for `language`; mixed queries consult every set
    pub fn sets_for(&self, language: Language) -> impl Iterator<Item = &PhraseSet> {
        self.sets
            .iter()
            .filter(move |set| language == Language::Mixed || set.language == language)
    }

    /// First phrase of the table contained in `text`, with its intent
    ///
    /// `text` must already be lower-cased.
    pub fn find(&self, text: &str, language: Language) -> Option<(MemoryIntent, &str)> {
        self.sets_for(language).find_map(|set| {
            set.phrases
                .iter()
                .find(|phrase| text.contains(phrase.as_str()))
                .map(|phrase| (set.intent, phrase.as_str()))
        })
    }

    /// Whether any phrase of `intent` for `language` is contained in `text`
    pub fn contains_intent(&self, text: &str, language: Language, intent: MemoryIntent) -> bool {
        self.sets_for(language)
            .filter(|set| set.intent == intent)
            .any(|set| set.phrases.iter().any(|p| text.contains(p.as_str())))
    }
}

/// Phrases that mark a query as being about the conversation itself
pub static MEMORY_PHRASES: Lazy<PhraseTable> = Lazy::new(|| {
    PhraseTable::new()
        .with(
            Language::Bn,
            MemoryIntent::LastQuestion,
            &[
                "শেষ প্রশ্ন",
                "আগের প্রশ্ন",
                "পূর্বের প্রশ্ন",
                "আগে কী জিজ্ঞেস",
                "আগে কি জিজ্ঞেস",
                "আমি কী জিজ্ঞেস",
                "আমি কি জিজ্ঞেস",
                "কী প্রশ্ন করেছিলাম",
                "কি প্রশ্ন করেছিলাম",
            ],
        )
        .with(
            Language::Bn,
            MemoryIntent::LastAnswer,
            &[
                "শেষ উত্তর",
                "আগের উত্তর",
                "পূর্বের উত্তর",
                "তুমি কী বলেছিলে",
                "তুমি কি বলেছিলে",
                "আপনি কী বলেছিলেন",
                "আপনি কি বলেছিলেন",
                "কী উত্তর দিয়েছিলে",
                "কি উত্তর দিয়েছিলে",
            ],
        )
        .with(
            Language::Bn,
            MemoryIntent::Combined,
            &[
                "আগের কথোপকথন",
                "শেষ কথোপকথন",
                "আমাদের আলোচনা",
                "আগে কী কথা",
                "আগে কি কথা",
            ],
        )
        .with(
            Language::En,
            MemoryIntent::LastQuestion,
            &[
                "last question",
                "last query",
                "previous question",
                "previous query",
                "earlier question",
                "my question",
                "what did i ask",
                "i asked",
            ],
        )
        .with(
            Language::En,
            MemoryIntent::LastAnswer,
            &[
                "last answer",
                "previous answer",
                "last response",
                "previous response",
                "your answer",
                "you answered",
                "what did you say",
                "you said",
            ],
        )
        .with(
            Language::En,
            MemoryIntent::Combined,
            &[
                "our conversation",
                "conversation history",
                "chat history",
                "last exchange",
                "we discussed",
                "we talked about",
                "previously",
                // single word, matches ordinary content questions too
                "before",
            ],
        )
});

/// Single words telling a question apart from an answer inside a memory query
pub static ASPECT_MARKERS: Lazy<PhraseTable> = Lazy::new(|| {
    PhraseTable::new()
        .with(
            Language::Bn,
            MemoryIntent::LastQuestion,
            &["প্রশ্ন", "জিজ্ঞেস", "জিজ্ঞাসা"],
        )
        .with(
            Language::Bn,
            MemoryIntent::LastAnswer,
            &["উত্তর", "জবাব", "বলেছিলে", "বলেছিলেন"],
        )
        .with(
            Language::En,
            MemoryIntent::LastQuestion,
            &["question", "query", "ask"],
        )
        .with(
            Language::En,
            MemoryIntent::LastAnswer,
            &["answer", "response", "reply", "said", "say"],
        )
});
