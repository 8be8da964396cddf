//! Answers to memory queries, built only from stored history

use serde::Serialize;

use super::phrases::{MemoryIntent, PhraseTable, ASPECT_MARKERS, MEMORY_PHRASES};
use crate::language::Language;
use crate::session::{MessageRecord, SessionStore};

/// Which part of the history a memory query asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAspect {
    LastQuestion,
    LastAnswer,
    Combined,
    /// Nothing more specific could be told apart
    Generic,
}

/// Fixed answer texts of one language
///
/// `{query}` and `{response}` are replaced with the stored exchange verbatim.
#[derive(Debug, Clone, Copy)]
pub struct ResponseTemplates {
    pub no_history: &'static str,
    pub question: &'static str,
    pub answer: &'static str,
    pub combined: &'static str,
}

pub const BENGALI_TEMPLATES: ResponseTemplates = ResponseTemplates {
    no_history: "আপনি এখনো কোনো প্রশ্ন করেননি। এটিই আমাদের কথোপকথনের প্রথম প্রশ্ন।",
    question: "আপনার শেষ প্রশ্ন ছিল: \"{query}\"",
    answer: "আমার শেষ উত্তর ছিল: \"{response}\"",
    combined: "আপনার শেষ প্রশ্ন ছিল: \"{query}\"\nআমার উত্তর ছিল: \"{response}\"",
};

pub const ENGLISH_TEMPLATES: ResponseTemplates = ResponseTemplates {
    no_history: "You haven't asked any question yet. This is the first question of our conversation.",
    question: "Your last question was: \"{query}\"",
    answer: "My last answer was: \"{response}\"",
    combined: "Your last question was: \"{query}\"\nMy answer was: \"{response}\"",
};

impl ResponseTemplates {
    /// Templates for a query language; mixed queries get the Bengali ones
    pub fn for_language(language: Language) -> &'static ResponseTemplates {
        match language {
            Language::En => &ENGLISH_TEMPLATES,
            Language::Bn | Language::Mixed => &BENGALI_TEMPLATES,
        }
    }

    fn render(&self, aspect: HistoryAspect, last: &MessageRecord) -> String {
        let template = match aspect {
            HistoryAspect::LastQuestion => self.question,
            HistoryAspect::LastAnswer => self.answer,
            HistoryAspect::Combined | HistoryAspect::Generic => self.combined,
        };
        fill(template, &last.query, &last.response)
    }
}

/// Substitute placeholders in one pass so stored text is never re-expanded
fn fill(template: &str, query: &str, response: &str) -> String {
    let mut out = String::with_capacity(template.len() + query.len() + response.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{query}") {
            out.push_str(query);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{response}") {
            out.push_str(response);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Answer synthesized from conversation history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryAnswer {
    pub answer: String,
    pub language: Language,
    pub aspect: HistoryAspect,
    /// Always 1.0: the answer restates stored history
    pub confidence: f64,
    /// Always empty: no corpus passage is involved
    pub sources: Vec<String>,
    pub is_memory_answer: bool,
}

/// Renders memory answers; never touches retrieval or generation
#[derive(Debug, Clone)]
pub struct MemoryResponder {
    markers: PhraseTable,
    phrases: PhraseTable,
}

impl Default for MemoryResponder {
    fn default() -> Self {
        Self::new(ASPECT_MARKERS.clone(), MEMORY_PHRASES.clone())
    }
}

impl MemoryResponder {
    /// Responder over custom aspect markers and memory phrases
    pub fn new(markers: PhraseTable, phrases: PhraseTable) -> Self {
        Self { markers, phrases }
    }

    /// Tell which part of the history the query asks for
    pub fn aspect(&self, query: &str, language: Language) -> HistoryAspect {
        let text = query.to_lowercase();
        let asks_question = self
            .markers
            .contains_intent(&text, language, MemoryIntent::LastQuestion);
        let asks_answer = self
            .markers
            .contains_intent(&text, language, MemoryIntent::LastAnswer);

        match (asks_question, asks_answer) {
            (true, true) => HistoryAspect::Combined,
            (true, false) => HistoryAspect::LastQuestion,
            (false, true) => HistoryAspect::LastAnswer,
            (false, false) => {
                if self
                    .phrases
                    .contains_intent(&text, language, MemoryIntent::Combined)
                {
                    HistoryAspect::Combined
                } else {
                    HistoryAspect::Generic
                }
            }
        }
    }

    /// Answer a memory query from `history`, oldest message first
    pub fn respond(
        &self,
        query: &str,
        language: Language,
        history: &[MessageRecord],
    ) -> MemoryAnswer {
        let templates = ResponseTemplates::for_language(language);
        let aspect = self.aspect(query, language);

        let answer = match history.last() {
            None => templates.no_history.to_string(),
            Some(last) => templates.render(aspect, last),
        };

        MemoryAnswer {
            answer,
            language,
            aspect,
            confidence: 1.0,
            sources: Vec::new(),
            is_memory_answer: true,
        }
    }

    /// Answer a memory query about a stored session
    ///
    /// Reads only the most recent exchange and appends nothing; logging the
    /// memory exchange is up to the caller.
    pub fn answer_from_store(
        &self,
        store: &SessionStore,
        session_id: &str,
        query: &str,
        language: Language,
    ) -> crate::Result<MemoryAnswer> {
        let history = store.get_history(session_id, Some(1))?;
        Ok(self.respond(query, language, &history))
    }
}
