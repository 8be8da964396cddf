//! Query routing between conversation memory and the answer source
//!
//! A query about the conversation itself is answered from session history;
//! everything else goes to the retrieval and generation collaborator behind
//! [`AnswerSource`]. Either way the exchange is appended to the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::language::{normalize_query, Language, LanguageDetector, ScriptRatioDetector};
use crate::memory::{MemoryAnswer, MemoryQueryClassifier, MemoryResponder};
use crate::session::SessionManager;
use crate::utils::{clamp_confidence, truncate_chars};

const BENGALI_FALLBACKS: [&str; 3] = [
    "আমার এই বিষয়ে জ্ঞান নেই। আরো নির্দিষ্ট প্রশ্ন করার চেষ্টা করুন।",
    "এই প্রশ্নের উত্তর আমার জানা নেই। অন্যভাবে জিজ্ঞাসা করুন।",
    "আমি এই বিষয়ে তথ্য খুঁজে পাচ্ছি না। আরো স্পষ্ট প্রশ্ন করুন।",
];

const ENGLISH_FALLBACKS: [&str; 3] = [
    "I don't have knowledge about this. Please try asking more specifically.",
    "I cannot find information about this. Please rephrase your question.",
    "I don't have data on this topic. Try asking in a different way.",
];

/// Answer produced by the retrieval and generation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub answer: String,
    pub confidence: f64,
    /// Identifiers of the corpus passages the answer is grounded on
    pub sources: Vec<String>,
}

/// Retrieval and generation collaborator for corpus questions
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Answer `query` given the rendered recent exchanges of the session
    async fn answer(
        &self,
        query: &str,
        language: Language,
        chat_context: &str,
    ) -> crate::Result<AnswerDraft>;
}

/// Result of routing one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub session_id: String,
    pub answer: String,
    pub language: Language,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub is_memory_answer: bool,
    /// The answer source failed or came back empty
    pub fallback: bool,
}

/// Fixed answer used when the answer source has nothing to offer
///
/// The variant is picked from the query text, so the same query always gets
/// the same text.
pub fn fallback_answer(query: &str, language: Language) -> &'static str {
    let variants = match language {
        Language::Bn => &BENGALI_FALLBACKS,
        Language::En | Language::Mixed => &ENGLISH_FALLBACKS,
    };
    let index = query.bytes().map(usize::from).sum::<usize>() % variants.len();
    variants[index]
}

/// Routes queries of every session through memory or the answer source
pub struct Conversation {
    sessions: SessionManager,
    detector: Arc<dyn LanguageDetector>,
    source: Arc<dyn AnswerSource>,
    classifier: MemoryQueryClassifier,
    responder: MemoryResponder,
}

impl Conversation {
    /// Conversation using script-ratio language detection
    pub fn new(sessions: SessionManager, source: Arc<dyn AnswerSource>) -> Self {
        Self::with_detector(sessions, source, Arc::new(ScriptRatioDetector))
    }

    /// Conversation with a custom language detector
    pub fn with_detector(
        sessions: SessionManager,
        source: Arc<dyn AnswerSource>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            sessions,
            detector,
            source,
            classifier: MemoryQueryClassifier::default(),
            responder: MemoryResponder::default(),
        }
    }

    /// Replace the memory classifier and responder
    pub fn with_memory(
        mut self,
        classifier: MemoryQueryClassifier,
        responder: MemoryResponder,
    ) -> Self {
        self.classifier = classifier;
        self.responder = responder;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Whether a normalized query asks about the conversation itself
    pub fn is_memory_query(&self, query: &str, language: Language) -> bool {
        self.classifier.is_memory_query(query, language)
    }

    /// Answer a memory query from a session's history without appending it
    pub fn answer_memory_query(
        &self,
        session_id: &str,
        query: &str,
        language: Language,
    ) -> crate::Result<MemoryAnswer> {
        self.responder
            .answer_from_store(self.sessions.store(), session_id, query, language)
    }

    /// Answer one query within a session
    ///
    /// A missing or unknown session is replaced by a new one, whose id is
    /// reported in the outcome. Only session creation can fail.
    pub async fn process_query(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> crate::Result<QueryOutcome> {
        info!("Processing query: {}", truncate_chars(query, 50));

        let session_id = self.resolve_session(session_id)?;
        let normalized = normalize_query(query);
        let language = self.detector.detect(&normalized);
        debug!("Query language: {}", language);

        let outcome = if self.classifier.is_memory_query(&normalized, language) {
            self.memory_outcome(&session_id, &normalized, language)
        } else {
            self.source_outcome(&session_id, query, &normalized, language).await
        };

        if let Err(e) = self.sessions.append_message(
            &session_id,
            query.trim(),
            &outcome.answer,
            language,
            outcome.confidence,
            outcome.sources.clone(),
        ) {
            warn!("Exchange not recorded for session {}: {}", session_id, e);
        }

        Ok(outcome)
    }

    fn resolve_session(&self, session_id: Option<&str>) -> crate::Result<String> {
        match session_id {
            Some(id) if self.sessions.ensure_session(id) => Ok(id.to_string()),
            Some(id) => {
                info!("Unknown session {}, starting a new one", id);
                self.sessions.create_session()
            }
            None => self.sessions.create_session(),
        }
    }

    fn memory_outcome(&self, session_id: &str, query: &str, language: Language) -> QueryOutcome {
        info!("Answering memory query for session {}", session_id);
        match self.answer_memory_query(session_id, query, language) {
            Ok(memory) => QueryOutcome {
                session_id: session_id.to_string(),
                answer: memory.answer,
                language,
                confidence: memory.confidence,
                sources: memory.sources,
                is_memory_answer: true,
                fallback: false,
            },
            Err(e) => {
                warn!("Memory answer failed for session {}: {}", session_id, e);
                fallback_outcome(session_id, query, language)
            }
        }
    }

    async fn source_outcome(
        &self,
        session_id: &str,
        query: &str,
        normalized: &str,
        language: Language,
    ) -> QueryOutcome {
        let chat_context = match self.sessions.context_for_query(session_id) {
            Ok(context) => context,
            Err(e) => {
                warn!("No chat context for session {}: {}", session_id, e);
                String::new()
            }
        };

        match self.source.answer(normalized, language, &chat_context).await {
            Ok(draft) if !draft.answer.trim().is_empty() => QueryOutcome {
                session_id: session_id.to_string(),
                answer: draft.answer,
                language,
                confidence: clamp_confidence(draft.confidence),
                sources: draft.sources,
                is_memory_answer: false,
                fallback: false,
            },
            Ok(_) => {
                debug!("Answer source returned nothing, using fallback");
                fallback_outcome(session_id, query, language)
            }
            Err(e) => {
                warn!("Answer source failed, using fallback: {}", e);
                fallback_outcome(session_id, query, language)
            }
        }
    }
}

fn fallback_outcome(session_id: &str, query: &str, language: Language) -> QueryOutcome {
    QueryOutcome {
        session_id: session_id.to_string(),
        answer: fallback_answer(query, language).to_string(),
        language,
        confidence: 0.0,
        sources: Vec::new(),
        is_memory_answer: false,
        fallback: true,
    }
}
