//! Session data structures

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::language::Language;

/// One logged query/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Seconds since the Unix epoch at which the exchange was stored
    pub timestamp: f64,
    /// Query text as the user sent it
    pub query: String,
    /// Answer returned for the query
    pub response: String,
    /// Detected language of the query
    pub language: Language,
    /// Confidence of the answer in `[0.0, 1.0]`
    pub confidence: f64,
    /// Owning session
    pub session_id: String,
    /// Identifiers of the passages the answer was grounded on
    #[serde(rename = "sources_used", default)]
    pub sources: Vec<String>,
}

/// One conversation's accumulated state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, `session_<epoch>_<suffix>`
    pub session_id: String,
    /// Creation time
    pub created_at: f64,
    /// Last read or write
    pub last_activity: f64,
    /// Stored exchanges, oldest first
    #[serde(default)]
    pub messages: VecDeque<MessageRecord>,
    /// Exchanges ever appended, including ones trimmed by the cap
    #[serde(default)]
    pub message_count: u64,
}

impl Session {
    /// Create an empty session
    pub fn new(session_id: impl Into<String>, now: f64) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_activity: now,
            messages: VecDeque::new(),
            message_count: 0,
        }
    }

    /// Record activity; never moves `last_activity` backwards
    pub fn touch(&mut self, now: f64) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Append an exchange, dropping the oldest ones beyond `cap`
    ///
    /// Returns how many messages were dropped.
    pub fn push_message(&mut self, message: MessageRecord, cap: usize) -> usize {
        let now = message.timestamp;
        self.messages.push_back(message);
        self.message_count += 1;

        let dropped = self.enforce_cap(cap);
        self.touch(now);
        dropped
    }

    /// Drop the oldest messages beyond `cap`, returning how many were dropped
    pub fn enforce_cap(&mut self, cap: usize) -> usize {
        let excess = self.messages.len().saturating_sub(cap);
        self.messages.drain(..excess);
        excess
    }

    /// The most recent `limit` messages in chronological order; all when `None`
    pub fn history(&self, limit: Option<usize>) -> Vec<MessageRecord> {
        let limit = limit.unwrap_or(self.messages.len());
        let start = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(start).cloned().collect()
    }

    /// Whether the session has been idle longer than `timeout_secs`
    pub fn is_expired(&self, now: f64, timeout_secs: f64) -> bool {
        now - self.last_activity > timeout_secs
    }

    /// Statistics computed from the stored messages
    pub fn stats(&self) -> SessionStats {
        let languages_used = self.messages.iter().map(|m| m.language).collect();
        let avg_confidence = mean(self.messages.iter().map(|m| m.confidence));

        SessionStats {
            session_id: self.session_id.clone(),
            message_count: self.messages.len(),
            total_exchanges: self.message_count,
            languages_used,
            avg_confidence: round_to(avg_confidence, 3),
            created_at: self.created_at,
            last_activity: self.last_activity,
            duration_seconds: self.last_activity - self.created_at,
        }
    }
}

/// Per-session statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub session_id: String,
    /// Messages currently stored
    pub message_count: usize,
    /// Exchanges ever appended
    pub total_exchanges: u64,
    pub languages_used: BTreeSet<Language>,
    pub avg_confidence: f64,
    pub created_at: f64,
    pub last_activity: f64,
    pub duration_seconds: f64,
}

/// Statistics across all sessions currently in memory
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GlobalStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub avg_messages_per_session: f64,
    pub language_distribution: BTreeMap<Language, usize>,
    pub avg_global_confidence: f64,
}

impl GlobalStats {
    /// Aggregate over a set of sessions
    pub fn collect<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> Self {
        let mut stats = GlobalStats::default();
        let mut confidence_sum = 0.0;

        for session in sessions {
            stats.total_sessions += 1;
            for message in &session.messages {
                stats.total_messages += 1;
                *stats
                    .language_distribution
                    .entry(message.language)
                    .or_insert(0) += 1;
                confidence_sum += message.confidence;
            }
        }

        if stats.total_messages > 0 {
            stats.avg_messages_per_session = round_to(
                stats.total_messages as f64 / stats.total_sessions as f64,
                2,
            );
            stats.avg_global_confidence =
                round_to(confidence_sum / stats.total_messages as f64, 3);
        }

        stats
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
