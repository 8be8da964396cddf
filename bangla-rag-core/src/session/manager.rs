//! Session lifecycle: creation, lazy expiry sweeps, statistics and shutdown

use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::store::SessionStore;
use super::types::{GlobalStats, MessageRecord, SessionStats};
use crate::config::MemoryConfig;
use crate::language::Language;

/// Coordinates session lifecycle on top of a shared [`SessionStore`]
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<SessionStore>,
}

impl SessionManager {
    /// Create a manager and load any persisted sessions
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager reading time from `clock` and load persisted sessions
    pub fn with_clock(config: MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(SessionStore::with_clock(config, clock));
        let loaded = store.load();
        info!(
            "Session manager initialized ({} sessions restored)",
            loaded
        );
        Self { store }
    }

    /// Wrap an existing store without loading
    pub fn from_store(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Shared store handle
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Memory configuration in effect
    pub fn config(&self) -> &MemoryConfig {
        self.store.config()
    }

    /// Sweep expired sessions, then create a new one
    pub fn create_session(&self) -> crate::Result<String> {
        self.sweep();
        self.store.create_session()
    }

    /// Whether `session_id` is live, restoring it from disk if it was evicted
    pub fn ensure_session(&self, session_id: &str) -> bool {
        if self.store.contains(session_id) {
            return true;
        }
        match self.store.restore_session(session_id) {
            Ok(()) => true,
            Err(e) => {
                debug!("Session {} not available: {}", session_id, e);
                false
            }
        }
    }

    /// Remove sessions idle past the timeout, as of now
    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(self.store.now())
    }

    /// Append an exchange to a live session
    pub fn append_message(
        &self,
        session_id: &str,
        query: &str,
        response: &str,
        language: Language,
        confidence: f64,
        sources: Vec<String>,
    ) -> crate::Result<MessageRecord> {
        self.store
            .append_message(session_id, query, response, language, confidence, sources)
    }

    /// Recent messages of a session, oldest first
    pub fn get_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> crate::Result<Vec<MessageRecord>> {
        self.store.get_history(session_id, limit)
    }

    /// The configured default number of recent messages, oldest first
    pub fn recent_history(&self, session_id: &str) -> crate::Result<Vec<MessageRecord>> {
        let limit = self.store.config().history_limit;
        self.store.get_history(session_id, Some(limit))
    }

    /// Per-session statistics
    pub fn get_session_stats(&self, session_id: &str) -> crate::Result<SessionStats> {
        self.store.get_session_stats(session_id)
    }

    /// Statistics over every session in memory
    pub fn get_global_stats(&self) -> GlobalStats {
        self.store.get_global_stats()
    }

    /// Chat context for the answer source, sized by configuration
    pub fn context_for_query(&self, session_id: &str) -> crate::Result<String> {
        let config = self.store.config();
        self.store.context_for_query(
            session_id,
            config.context_messages,
            config.context_max_chars,
        )
    }

    /// Forget a session in memory and on disk
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.store.clear_session(session_id)
    }

    /// Sweep and flush everything to disk
    pub fn shutdown(&self) {
        self.store.flush();
        info!("Memory saved and cleaned up");
    }
}
