//! Bounded, disk-backed collection of conversation sessions
//!
//! Every operation takes the single store-wide lock, so a session's message
//! list is never mutated concurrently and readers never observe a half-applied
//! append. Disk failures are logged and the store keeps working in memory.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::persistence::{SessionDocument, SessionFile};
use super::types::{GlobalStats, MessageRecord, Session, SessionStats};
use crate::config::MemoryConfig;
use crate::language::Language;
use crate::utils::{clamp_confidence, truncate_chars};

/// Identifier generation attempts before giving up with a store error
const MAX_ID_ATTEMPTS: usize = 16;
/// Length of the random suffix of a session identifier
const ID_SUFFIX_LEN: usize = 8;

/// Mutable state guarded by the store lock
#[derive(Debug, Default)]
struct StoreState {
    sessions: HashMap<String, Session>,
    /// Every identifier handed out or loaded during this store's lifetime
    issued_ids: HashSet<String>,
    /// Appends since start, drives autosave
    appended: u64,
    /// Sessions to drop from the document on the next write
    cleared: HashSet<String>,
}

/// Keyed collection of sessions with capacity limits and JSON persistence
pub struct SessionStore {
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    file: Option<SessionFile>,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Create an empty store using the system clock
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`
    pub fn with_clock(config: MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        let file = config.persistence.active_path().map(SessionFile::new);
        Self {
            config,
            clock,
            file,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Configuration the store was built with
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Current time of the store's clock
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Number of sessions held in memory
    pub fn len(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Whether no session is held in memory
    pub fn is_empty(&self) -> bool {
        self.state.lock().sessions.is_empty()
    }

    /// Whether `session_id` is held in memory
    pub fn contains(&self, session_id: &str) -> bool {
        self.state.lock().sessions.contains_key(session_id)
    }

    /// Identifiers of the sessions held in memory, most recently active first
    pub fn session_ids(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut sessions: Vec<&Session> = state.sessions.values().collect();
        sessions.sort_by(|a, b| b.last_activity.total_cmp(&a.last_activity));
        sessions.into_iter().map(|s| s.session_id.clone()).collect()
    }

    /// Create an empty session, evicting the least recently active one when full
    pub fn create_session(&self) -> crate::Result<String> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let session_id = generate_session_id(&state, now)?;

        self.make_room(&mut state);
        state.issued_ids.insert(session_id.clone());
        state
            .sessions
            .insert(session_id.clone(), Session::new(&session_id, now));

        info!("Created new session: {}", session_id);
        Ok(session_id)
    }

    /// Append an exchange to a session
    ///
    /// Fails with `SessionNotFound` for unknown identifiers; creating the
    /// session in that case is left to the caller.
    pub fn append_message(
        &self,
        session_id: &str,
        query: impl Into<String>,
        response: impl Into<String>,
        language: Language,
        confidence: f64,
        sources: Vec<String>,
    ) -> crate::Result<MessageRecord> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let cap = self.config.max_session_memory;

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| crate::Error::SessionNotFound(session_id.to_string()))?;

        let record = MessageRecord {
            timestamp: now.max(session.last_activity),
            query: query.into(),
            response: response.into(),
            language,
            confidence: clamp_confidence(confidence),
            session_id: session_id.to_string(),
            sources,
        };

        let dropped = session.push_message(record.clone(), cap);
        if dropped > 0 {
            debug!(
                "Session {} over {} messages, dropped {} oldest",
                session_id, cap, dropped
            );
        }

        state.appended += 1;
        let interval = self.config.autosave_interval;
        if interval > 0 && state.appended % interval == 0 {
            debug!("Autosave after {} appended messages", state.appended);
            self.persist_logged(&mut state);
        }

        Ok(record)
    }

    /// The most recent `limit` messages of a session, oldest first
    ///
    /// `None` returns every stored message. Counts as session activity.
    pub fn get_history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> crate::Result<Vec<MessageRecord>> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| crate::Error::SessionNotFound(session_id.to_string()))?;

        session.touch(now);
        Ok(session.history(limit))
    }

    /// Render the last `limit` exchanges as prompt context
    pub fn context_for_query(
        &self,
        session_id: &str,
        limit: usize,
        max_chars: usize,
    ) -> crate::Result<String> {
        let history = self.get_history(session_id, Some(limit))?;
        let lines: Vec<String> = history
            .iter()
            .flat_map(|m| {
                [
                    format!("Previous Q: {}", m.query),
                    format!("Previous A: {}", m.response),
                ]
            })
            .collect();

        Ok(truncate_chars(&lines.join("\n"), max_chars))
    }

    /// Statistics of one session; does not count as activity
    pub fn get_session_stats(&self, session_id: &str) -> crate::Result<SessionStats> {
        let state = self.state.lock();
        state
            .sessions
            .get(session_id)
            .map(Session::stats)
            .ok_or_else(|| crate::Error::SessionNotFound(session_id.to_string()))
    }

    /// Statistics across all sessions held in memory
    pub fn get_global_stats(&self) -> GlobalStats {
        let state = self.state.lock();
        GlobalStats::collect(state.sessions.values())
    }

    /// Remove sessions idle for longer than the timeout as of `now`
    ///
    /// Expired sessions are written to disk first when persistence is enabled.
    pub fn sweep_expired(&self, now: f64) -> usize {
        let mut state = self.state.lock();
        let timeout = self.config.timeout_secs_f64();

        let expired: Vec<String> = state
            .sessions
            .values()
            .filter(|s| s.is_expired(now, timeout))
            .map(|s| s.session_id.clone())
            .collect();

        if expired.is_empty() {
            return 0;
        }

        self.persist_logged(&mut state);
        for session_id in &expired {
            state.sessions.remove(session_id);
        }

        info!("Cleaned up {} expired sessions", expired.len());
        expired.len()
    }

    /// Drop a session from memory and from the persisted document
    pub fn clear_session(&self, session_id: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.sessions.remove(session_id).is_some();
        if self.file.is_some() {
            state.cleared.insert(session_id.to_string());
            self.persist_logged(&mut state);
        }

        if removed {
            info!("Cleared session: {}", session_id);
        }
        removed
    }

    /// Bring a session that was evicted or swept back into memory from disk
    pub fn restore_session(&self, session_id: &str) -> crate::Result<()> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if let Some(session) = state.sessions.get_mut(session_id) {
            session.touch(now);
            return Ok(());
        }

        let not_found = || crate::Error::SessionNotFound(session_id.to_string());
        if state.cleared.contains(session_id) {
            return Err(not_found());
        }
        let file = self.file.as_ref().ok_or_else(not_found)?;
        let mut session = file
            .read()?
            .and_then(|doc| doc.sessions.into_iter().find(|s| s.session_id == session_id))
            .ok_or_else(not_found)?;

        session.touch(now);
        self.trim_loaded(&mut session);
        self.make_room(&mut state);
        state.issued_ids.insert(session.session_id.clone());
        state.sessions.insert(session.session_id.clone(), session);

        info!("Restored session {} from disk", session_id);
        Ok(())
    }

    /// Write the whole store to disk
    ///
    /// Sessions present only on disk are kept unless they were cleared. A
    /// no-op when persistence is disabled.
    pub fn persist(&self) -> crate::Result<()> {
        let mut state = self.state.lock();
        self.write_document(&mut state)
    }

    /// Repopulate the store from disk, returning how many sessions were loaded
    ///
    /// A missing or unreadable document leaves the store as it was. At most
    /// `max_active_sessions` of the most recently active sessions are loaded.
    pub fn load(&self) -> usize {
        let Some(file) = &self.file else {
            return 0;
        };

        let document = match file.read() {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!("No session document at {:?}", file.path());
                return 0;
            }
            Err(e) => {
                error!("Error loading sessions, starting empty: {}", e);
                return 0;
            }
        };

        let mut state = self.state.lock();
        let mut sessions = document.sessions;
        sessions.sort_by(|a, b| b.last_activity.total_cmp(&a.last_activity));

        let mut loaded = 0;
        for mut session in sessions {
            state.issued_ids.insert(session.session_id.clone());
            if state.sessions.len() >= self.config.max_active_sessions
                || state.sessions.contains_key(&session.session_id)
            {
                continue;
            }
            self.trim_loaded(&mut session);
            state.sessions.insert(session.session_id.clone(), session);
            loaded += 1;
        }

        info!("Loaded {} chat sessions", loaded);
        loaded
    }

    /// Sweep expired sessions as of now, then write everything to disk
    pub fn flush(&self) {
        let swept = self.sweep_expired(self.clock.now());
        let mut state = self.state.lock();
        self.persist_logged(&mut state);
        debug!("Flushed session store ({} expired removed)", swept);
    }

    /// Evict least recently active sessions until one more fits
    fn make_room(&self, state: &mut StoreState) {
        let capacity = self.config.max_active_sessions.max(1);
        if state.sessions.len() < capacity {
            return;
        }

        self.persist_logged(state);
        while state.sessions.len() >= capacity {
            let Some(victim) = least_recently_active(state) else {
                break;
            };
            state.sessions.remove(&victim);
            info!("Evicted least recently active session: {}", victim);
        }
    }

    /// Apply the message cap to a session read back from disk
    fn trim_loaded(&self, session: &mut Session) {
        let dropped = session.enforce_cap(self.config.max_session_memory);
        if dropped > 0 {
            debug!(
                "Session {} read with {} messages over the cap, dropped oldest",
                session.session_id, dropped
            );
        }
    }

    fn persist_logged(&self, state: &mut StoreState) {
        if let Err(e) = self.write_document(state) {
            error!("Failed to persist sessions, continuing in memory: {}", e);
        }
    }

    fn write_document(&self, state: &mut StoreState) -> crate::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let disk_only = match file.read() {
            Ok(document) => document
                .map(|d| d.sessions)
                .unwrap_or_default()
                .into_iter()
                .filter(|s| {
                    !state.sessions.contains_key(&s.session_id)
                        && !state.cleared.contains(&s.session_id)
                })
                .collect(),
            Err(e) => {
                warn!("Existing session document unreadable, overwriting: {}", e);
                Vec::new()
            }
        };

        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .cloned()
            .chain(disk_only)
            .collect();
        sessions.sort_by(|a, b| {
            a.created_at
                .total_cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        let document = SessionDocument {
            sessions,
            last_updated: self.clock.now(),
        };
        file.write(&document)?;
        state.cleared.clear();
        Ok(())
    }
}

fn least_recently_active(state: &StoreState) -> Option<String> {
    state
        .sessions
        .values()
        .min_by(|a, b| {
            a.last_activity
                .total_cmp(&b.last_activity)
                .then_with(|| a.created_at.total_cmp(&b.created_at))
                .then_with(|| a.session_id.cmp(&b.session_id))
        })
        .map(|s| s.session_id.clone())
}

fn generate_session_id(state: &StoreState, now: f64) -> crate::Result<String> {
    let epoch = now.max(0.0) as u64;
    for _ in 0..MAX_ID_ATTEMPTS {
        let suffix = Uuid::new_v4().simple().to_string();
        let candidate = format!("session_{}_{}", epoch, &suffix[..ID_SUFFIX_LEN]);
        if !state.issued_ids.contains(&candidate) && !state.sessions.contains_key(&candidate) {
            return Ok(candidate);
        }
    }

    Err(crate::Error::Store(format!(
        "could not generate a unique session id after {} attempts",
        MAX_ID_ATTEMPTS
    )))
}
