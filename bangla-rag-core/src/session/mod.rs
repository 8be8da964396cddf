//! Session management for conversation history
//!
//! Sessions live in a bounded in-memory store and are persisted as a single
//! JSON document that is rewritten atomically.

pub mod clock;
pub mod manager;
pub mod persistence;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::SessionManager;
pub use persistence::{SessionDocument, SessionFile};
pub use store::SessionStore;
pub use types::{GlobalStats, MessageRecord, Session, SessionStats};
