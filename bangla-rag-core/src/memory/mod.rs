//! Memory queries: questions about the conversation itself
//!
//! The classifier decides whether a query refers to earlier turns; the
//! responder answers such queries from the session's stored exchanges.

pub mod classifier;
pub mod phrases;
pub mod responder;

pub use classifier::MemoryQueryClassifier;
pub use phrases::{MemoryIntent, PhraseTable};
pub use responder::{HistoryAspect, MemoryAnswer, MemoryResponder};
