//! Core of the Bangla RAG assistant
//!
//! This crate owns per-session conversation memory: the bounded session
//! store and its JSON persistence, detection of queries about the
//! conversation itself, answers synthesized from stored history, and the
//! glue that routes a query either to memory or to the external
//! retrieval and generation collaborator.

pub mod config;
pub mod conversation;
pub mod error;
pub mod language;
pub mod logging;
pub mod memory;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
pub use language::Language;
