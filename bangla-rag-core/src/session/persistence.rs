//! JSON document holding every persisted session
//!
//! The whole document is rewritten on each save. Writes go to a temporary
//! file in the target directory which is then renamed over the document, so
//! a reader sees either the previous or the new content, never a partial one.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::Session;

/// On-disk layout of the session document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Seconds since the Unix epoch of the last write
    #[serde(default)]
    pub last_updated: f64,
}

/// Reads and atomically replaces the session document
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// Handle to the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing or blank file yields `None`
    pub fn read(&self) -> crate::Result<Option<SessionDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| crate::Error::Persistence(format!("read {:?}: {}", self.path, e)))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let document = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Persistence(format!("parse {:?}: {}", self.path, e)))?;
        Ok(Some(document))
    }

    /// Replace the document with `document`
    pub fn write(&self, document: &SessionDocument) -> crate::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| crate::Error::Persistence(format!("create {:?}: {}", dir, e)))?;

        let content = serde_json::to_vec_pretty(document)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| crate::Error::Persistence(format!("temp file in {:?}: {}", dir, e)))?;
        tmp.write_all(&content)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| crate::Error::Persistence(format!("write temp file: {}", e)))?;
        tmp.persist(&self.path)?;

        debug!(
            "Wrote {} sessions to {:?}",
            document.sessions.len(),
            self.path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::session::types::MessageRecord;
    use tempfile::TempDir;

    fn sample_document() -> SessionDocument {
        let mut session = Session::new("session_1700000000_ab12cd34", 1_700_000_000.123_456);
        session.push_message(
            MessageRecord {
                timestamp: 1_700_000_001.987_654,
                query: "অনুপমের বাবা কী করতেন?".to_string(),
                response: "অনুপমের বাবা ওকালতি করতেন।".to_string(),
                language: Language::Bn,
                confidence: 0.85,
                session_id: "session_1700000000_ab12cd34".to_string(),
                sources: vec!["doc_1".to_string(), "doc_2".to_string()],
            },
            50,
        );
        SessionDocument {
            sessions: vec![session],
            last_updated: 1_700_000_002.5,
        }
    }

    #[test]
    fn test_missing_file_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = SessionFile::new(temp_dir.path().join("chat_sessions.json"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_is_lossless() {
        let temp_dir = TempDir::new().unwrap();
        let file = SessionFile::new(temp_dir.path().join("nested").join("chat_sessions.json"));
        let document = sample_document();

        file.write(&document).unwrap();
        let loaded = file.read().unwrap().unwrap();

        assert_eq!(loaded, document);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = SessionFile::new(temp_dir.path().join("chat_sessions.json"));
        file.write(&sample_document()).unwrap();
        file.write(&SessionDocument::default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(file.read().unwrap().unwrap().sessions.is_empty());
    }

    #[test]
    fn test_corrupted_file_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_sessions.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SessionFile::new(path).read().unwrap_err();
        assert!(matches!(err, crate::Error::Persistence(_)));
    }
}
