//! Flat-file message log
//!
//! One JSON object per line, appended as messages arrive. Append-only keeps
//! the write cheap regardless of log size.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single logged message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Telegram user id of the sender
    pub user_id: i64,
    /// Raw message text as received (command prefix included)
    pub message_text: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// Append-only JSONL message log
#[derive(Debug, Clone)]
pub struct MessageLog {
    path: PathBuf,
}

impl MessageLog {
    /// Create a log writing to `path`
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The log file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one message to the log
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or written
    pub fn append(&self, user_id: i64, message_text: &str) -> Result<()> {
        let entry = LogEntry {
            user_id,
            message_text: message_text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = MessageLog::new(dir.path().join("messages.jsonl"));

        log.append(42, "hello").unwrap();
        log.append(43, "/a explain lifetimes").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: LogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.user_id, 42);
        assert_eq!(first.message_text, "hello");
        assert!(!first.timestamp.is_empty());

        let second: LogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.message_text, "/a explain lifetimes");
    }

    #[test]
    fn append_survives_newlines_in_text() {
        let dir = tempfile::tempdir().unwrap();
        let log = MessageLog::new(dir.path().join("messages.jsonl"));

        log.append(1, "line one\nline two").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        // JSON escaping keeps the entry on a single physical line
        assert_eq!(content.lines().count(), 1);
        let entry: LogEntry = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(entry.message_text, "line one\nline two");
    }
}
