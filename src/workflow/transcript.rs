//! Append-only conversation transcript for one task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker name of the opening task message.
pub const USER_SPEAKER: &str = "user";

/// One message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered `(speaker, message)` pairs.
///
/// # Invariants
/// - The first entry is the task message from [`USER_SPEAKER`]
/// - Entries are only ever appended
///
/// Serialize-only: the only constructor is [`Transcript::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Start a transcript with the task message.
    pub fn new(task_message: impl Into<String>) -> Self {
        let mut transcript = Self {
            entries: Vec::new(),
        };
        transcript.push(USER_SPEAKER, task_message);
        transcript
    }

    /// Append a message and return it.
    pub fn push(&mut self, speaker: impl Into<String>, content: impl Into<String>) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry {
            speaker: speaker.into(),
            content: content.into(),
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a transcript starts with its task message.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn task_message(&self) -> &str {
        self.entries.first().map(|e| e.content.as_str()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn last_from(&self, speaker: &str) -> Option<&TranscriptEntry> {
        self.entries.iter().rev().find(|e| e.speaker == speaker)
    }

    /// Speakers in order of their messages, task message excluded.
    pub fn speakers(&self) -> Vec<&str> {
        self.entries
            .get(1..)
            .unwrap_or_default()
            .iter()
            .map(|e| e.speaker.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_task() {
        let t = Transcript::new("build it");
        assert_eq!(t.len(), 1);
        assert!(!t.is_empty());
        assert_eq!(t.task_message(), "build it");
        assert_eq!(t.entries()[0].speaker, USER_SPEAKER);
        assert!(t.speakers().is_empty());
    }

    #[test]
    fn test_last_from() {
        let mut t = Transcript::new("task");
        t.push("CodeWriter", "v1");
        t.push("CodeReviewer", "meh");
        t.push("CodeWriter", "v2");
        assert_eq!(t.last_from("CodeWriter").unwrap().content, "v2");
        assert!(t.last_from("TestGenerator").is_none());
        assert_eq!(t.speakers(), ["CodeWriter", "CodeReviewer", "CodeWriter"]);
    }

    #[test]
    fn test_accessors_tolerate_missing_task_entry() {
        let t = Transcript {
            entries: Vec::new(),
        };
        assert_eq!(t.task_message(), "");
        assert!(t.speakers().is_empty());
        assert!(t.last().is_none());
    }
}
