use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of milestone a log entry records. Renderers map it to a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Start,
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogCategory::Start => write!(f, "start"),
            LogCategory::Info => write!(f, "info"),
            LogCategory::Success => write!(f, "success"),
            LogCategory::Warning => write!(f, "warning"),
            LogCategory::Error => write!(f, "error"),
        }
    }
}

/// A single immutable milestone in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    id: Uuid,
    message: String,
    created_at: DateTime<Utc>,
    category: LogCategory,
}

impl LogEntry {
    fn new(message: String, category: LogCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            created_at: Utc::now(),
            category,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn category(&self) -> LogCategory {
        self.category
    }
}

/// Append-only, insertion-ordered record of what a run did.
///
/// Entries can only be added at the end or dropped all at once; nothing
/// outside the state machine may write to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry stamped with the current wall-clock time.
    pub(crate) fn append(&mut self, message: impl Into<String>, category: LogCategory) -> &LogEntry {
        self.entries.push(LogEntry::new(message.into(), category));
        &self.entries[self.entries.len() - 1]
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn categories(&self) -> Vec<LogCategory> {
        self.entries.iter().map(LogEntry::category).collect()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
