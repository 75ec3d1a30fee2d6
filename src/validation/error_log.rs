//! In-memory error log queried by the operator dashboard.
//!
//! Entries are append-only for the process lifetime, behind a retention cap:
//! the log is a ring buffer holding the most recent entries, oldest evicted
//! first. Nothing is persisted; a restart starts the log empty.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::DivinationType;
use crate::utilities::errors::ErrorType;

/// Default retention cap for the ring buffer.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// One logged failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// Taxonomy entry of the failure.
    pub error_type: ErrorType,
    /// Reading category the failure occurred in.
    pub divination_type: DivinationType,
    /// Human-readable failure description.
    pub message: String,
    /// Free-form key/value context (attempt number, chunk counts, ...).
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorLogEntry {
    /// Create an entry timestamped now.
    pub fn new(
        error_type: ErrorType,
        divination_type: DivinationType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            error_type,
            divination_type,
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Builder: attach a context key/value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug)]
struct ErrorLogInner {
    entries: RwLock<VecDeque<ErrorLogEntry>>,
    capacity: usize,
}

/// Shared handle to the error log.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    inner: Arc<ErrorLogInner>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Create a log with the default retention cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ErrorLogInner {
                entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
                capacity,
            }),
        }
    }

    /// Append an entry, evicting the oldest once the cap is reached.
    pub fn append(&self, entry: ErrorLogEntry) {
        let mut entries = self.inner.entries.write();
        if entries.len() == self.inner.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Copy of every retained entry, oldest first.
    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.inner.entries.read().iter().cloned().collect()
    }

    /// Copy of the `n` most recent entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<ErrorLogEntry> {
        self.inner.entries.read().iter().rev().take(n).cloned().collect()
    }

    /// Drop every entry. Exists for test isolation only.
    pub fn clear(&self) {
        self.inner.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_query() {
        let log = ErrorLog::new();
        log.append(
            ErrorLogEntry::new(ErrorType::Validation, DivinationType::Tarot, "too short")
                .with_context("thai_chars", "12"),
        );
        log.append(ErrorLogEntry::new(
            ErrorType::Api,
            DivinationType::Chat,
            "upstream 503",
        ));

        assert_eq!(log.len(), 2);
        let recent = log.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "upstream 503");
        assert_eq!(log.entries()[0].context["thai_chars"], "12");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = ErrorLog::with_capacity(2);
        for i in 0..3 {
            log.append(ErrorLogEntry::new(
                ErrorType::Api,
                DivinationType::Chat,
                format!("entry {}", i),
            ));
        }
        assert_eq!(log.len(), 2);
        let entries = log.entries();
        assert_eq!(entries[0].message, "entry 1");
        assert_eq!(entries[1].message, "entry 2");
    }

    #[test]
    fn test_clones_share_entries() {
        let a = ErrorLog::new();
        let b = a.clone();
        b.append(ErrorLogEntry::new(
            ErrorType::Template,
            DivinationType::Numerology,
            "missing key",
        ));
        assert_eq!(a.len(), 1);
    }
}
