//! Newest-first log buffer.

use std::collections::VecDeque;

use crate::types::{LogEntry, LogId};

/// Accumulated entries of one subscription, newest first.
///
/// An entry is accepted only if the buffer is empty or its id is greater
/// than the current front id. Everything else is dropped, which keeps ids
/// unique and the front id non-decreasing. The check only looks at the
/// front; entries are never re-sorted.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
}

impl LogBuffer {
    /// Create an unbounded buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that evicts its oldest entries beyond `capacity`.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Offer an entry. Returns true if it was accepted.
    pub fn offer(&mut self, entry: LogEntry) -> bool {
        if self.front_id().is_some_and(|front| entry.id <= front) {
            return false;
        }

        self.entries.push_front(entry);
        if let Some(capacity) = self.capacity {
            self.entries.truncate(capacity);
        }
        true
    }

    /// Id of the newest entry.
    #[must_use]
    pub fn front_id(&self) -> Option<LogId> {
        self.entries.front().map(|e| e.id)
    }

    /// Newest entry.
    #[must_use]
    pub fn front(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been accepted (or everything evicted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Ids, newest first.
    #[must_use]
    pub fn ids(&self) -> Vec<LogId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Copy of the entries, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
