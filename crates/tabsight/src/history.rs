//! Bounded, append-only log of recent requests.
//!
//! Purely for observability: the pipeline never reads it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Which entry point handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Clean,
}

/// One handled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub rows: usize,
    pub columns: usize,
    pub charts: usize,
    pub success: bool,
}

impl HistoryEntry {
    pub fn new(operation: Operation, rows: usize, columns: usize, charts: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation,
            rows,
            columns,
            charts,
            success: true,
        }
    }

    pub fn failed(operation: Operation) -> Self {
        Self {
            success: false,
            ..Self::new(operation, 0, 0, 0)
        }
    }
}

/// Keeps the newest `capacity` entries. Safe to share between threads.
#[derive(Debug)]
pub struct HistoryLog {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Retained entries, oldest first.
    pub fn recent(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

static_assertions::assert_impl_all!(HistoryLog: Send, Sync);
