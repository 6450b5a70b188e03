#![forbid(unsafe_code)]

//! A failure sink that remembers what it was told.

use std::sync::{Arc, Mutex, PoisonError};

use dispose_core::error::ReleaseError;
use dispose_core::sink::FailureSink;

/// One reported leaf failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    pub composite_id: u64,
    pub kind: &'static str,
    pub message: String,
}

/// Cloneable sink; all clones share one record list.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<RecordedFailure>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<RecordedFailure> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Entries reported by one composite.
    #[must_use]
    pub fn from_composite(&self, composite_id: u64) -> Vec<RecordedFailure> {
        self.entries()
            .into_iter()
            .filter(|e| e.composite_id == composite_id)
            .collect()
    }
}

impl FailureSink for RecordingSink {
    fn record(&self, composite_id: u64, failure: &ReleaseError) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedFailure {
                composite_id,
                kind: failure.kind(),
                message: failure.to_string(),
            });
    }
}
