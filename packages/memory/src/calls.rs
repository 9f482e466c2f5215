//! Per-operation call accounting.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Counts calls by operation name.
#[derive(Debug, Default)]
pub struct CallLog {
    counts: Mutex<BTreeMap<&'static str, usize>>,
}

impl CallLog {
    pub fn record(&self, operation: &'static str) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(operation).or_default() += 1;
    }

    /// Calls recorded for `operation`.
    pub fn count(&self, operation: &str) -> usize {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.get(operation).copied().unwrap_or(0)
    }

    /// Calls recorded across all operations.
    pub fn total(&self) -> usize {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.values().sum()
    }
}
