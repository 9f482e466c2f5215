//! Fallback accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metric key under which fallbacks to the backing store are reported.
pub const UFS_FALLBACK_COUNT: &str = "Client.UfsFallbackCount";

/// Counts cache-to-backing-store fallbacks.
///
/// Clones share the same count. The value is for observability only and
/// never influences routing.
#[derive(Debug, Clone, Default)]
pub struct FallbackCounter {
    count: Arc<AtomicU64>,
}

impl FallbackCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        UFS_FALLBACK_COUNT
    }

    /// Record one fallback, returning the new total.
    pub fn inc(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
