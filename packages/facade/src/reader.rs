//! Positional reader that prefers the cache tier and falls back lazily.

use tierfs_core::{ClientError, PositionReader};

use crate::deferred::DeferredOpener;
use crate::metrics::FallbackCounter;

/// Reads through the cache tier, falling back to a backing-store reader that
/// is only opened when a cache read first fails.
///
/// Every read tries the cache first; a failed cache read costs one fallback
/// count and is served by the backing store.
pub struct FallbackPositionReader {
    path: String,
    cache: Option<Box<dyn PositionReader>>,
    fallback: DeferredOpener<Box<dyn PositionReader>>,
    counter: FallbackCounter,
}

impl FallbackPositionReader {
    pub(crate) fn new(
        path: String,
        cache: Option<Box<dyn PositionReader>>,
        fallback: DeferredOpener<Box<dyn PositionReader>>,
        counter: FallbackCounter,
    ) -> Self {
        Self {
            path,
            cache,
            fallback,
            counter,
        }
    }

    /// Whether a backing-store reader has been opened.
    pub fn fallback_opened(&self) -> bool {
        self.fallback.is_opened()
    }

    fn read_fallback(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        self.fallback.open()?.read_at(position, buf)
    }
}

impl PositionReader for FallbackPositionReader {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        let Some(cache) = &self.cache else {
            return self.read_fallback(position, buf);
        };

        match cache.read_at(position, buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                let count = self.counter.inc();
                log::debug!(
                    "Cache read of {} at {} failed ({} times). Fall back to UFS: {}",
                    self.path,
                    position,
                    count,
                    e
                );
                self.read_fallback(position, buf)
            }
        }
    }
}

impl std::fmt::Debug for FallbackPositionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPositionReader")
            .field("path", &self.path)
            .field("cache", &self.cache.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}
