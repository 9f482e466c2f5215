//! Cache-first file system facade.
//!
//! [`CacheAccessFacade`] sits in front of two collaborators:
//! - a [`CacheClient`](tierfs_core::CacheClient) for the fast distributed cache tier
//! - a [`DelegateStore`](tierfs_core::DelegateStore), the backing store and sole writer
//!
//! Each read tries the cache tier once. Not-found from the cache is final;
//! any other cache failure is counted in a [`FallbackCounter`] and answered
//! by the backing store in a single hop. There is no retry loop, backoff or
//! circuit breaker: every call starts at the cache again.
//!
//! Paths are translated into the backing store's namespace by
//! [`PathTranslator`], and callers that want block metadata get synthetic
//! fixed-size blocks from [`blocks::synthesize`].

pub mod blocks;
mod deferred;
mod facade;
mod metrics;
mod reader;
mod translate;

pub use deferred::DeferredOpener;
pub use facade::CacheAccessFacade;
pub use metrics::{FallbackCounter, UFS_FALLBACK_COUNT};
pub use reader::FallbackPositionReader;
pub use translate::PathTranslator;
