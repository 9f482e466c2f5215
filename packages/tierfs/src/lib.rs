//! tierfs: a client-side access facade for a caching file system layer.
//!
//! Reads try a fast distributed cache tier first and fall back to a direct
//! connection to the backing store when the cache fails. Writes always go to
//! the backing store.

pub use tierfs_core::*;
pub use tierfs_facade::*;
