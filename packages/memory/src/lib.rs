//! In-memory collaborators for the tierfs facade.
//!
//! [`InMemoryStore`] is a complete backing store; [`InMemoryCacheClient`] is a
//! cache tier serving a store's contents with switchable faults. Both record
//! the calls they receive, which makes them the fixtures of choice for
//! exercising fallback behavior.

mod cache;
mod calls;
mod store;
mod streams;

pub use cache::InMemoryCacheClient;
pub use calls::CallLog;
pub use store::InMemoryStore;
pub use streams::{BytesReader, MemoryOutStream, SwitchedReader};
