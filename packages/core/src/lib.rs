//! tierfs core: the vocabulary shared by the cache access facade and the
//! tiers it talks to.
//!
//! - `FsPath`: application paths and backing-store URIs
//! - `FileStatus`, `OpenBlockSpec`, `VirtualBlockLocation`: metadata records
//! - option sets with field-by-field merging
//! - `CacheClient` and `DelegateStore`: the two tiers behind the facade
//! - `MountContext` and `PathConf`: configuration
//!
//! # Example
//!
//! ```rust
//! use tierfs_core::{fs_path, MountContext};
//!
//! let ctx = MountContext::new(Some(fs_path!("s3://bucket/base")));
//! assert!(ctx.metadata_cache_enabled);
//! ```

mod config;
mod error;
pub mod options;
mod path;
mod status;
mod traits;

pub use config::{ConfigContext, MountContext, PathConf, PathDefaults, DEFAULT_VIRTUAL_BLOCK_SIZE};
pub use error::{ClientError, ConfigError, Error};
pub use options::{Merge, ReadType};
pub use path::{FsPath, PathError, SEPARATOR};
pub use status::{
    FileStatus, OpenBlockSpec, VirtualBlockLocation, WorkerAddress, PLACEHOLDER_MOUNT_ID,
};
pub use traits::{CacheClient, DelegateStore, InStream, OutStream, PositionReader};
