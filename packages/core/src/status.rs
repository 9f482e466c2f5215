//! File status and block metadata records.

use serde::{Deserialize, Serialize};

/// Metadata describing one file or directory.
///
/// Produced by the cache client or the backing store and only ever read by
/// the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Path as the application addresses it.
    pub path: String,
    /// Full path in the backing store's namespace.
    pub ufs_path: String,
    /// Length in bytes.
    pub length: u64,
    pub folder: bool,
    /// False while the file is still being written.
    pub completed: bool,
    #[serde(default)]
    pub last_modification_time_ms: u64,
    #[serde(default)]
    pub mode: u32,
}

impl FileStatus {
    /// A completed file.
    pub fn file(path: impl Into<String>, ufs_path: impl Into<String>, length: u64) -> Self {
        Self {
            path: path.into(),
            ufs_path: ufs_path.into(),
            length,
            folder: false,
            completed: true,
            last_modification_time_ms: 0,
            mode: 0o644,
        }
    }

    /// A directory.
    pub fn directory(path: impl Into<String>, ufs_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ufs_path: ufs_path.into(),
            length: 0,
            folder: true,
            completed: true,
            last_modification_time_ms: 0,
            mode: 0o755,
        }
    }

    #[must_use]
    pub fn incomplete(mut self) -> Self {
        self.completed = false;
        self
    }
}

/// Network address of a cache worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerAddress {
    pub host: String,
    pub rpc_port: u16,
    pub data_port: u16,
}

impl WorkerAddress {
    pub fn new(host: impl Into<String>, rpc_port: u16, data_port: u16) -> Self {
        Self {
            host: host.into(),
            rpc_port,
            data_port,
        }
    }
}

impl std::fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.rpc_port)
    }
}

/// Mount id placed in every [`OpenBlockSpec`]; no mount table exists in this
/// mode.
pub const PLACEHOLDER_MOUNT_ID: u64 = 0;

/// How the cache tier should open a whole file as a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBlockSpec {
    pub ufs_path: String,
    /// Always 0: the whole file is one block.
    pub offset_in_file: u64,
    /// Equal to the file length.
    pub block_size: u64,
    pub max_ufs_read_concurrency: u32,
    /// Bypass caching of the data read.
    pub no_cache: bool,
    pub mount_id: u64,
}

/// A synthetic block of a file and where it can be read.
///
/// `block_id` only numbers blocks within one result and is regenerated on
/// every call. It must not be used to look a block up anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualBlockLocation {
    pub block_id: u64,
    pub offset: u64,
    pub length: u64,
    pub worker: WorkerAddress,
    pub ufs_locations: Vec<String>,
}
