//! Facade configuration.
//!
//! [`MountContext`] is fixed per facade. [`PathConf`] supplies per-path
//! option defaults through the [`ConfigContext`] trait.
//!
//! Both load from JSON:
//!
//! ```json
//! {
//!   "ufs_root": "s3://bucket/base",
//!   "metadata_cache_enabled": true,
//!   "virtual_block_size": 67108864
//! }
//! ```

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::options::{GetStatusOptions, ListStatusOptions, Merge, OpenFileOptions};
use crate::FsPath;

/// Default size of a synthesized virtual block: 64 MiB.
pub const DEFAULT_VIRTUAL_BLOCK_SIZE: NonZeroU64 = match NonZeroU64::new(64 * 1024 * 1024) {
    Some(size) => size,
    None => unreachable!(),
};

/// Immutable per-facade configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountContext {
    /// Root of the backing store's namespace. `None` when the backing store
    /// already speaks the application namespace.
    #[serde(default)]
    pub ufs_root: Option<FsPath>,

    /// When false, status lookups skip the cache tier entirely.
    #[serde(default = "default_true")]
    pub metadata_cache_enabled: bool,

    /// Size of synthesized virtual blocks in bytes.
    #[serde(default = "default_block_size")]
    pub virtual_block_size: NonZeroU64,
}

fn default_true() -> bool {
    true
}

fn default_block_size() -> NonZeroU64 {
    DEFAULT_VIRTUAL_BLOCK_SIZE
}

impl Default for MountContext {
    fn default() -> Self {
        Self {
            ufs_root: None,
            metadata_cache_enabled: true,
            virtual_block_size: DEFAULT_VIRTUAL_BLOCK_SIZE,
        }
    }
}

impl MountContext {
    pub fn new(ufs_root: Option<FsPath>) -> Self {
        Self {
            ufs_root,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_metadata_cache(mut self, enabled: bool) -> Self {
        self.metadata_cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_virtual_block_size(mut self, size: NonZeroU64) -> Self {
        self.virtual_block_size = size;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_config(path.as_ref())?)
    }
}

/// Default options for each read operation at some path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathDefaults {
    pub get_status: GetStatusOptions,
    pub list_status: ListStatusOptions,
    pub open_file: OpenFileOptions,
}

impl Merge for PathDefaults {
    fn merge_from(self, overrides: &Self) -> Self {
        Self {
            get_status: self.get_status.merge_from(&overrides.get_status),
            list_status: self.list_status.merge_from(&overrides.list_status),
            open_file: self.open_file.merge_from(&overrides.open_file),
        }
    }
}

/// Source of per-path option defaults.
pub trait ConfigContext: Send + Sync {
    /// Defaults that apply to `path`.
    ///
    /// Status lookups pass the application path. Opens pass `FileStatus::path`,
    /// which the tiers fill with the backing-store path, so prefixes written
    /// in application form do not match there.
    fn path_defaults(&self, path: &FsPath) -> PathDefaults;
}

/// Option defaults with path-prefix overrides.
///
/// The deepest override whose prefix contains the path wins, layered over
/// the base defaults.
///
/// ```json
/// {
///   "defaults": { "open_file": { "read_type": "CACHE" } },
///   "overrides": { "/scratch": { "open_file": { "read_type": "NO_CACHE" } } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConf {
    pub defaults: PathDefaults,
    pub overrides: BTreeMap<FsPath, PathDefaults>,
}

impl PathConf {
    pub fn new(defaults: PathDefaults) -> Self {
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override for everything under `prefix`.
    #[must_use]
    pub fn with_override(mut self, prefix: FsPath, defaults: PathDefaults) -> Self {
        self.overrides.insert(prefix, defaults);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_config(path.as_ref())?)
    }
}

impl ConfigContext for PathConf {
    fn path_defaults(&self, path: &FsPath) -> PathDefaults {
        let deepest = self
            .overrides
            .iter()
            .filter(|(prefix, _)| prefix.is_ancestor_of(path).unwrap_or(false))
            .max_by_key(|(prefix, _)| prefix.components().count());

        match deepest {
            Some((_, overrides)) => self.defaults.clone().merge_from(overrides),
            None => self.defaults.clone(),
        }
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
