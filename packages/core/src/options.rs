//! Per-operation options.
//!
//! Every field is optional so that configuration defaults and caller-supplied
//! options can be layered. [`Merge::merge_from`] keeps each field of `self`
//! unless the override sets it.

use serde::{Deserialize, Serialize};

/// Field-by-field layering of option sets.
pub trait Merge {
    /// Layer `overrides` on top of `self`; fields set in `overrides` win.
    #[must_use]
    fn merge_from(self, overrides: &Self) -> Self;
}

macro_rules! options {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* pub $field:ident : Option<$ty:ty>, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: Option<$ty>, )*
        }

        impl Merge for $name {
            fn merge_from(self, overrides: &Self) -> Self {
                Self {
                    $( $field: overrides.$field.clone().or(self.$field), )*
                }
            }
        }
    };
}

/// How a read should interact with the cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadType {
    /// Read without populating the cache.
    NoCache,
    /// Populate the cache on read.
    #[default]
    Cache,
    /// Populate the cache and promote to the fastest tier.
    CachePromote,
}

impl ReadType {
    pub fn is_cache(self) -> bool {
        matches!(self, ReadType::Cache | ReadType::CachePromote)
    }
}

options! {
    /// Options for status lookups.
    pub struct GetStatusOptions {
        /// Metadata sync interval; -1 never syncs, 0 always syncs.
        pub sync_interval_ms: Option<i64>,
        pub update_timestamps: Option<bool>,
    }
}

options! {
    /// Options for directory listings.
    pub struct ListStatusOptions {
        pub recursive: Option<bool>,
        pub sync_interval_ms: Option<i64>,
    }
}

options! {
    /// Options for existence checks.
    pub struct ExistsOptions {
        pub sync_interval_ms: Option<i64>,
    }
}

options! {
    /// Options for opening a file for reading.
    pub struct OpenFileOptions {
        pub read_type: Option<ReadType>,
        pub max_ufs_read_concurrency: Option<u32>,
    }
}

impl OpenFileOptions {
    /// Read type, `Cache` when unset.
    pub fn read_type(&self) -> ReadType {
        self.read_type.unwrap_or_default()
    }

    /// Maximum concurrent backing-store reads, 1 when unset.
    pub fn max_ufs_read_concurrency(&self) -> u32 {
        self.max_ufs_read_concurrency.unwrap_or(1)
    }
}

options! {
    /// Options for creating a file.
    pub struct CreateFileOptions {
        pub recursive: Option<bool>,
        pub overwrite: Option<bool>,
        pub mode: Option<u32>,
    }
}

options! {
    /// Options for creating a directory.
    pub struct CreateDirectoryOptions {
        pub recursive: Option<bool>,
        pub allow_exists: Option<bool>,
        pub mode: Option<u32>,
    }
}

options! {
    /// Options for renames.
    pub struct RenameOptions {
        pub overwrite: Option<bool>,
    }
}

options! {
    /// Attribute changes; only set fields are applied.
    pub struct SetAttributeOptions {
        pub mode: Option<u32>,
        pub owner: Option<String>,
        pub group: Option<String>,
        pub pinned: Option<bool>,
    }
}
