//! Mapping of application paths into the backing store's namespace.

use tierfs_core::{FsPath, PathError};

/// Maps application-facing paths to full backing-store paths.
///
/// - no root configured: paths pass through untouched
/// - path already under the root: returned unchanged
/// - a path naming another scheme or authority than the root: rejected
/// - anything else: appended under the root
///
/// Translating an already translated path is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    root: Option<FsPath>,
}

impl PathTranslator {
    pub fn new(root: Option<FsPath>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&FsPath> {
        self.root.as_ref()
    }

    pub fn translate(&self, path: &FsPath) -> Result<FsPath, PathError> {
        let Some(root) = &self.root else {
            return Ok(path.clone());
        };

        let translated = match root.is_ancestor_of(path) {
            Ok(true) => Ok(path.clone()),
            Ok(false) => root.join(path),
            Err(e) => Err(e),
        };
        translated.inspect_err(|e| log::error!("Invalid path {}: {}", path, e))
    }
}
