//! The cache access facade.
//!
//! Reads go to the cache tier first. A not-found answer from the cache is
//! final. Any other cache failure is counted, logged, and retried exactly once
//! against the backing store; whatever the backing store answers is final.
//! Mutations never touch the cache tier.

use std::sync::Arc;

use tierfs_core::options::{
    CreateDirectoryOptions, CreateFileOptions, ExistsOptions, GetStatusOptions, ListStatusOptions,
    OpenFileOptions, RenameOptions, SetAttributeOptions,
};
use tierfs_core::{
    CacheClient, ClientError, ConfigContext, DelegateStore, Error, FileStatus, FsPath, InStream,
    Merge, MountContext, OpenBlockSpec, OutStream, VirtualBlockLocation, PLACEHOLDER_MOUNT_ID,
};

use crate::blocks;
use crate::deferred::DeferredOpener;
use crate::metrics::FallbackCounter;
use crate::reader::FallbackPositionReader;
use crate::translate::PathTranslator;

/// Client-side file system facade over a cache tier and its backing store.
///
/// The facade keeps no per-call state; concurrent calls make their cache or
/// fallback decisions independently.
///
/// # Example
///
/// ```rust,ignore
/// let facade = CacheAccessFacade::new(
///     MountContext::new(Some(fs_path!("s3://bucket/base"))),
///     cache_client,
///     backing_store,
///     Arc::new(PathConf::default()),
///     FallbackCounter::new(),
/// );
///
/// // Looks up s3://bucket/base/data/a.txt in the cache tier first.
/// let status = facade.get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())?;
/// ```
pub struct CacheAccessFacade {
    context: MountContext,
    translator: PathTranslator,
    cache: Arc<dyn CacheClient>,
    delegate: Arc<dyn DelegateStore>,
    config: Arc<dyn ConfigContext>,
    fallbacks: FallbackCounter,
}

impl CacheAccessFacade {
    pub fn new(
        context: MountContext,
        cache: Arc<dyn CacheClient>,
        delegate: Arc<dyn DelegateStore>,
        config: Arc<dyn ConfigContext>,
        fallbacks: FallbackCounter,
    ) -> Self {
        let translator = PathTranslator::new(context.ufs_root.clone());
        Self {
            context,
            translator,
            cache,
            delegate,
            config,
            fallbacks,
        }
    }

    pub fn context(&self) -> &MountContext {
        &self.context
    }

    pub fn fallback_counter(&self) -> &FallbackCounter {
        &self.fallbacks
    }

    /// Map an application path into the backing store's namespace.
    pub fn translate(&self, path: &FsPath) -> Result<FsPath, Error> {
        Ok(self.translator.translate(path)?)
    }

    /// Look up a file's status.
    ///
    /// With metadata caching disabled the backing store is asked directly.
    pub fn get_status(
        &self,
        path: &FsPath,
        options: &GetStatusOptions,
    ) -> Result<FileStatus, Error> {
        let ufs_path = self.translate(path)?;

        if !self.context.metadata_cache_enabled {
            return self
                .delegate
                .get_status(&ufs_path, options)
                .map_err(Error::Delegate);
        }

        let merged = self
            .config
            .path_defaults(path)
            .get_status
            .merge_from(options);

        match self.cache.get_status(&ufs_path, &merged) {
            Ok(status) => Ok(status),
            Err(e) if e.is_not_found() => Err(Error::NotFound {
                path: path.to_string(),
            }),
            Err(e) => {
                self.record_fallback("get status", &ufs_path, &e);
                self.delegate
                    .get_status(&ufs_path, options)
                    .map_err(Error::Delegate)
            }
        }
    }

    /// List a directory.
    ///
    /// A directory the cache tier does not know is an empty listing.
    pub fn list_status(
        &self,
        path: &FsPath,
        options: &ListStatusOptions,
    ) -> Result<Vec<FileStatus>, Error> {
        let ufs_path = self.translate(path)?.normalized();

        match self.cache.list_status(&ufs_path, options) {
            Ok(statuses) => Ok(statuses),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => {
                self.record_fallback("list status", &ufs_path, &e);
                self.delegate
                    .list_status(&ufs_path, options)
                    .map_err(Error::Delegate)
            }
        }
    }

    /// Visit a directory listing. Served by the backing store.
    pub fn iterate_status(
        &self,
        path: &FsPath,
        options: &ListStatusOptions,
        action: &mut dyn FnMut(&FileStatus),
    ) -> Result<(), Error> {
        let ufs_path = self.translate(path)?;
        self.delegate
            .iterate_status(&ufs_path, options, action)
            .map_err(Error::Delegate)
    }

    /// Check whether a path exists. Served by the backing store.
    pub fn exists(&self, path: &FsPath, options: &ExistsOptions) -> Result<bool, Error> {
        let ufs_path = self.translate(path)?;
        self.delegate
            .exists(&ufs_path, options)
            .map_err(Error::Delegate)
    }

    /// Open a file for sequential reading.
    pub fn open_file(
        &self,
        path: &FsPath,
        options: &OpenFileOptions,
    ) -> Result<Box<dyn InStream>, Error> {
        let status = self.get_status(path, &GetStatusOptions::default())?;
        self.open_file_status(&status, options)
    }

    /// Open a file whose status is already known.
    ///
    /// A failure to open through the cache tier falls back to a single
    /// backing-store open.
    pub fn open_file_status(
        &self,
        status: &FileStatus,
        options: &OpenFileOptions,
    ) -> Result<Box<dyn InStream>, Error> {
        let (merged, spec) = self.prepare_read(status, options)?;

        match self.cache.open_stream(status, &spec) {
            Ok(stream) => Ok(stream),
            Err(e) => {
                self.record_fallback("open file", &status.ufs_path, &e);
                self.delegate
                    .open_file(status, &merged)
                    .map_err(Error::Delegate)
            }
        }
    }

    /// Open a file for positional reads.
    pub fn open_position_read(
        &self,
        path: &FsPath,
        options: &OpenFileOptions,
    ) -> Result<FallbackPositionReader, Error> {
        let status = self.get_status(path, &GetStatusOptions::default())?;
        self.open_position_read_status(&status, options)
    }

    /// Open a positional reader for a file whose status is already known.
    ///
    /// The backing-store reader is only opened if a cache read fails.
    pub fn open_position_read_status(
        &self,
        status: &FileStatus,
        options: &OpenFileOptions,
    ) -> Result<FallbackPositionReader, Error> {
        let (merged, spec) = self.prepare_read(status, options)?;

        let delegate = Arc::clone(&self.delegate);
        let fallback_status = status.clone();
        let fallback =
            DeferredOpener::new(move || delegate.open_position_reader(&fallback_status, &merged));

        let cache = match self.cache.open_position_reader(status, &spec) {
            Ok(reader) => Some(reader),
            Err(e) => {
                self.record_fallback("open position reader", &status.ufs_path, &e);
                None
            }
        };

        Ok(FallbackPositionReader::new(
            status.ufs_path.clone(),
            cache,
            fallback,
            self.fallbacks.clone(),
        ))
    }

    /// Create a file in the backing store.
    pub fn create_file(
        &self,
        path: &FsPath,
        options: &CreateFileOptions,
    ) -> Result<Box<dyn OutStream>, Error> {
        let ufs_path = self.translate(path)?;
        warn_bypass("create file", &ufs_path);
        self.delegate
            .create_file(&ufs_path, options)
            .map_err(Error::Delegate)
    }

    /// Create a directory in the backing store.
    pub fn create_directory(
        &self,
        path: &FsPath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), Error> {
        let ufs_path = self.translate(path)?;
        warn_bypass("create directory", &ufs_path);
        self.delegate
            .create_directory(&ufs_path, options)
            .map_err(Error::Delegate)
    }

    /// Rename within the backing store.
    pub fn rename(&self, src: &FsPath, dst: &FsPath, options: &RenameOptions) -> Result<(), Error> {
        let src_ufs = self.translate(src)?;
        let dst_ufs = self.translate(dst)?;
        warn_bypass("rename", &src_ufs);
        self.delegate
            .rename(&src_ufs, &dst_ufs, options)
            .map_err(Error::Delegate)
    }

    /// Change attributes in the backing store.
    pub fn set_attribute(&self, path: &FsPath, options: &SetAttributeOptions) -> Result<(), Error> {
        let ufs_path = self.translate(path)?;
        warn_bypass("set attribute", &ufs_path);
        self.delegate
            .set_attribute(&ufs_path, options)
            .map_err(Error::Delegate)
    }

    /// Virtual block locations for a file.
    ///
    /// Always asks the cache tier, whatever the metadata cache setting, and
    /// never falls back.
    pub fn block_locations(&self, path: &FsPath) -> Result<Vec<VirtualBlockLocation>, Error> {
        let ufs_path = self.translate(path)?;
        let defaults = self.config.path_defaults(path).get_status;
        let status = self
            .cache
            .get_status(&ufs_path, &defaults)
            .map_err(Error::Cache)?;
        self.block_locations_for_status(&status)
    }

    /// Virtual block locations for a file whose status is already known.
    pub fn block_locations_for_status(
        &self,
        status: &FileStatus,
    ) -> Result<Vec<VirtualBlockLocation>, Error> {
        let ufs_path = self.translate(&FsPath::parse(&status.ufs_path)?)?;
        let worker = self
            .cache
            .resolve_worker(&ufs_path)
            .map_err(Error::Cache)?;
        Ok(blocks::synthesize(
            status.length,
            self.context.virtual_block_size,
            &worker,
            &ufs_path.to_string(),
        ))
    }

    /// Reject unreadable statuses and build the options and block spec for
    /// a read.
    fn prepare_read(
        &self,
        status: &FileStatus,
        options: &OpenFileOptions,
    ) -> Result<(OpenFileOptions, OpenBlockSpec), Error> {
        if status.folder {
            return Err(Error::OpenDirectory {
                path: status.path.clone(),
            });
        }
        if !status.completed {
            return Err(Error::IncompleteFile {
                path: status.path.clone(),
            });
        }

        let merged = match FsPath::parse(&status.path) {
            Ok(path) => self.config.path_defaults(&path).open_file,
            Err(_) => OpenFileOptions::default(),
        }
        .merge_from(options);

        let spec = OpenBlockSpec {
            ufs_path: status.ufs_path.clone(),
            offset_in_file: 0,
            block_size: status.length,
            max_ufs_read_concurrency: merged.max_ufs_read_concurrency(),
            no_cache: !merged.read_type().is_cache(),
            mount_id: PLACEHOLDER_MOUNT_ID,
        };
        Ok((merged, spec))
    }

    fn record_fallback(&self, operation: &str, path: &dyn std::fmt::Display, error: &ClientError) {
        let count = self.fallbacks.inc();
        log::debug!(
            "Cache client {} error on {} ({} times). Fall back to UFS: {}",
            operation,
            path,
            count,
            error
        );
    }
}

fn warn_bypass(operation: &str, path: &FsPath) {
    log::warn!(
        "Cache tier does not serve {}; {} goes straight to the backing store",
        operation,
        path
    );
}

impl std::fmt::Debug for CacheAccessFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAccessFacade")
            .field("context", &self.context)
            .field("fallbacks", &self.fallbacks.count())
            .finish()
    }
}
