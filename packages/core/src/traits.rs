//! Collaborator traits: the cache client, the backing store and the streams
//! they hand out.
//!
//! All calls are synchronous and blocking. Implementations must be safe to
//! call from many threads at once; the facade shares them behind `Arc`.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::options::{
    CreateDirectoryOptions, CreateFileOptions, ExistsOptions, GetStatusOptions, ListStatusOptions,
    OpenFileOptions, RenameOptions, SetAttributeOptions,
};
use crate::{ClientError, FileStatus, FsPath, OpenBlockSpec, WorkerAddress};

/// A sequential input stream over file contents.
pub trait InStream: Read + Send {}
impl<T: Read + Send> InStream for T {}

/// A sequential output stream for a file being created.
pub trait OutStream: Write + Send {}
impl<T: Write + Send> OutStream for T {}

/// Positional (pread-style) reads.
///
/// Reads take `&self` so one reader can serve concurrent callers.
pub trait PositionReader: Send + Sync {
    /// Read up to `buf.len()` bytes starting at `position`.
    ///
    /// Returns the number of bytes read; 0 means end of file.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError>;
}

/// Client of the distributed cache tier.
///
/// Paths passed in are already in the backing store's namespace.
pub trait CacheClient: Send + Sync {
    fn get_status(
        &self,
        path: &FsPath,
        options: &GetStatusOptions,
    ) -> Result<FileStatus, ClientError>;

    fn list_status(
        &self,
        path: &FsPath,
        options: &ListStatusOptions,
    ) -> Result<Vec<FileStatus>, ClientError>;

    fn open_stream(
        &self,
        status: &FileStatus,
        spec: &OpenBlockSpec,
    ) -> Result<Box<dyn InStream>, ClientError>;

    fn open_position_reader(
        &self,
        status: &FileStatus,
        spec: &OpenBlockSpec,
    ) -> Result<Box<dyn PositionReader>, ClientError>;

    /// The worker currently serving `path`.
    fn resolve_worker(&self, path: &FsPath) -> Result<WorkerAddress, ClientError>;
}

/// The backing store: a complete read/write file system client.
///
/// It serves as the cold read path and the only writer.
pub trait DelegateStore: Send + Sync {
    fn get_status(
        &self,
        path: &FsPath,
        options: &GetStatusOptions,
    ) -> Result<FileStatus, ClientError>;

    fn list_status(
        &self,
        path: &FsPath,
        options: &ListStatusOptions,
    ) -> Result<Vec<FileStatus>, ClientError>;

    /// Visit every entry of a listing.
    fn iterate_status(
        &self,
        path: &FsPath,
        options: &ListStatusOptions,
        action: &mut dyn FnMut(&FileStatus),
    ) -> Result<(), ClientError> {
        for status in self.list_status(path, options)? {
            action(&status);
        }
        Ok(())
    }

    fn exists(&self, path: &FsPath, options: &ExistsOptions) -> Result<bool, ClientError>;

    /// Open `status.ufs_path` for sequential reading.
    fn open_file(
        &self,
        status: &FileStatus,
        options: &OpenFileOptions,
    ) -> Result<Box<dyn InStream>, ClientError>;

    /// Open `status.ufs_path` for positional reading.
    fn open_position_reader(
        &self,
        status: &FileStatus,
        options: &OpenFileOptions,
    ) -> Result<Box<dyn PositionReader>, ClientError>;

    fn create_file(
        &self,
        path: &FsPath,
        options: &CreateFileOptions,
    ) -> Result<Box<dyn OutStream>, ClientError>;

    fn create_directory(
        &self,
        path: &FsPath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), ClientError>;

    fn rename(&self, src: &FsPath, dst: &FsPath, options: &RenameOptions)
        -> Result<(), ClientError>;

    fn set_attribute(
        &self,
        path: &FsPath,
        options: &SetAttributeOptions,
    ) -> Result<(), ClientError>;
}

// Blanket implementations for shared and boxed readers

impl<T: PositionReader + ?Sized> PositionReader for Box<T> {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        self.as_ref().read_at(position, buf)
    }
}

impl<T: PositionReader + ?Sized> PositionReader for Arc<T> {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        self.as_ref().read_at(position, buf)
    }
}
