//! In-memory backing store.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tierfs_core::options::{
    CreateDirectoryOptions, CreateFileOptions, ExistsOptions, GetStatusOptions, ListStatusOptions,
    OpenFileOptions, RenameOptions, SetAttributeOptions,
};
use tierfs_core::{
    ClientError, DelegateStore, FileStatus, FsPath, InStream, OutStream, PositionReader,
};

use crate::calls::CallLog;
use crate::streams::{BytesReader, MemoryOutStream};

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    folder: bool,
    completed: bool,
    mode: u32,
    owner: Option<String>,
    group: Option<String>,
    pinned: bool,
}

impl Entry {
    fn file(data: Bytes, completed: bool) -> Self {
        Self {
            data,
            folder: false,
            completed,
            mode: 0o644,
            owner: None,
            group: None,
            pinned: false,
        }
    }

    fn directory() -> Self {
        Self {
            data: Bytes::new(),
            folder: true,
            completed: true,
            mode: 0o755,
            owner: None,
            group: None,
            pinned: false,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: RwLock<BTreeMap<String, Entry>>,
    calls: CallLog,
}

/// A backing store held entirely in memory.
///
/// Entries are keyed by the canonical form of their full path, so
/// `s3://bucket/a` and `s3://bucket//a/` name the same file. Parent
/// directories are created implicitly by the `put_*` helpers.
///
/// Clones share the same contents.
///
/// # Example
///
/// ```rust
/// use tierfs_core::{fs_path, DelegateStore};
/// use tierfs_core::options::GetStatusOptions;
/// use tierfs_memory::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// store.put_file("/ufs/a.txt", "hello");
///
/// let status = store
///     .get_status(&fs_path!("/ufs/a.txt"), &GetStatusOptions::default())
///     .unwrap();
/// assert_eq!(status.length, 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed file, creating parent directories.
    pub fn put_file(&self, path: &str, data: impl Into<Bytes>) {
        self.put(path, Entry::file(data.into(), true));
    }

    /// Add a file that is still being written.
    pub fn put_incomplete(&self, path: &str, data: impl Into<Bytes>) {
        self.put(path, Entry::file(data.into(), false));
    }

    /// Add a directory, creating parent directories.
    pub fn put_dir(&self, path: &str) {
        self.put(path, Entry::directory());
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: &str) -> Option<Bytes> {
        let key = FsPath::parse(path).ok().map(|p| key(&p))?;
        self.read().get(&key).map(|e| e.data.clone())
    }

    /// Calls received per [`DelegateStore`] operation.
    pub fn calls(&self) -> &CallLog {
        &self.inner.calls
    }

    /// Status of the entry at `path`, without recording a call.
    pub(crate) fn status(&self, path: &FsPath) -> Result<FileStatus, ClientError> {
        let key = key(path);
        let entries = self.read();
        let entry = entries.get(&key).ok_or_else(|| ClientError::not_found(path))?;
        Ok(to_status(&key, entry))
    }

    /// Directory listing of `path`, without recording a call.
    pub(crate) fn listing(&self, path: &FsPath) -> Result<Vec<FileStatus>, ClientError> {
        let dir = key(path);
        let entries = self.read();
        let entry = entries.get(&dir).ok_or_else(|| ClientError::not_found(path))?;
        if !entry.folder {
            return Ok(vec![to_status(&dir, entry)]);
        }

        Ok(entries
            .range(dir.clone()..)
            .take_while(|(k, _)| k.starts_with(&dir))
            .filter(|(k, _)| is_child(&dir, k))
            .map(|(k, e)| to_status(k, e))
            .collect())
    }

    /// Bytes of the file at `path`, without recording a call.
    pub(crate) fn data(&self, path: &FsPath) -> Result<Bytes, ClientError> {
        let key = key(path);
        let entries = self.read();
        match entries.get(&key) {
            None => Err(ClientError::not_found(path)),
            Some(e) if e.folder => Err(ClientError::Other {
                message: format!("{} is a directory", path),
            }),
            Some(e) => Ok(e.data.clone()),
        }
    }

    pub(crate) fn commit(&self, key: &str, data: Bytes, completed: bool) {
        let mut entries = self.write();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::file(Bytes::new(), completed));
        entry.data = data;
        entry.completed = completed;
    }

    fn put(&self, path: &str, entry: Entry) {
        let Ok(path) = FsPath::parse(path) else {
            log::warn!("Ignoring unparsable path {:?}", path);
            return;
        };
        let mut entries = self.write();
        for parent in parents(&path) {
            entries.entry(parent).or_insert_with(Entry::directory);
        }
        entries.insert(key(&path), entry);
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DelegateStore for InMemoryStore {
    fn get_status(
        &self,
        path: &FsPath,
        _options: &GetStatusOptions,
    ) -> Result<FileStatus, ClientError> {
        self.inner.calls.record("get_status");
        self.status(path)
    }

    fn list_status(
        &self,
        path: &FsPath,
        _options: &ListStatusOptions,
    ) -> Result<Vec<FileStatus>, ClientError> {
        self.inner.calls.record("list_status");
        self.listing(path)
    }

    fn exists(&self, path: &FsPath, _options: &ExistsOptions) -> Result<bool, ClientError> {
        self.inner.calls.record("exists");
        Ok(self.read().contains_key(&key(path)))
    }

    fn open_file(
        &self,
        status: &FileStatus,
        _options: &OpenFileOptions,
    ) -> Result<Box<dyn InStream>, ClientError> {
        self.inner.calls.record("open_file");
        let data = self.data(&FsPath::parse(&status.ufs_path).map_err(other)?)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_position_reader(
        &self,
        status: &FileStatus,
        _options: &OpenFileOptions,
    ) -> Result<Box<dyn PositionReader>, ClientError> {
        self.inner.calls.record("open_position_reader");
        let data = self.data(&FsPath::parse(&status.ufs_path).map_err(other)?)?;
        Ok(Box::new(BytesReader::new(data)))
    }

    fn create_file(
        &self,
        path: &FsPath,
        options: &CreateFileOptions,
    ) -> Result<Box<dyn OutStream>, ClientError> {
        self.inner.calls.record("create_file");
        let key = key(path);
        {
            let mut entries = self.write();
            if let Some(existing) = entries.get(&key) {
                if existing.folder || !options.overwrite.unwrap_or(false) {
                    return Err(ClientError::AlreadyExists {
                        path: path.to_string(),
                    });
                }
            }
            ensure_parents(&mut entries, path, options.recursive.unwrap_or(true))?;
            let mut entry = Entry::file(Bytes::new(), false);
            if let Some(mode) = options.mode {
                entry.mode = mode;
            }
            entries.insert(key.clone(), entry);
        }
        Ok(Box::new(MemoryOutStream::new(self.clone(), key)))
    }

    fn create_directory(
        &self,
        path: &FsPath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), ClientError> {
        self.inner.calls.record("create_directory");
        let key = key(path);
        let mut entries = self.write();
        if let Some(existing) = entries.get(&key) {
            if existing.folder && options.allow_exists.unwrap_or(false) {
                return Ok(());
            }
            return Err(ClientError::AlreadyExists {
                path: path.to_string(),
            });
        }
        ensure_parents(&mut entries, path, options.recursive.unwrap_or(false))?;
        let mut entry = Entry::directory();
        if let Some(mode) = options.mode {
            entry.mode = mode;
        }
        entries.insert(key, entry);
        Ok(())
    }

    fn rename(
        &self,
        src: &FsPath,
        dst: &FsPath,
        options: &RenameOptions,
    ) -> Result<(), ClientError> {
        self.inner.calls.record("rename");
        let src_key = key(src);
        let dst_key = key(dst);
        let mut entries = self.write();
        if !entries.contains_key(&src_key) {
            return Err(ClientError::not_found(src));
        }
        if entries.contains_key(&dst_key) && !options.overwrite.unwrap_or(false) {
            return Err(ClientError::AlreadyExists {
                path: dst.to_string(),
            });
        }
        ensure_parents(&mut entries, dst, false)?;

        let moved: Vec<String> = entries
            .range(src_key.clone()..)
            .take_while(|(k, _)| k.starts_with(&src_key))
            .map(|(k, _)| k.clone())
            .collect();
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new = format!("{}{}", dst_key, &old[src_key.len()..]);
                entries.insert(new, entry);
            }
        }
        Ok(())
    }

    fn set_attribute(
        &self,
        path: &FsPath,
        options: &SetAttributeOptions,
    ) -> Result<(), ClientError> {
        self.inner.calls.record("set_attribute");
        let mut entries = self.write();
        let entry = entries
            .get_mut(&key(path))
            .ok_or_else(|| ClientError::not_found(path))?;
        if let Some(mode) = options.mode {
            entry.mode = mode;
        }
        if let Some(owner) = &options.owner {
            entry.owner = Some(owner.clone());
        }
        if let Some(group) = &options.group {
            entry.group = Some(group.clone());
        }
        if let Some(pinned) = options.pinned {
            entry.pinned = pinned;
        }
        Ok(())
    }
}

/// Canonical key: directory form of the path.
fn key(path: &FsPath) -> String {
    path.normalized().to_string()
}

/// Keys of every proper ancestor of `path`, outermost first.
fn parents(path: &FsPath) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut current = path.parent();
    while let Some(parent) = current {
        ancestors.push(key(&parent));
        current = parent.parent();
    }
    ancestors.reverse();
    ancestors
}

fn ensure_parents(
    entries: &mut BTreeMap<String, Entry>,
    path: &FsPath,
    recursive: bool,
) -> Result<(), ClientError> {
    let parents = parents(path);
    for (i, parent) in parents.iter().enumerate() {
        match entries.get(parent) {
            Some(e) if e.folder => {}
            Some(_) => {
                return Err(ClientError::Other {
                    message: format!("{} is not a directory", parent),
                })
            }
            // The namespace root always exists.
            None if recursive || i == 0 => {
                entries.insert(parent.clone(), Entry::directory());
            }
            None => return Err(ClientError::not_found(parent)),
        }
    }
    Ok(())
}

fn is_child(dir: &str, candidate: &str) -> bool {
    candidate
        .strip_prefix(dir)
        .and_then(|rest| rest.strip_suffix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

fn to_status(key: &str, entry: &Entry) -> FileStatus {
    let path = if key.len() > 1 {
        key.trim_end_matches('/')
    } else {
        key
    };
    FileStatus {
        path: path.to_string(),
        ufs_path: path.to_string(),
        length: entry.data.len() as u64,
        folder: entry.folder,
        completed: entry.completed,
        last_modification_time_ms: 0,
        mode: entry.mode,
    }
}

fn other(e: tierfs_core::PathError) -> ClientError {
    ClientError::Other {
        message: e.to_string(),
    }
}
