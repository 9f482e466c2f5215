//! In-memory cache client with fault injection.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tierfs_core::options::{GetStatusOptions, ListStatusOptions};
use tierfs_core::{
    CacheClient, ClientError, FileStatus, FsPath, InStream, OpenBlockSpec, PositionReader,
    WorkerAddress,
};

use crate::calls::CallLog;
use crate::store::InMemoryStore;
use crate::streams::{BytesReader, SwitchedReader};

/// A cache tier that serves whatever an [`InMemoryStore`] holds.
///
/// Faults can be injected at runtime:
/// - [`InMemoryCacheClient::fail_with`] makes every call fail with an error
/// - [`InMemoryCacheClient::fail_reads`] makes positional reads fail after
///   the reader was handed out
///
/// Every call is recorded in [`InMemoryCacheClient::calls`].
#[derive(Debug)]
pub struct InMemoryCacheClient {
    store: InMemoryStore,
    worker: WorkerAddress,
    fault: Mutex<Option<ClientError>>,
    failing_reads: Arc<AtomicBool>,
    last_status_options: Mutex<Option<GetStatusOptions>>,
    last_block_spec: Mutex<Option<OpenBlockSpec>>,
    calls: CallLog,
}

impl InMemoryCacheClient {
    pub fn new(store: InMemoryStore, worker: WorkerAddress) -> Self {
        Self {
            store,
            worker,
            fault: Mutex::new(None),
            failing_reads: Arc::new(AtomicBool::new(false)),
            last_status_options: Mutex::new(None),
            last_block_spec: Mutex::new(None),
            calls: CallLog::default(),
        }
    }

    /// Fail every following call with `error`.
    pub fn fail_with(&self, error: ClientError) {
        *lock(&self.fault) = Some(error);
    }

    /// Stop injecting call failures.
    pub fn heal(&self) {
        *lock(&self.fault) = None;
    }

    /// Make reads on handed-out positional readers fail, or succeed again.
    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Options received by the most recent status lookup.
    pub fn last_status_options(&self) -> Option<GetStatusOptions> {
        lock(&self.last_status_options).clone()
    }

    /// Block spec received by the most recent open.
    pub fn last_block_spec(&self) -> Option<OpenBlockSpec> {
        lock(&self.last_block_spec).clone()
    }

    fn enter(&self, operation: &'static str) -> Result<(), ClientError> {
        self.calls.record(operation);
        match &*lock(&self.fault) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn data(&self, status: &FileStatus, spec: &OpenBlockSpec) -> Result<bytes::Bytes, ClientError> {
        *lock(&self.last_block_spec) = Some(spec.clone());
        let path = FsPath::parse(&status.ufs_path).map_err(|e| ClientError::Other {
            message: e.to_string(),
        })?;
        self.store.data(&path)
    }
}

impl CacheClient for InMemoryCacheClient {
    fn get_status(
        &self,
        path: &FsPath,
        options: &GetStatusOptions,
    ) -> Result<FileStatus, ClientError> {
        *lock(&self.last_status_options) = Some(options.clone());
        self.enter("get_status")?;
        self.store.status(path)
    }

    fn list_status(
        &self,
        path: &FsPath,
        _options: &ListStatusOptions,
    ) -> Result<Vec<FileStatus>, ClientError> {
        self.enter("list_status")?;
        self.store.listing(path)
    }

    fn open_stream(
        &self,
        status: &FileStatus,
        spec: &OpenBlockSpec,
    ) -> Result<Box<dyn InStream>, ClientError> {
        self.enter("open_stream")?;
        let data = self.data(status, spec)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_position_reader(
        &self,
        status: &FileStatus,
        spec: &OpenBlockSpec,
    ) -> Result<Box<dyn PositionReader>, ClientError> {
        self.enter("open_position_reader")?;
        let data = self.data(status, spec)?;
        Ok(Box::new(SwitchedReader::new(
            BytesReader::new(data),
            Arc::clone(&self.failing_reads),
        )))
    }

    fn resolve_worker(&self, _path: &FsPath) -> Result<WorkerAddress, ClientError> {
        self.enter("resolve_worker")?;
        Ok(self.worker.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
