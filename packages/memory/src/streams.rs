//! Readers and writers over in-memory file contents.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tierfs_core::{ClientError, PositionReader};

use crate::store::InMemoryStore;

/// Positional reads over a byte buffer.
#[derive(Debug, Clone)]
pub struct BytesReader {
    data: Bytes,
}

impl BytesReader {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }
}

impl PositionReader for BytesReader {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        let len = self.data.len();
        let start = usize::try_from(position).unwrap_or(usize::MAX).min(len);
        let n = buf.len().min(len - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

/// A reader whose reads fail while a shared switch is on.
#[derive(Debug)]
pub struct SwitchedReader {
    inner: BytesReader,
    failing: Arc<AtomicBool>,
}

impl SwitchedReader {
    pub fn new(inner: BytesReader, failing: Arc<AtomicBool>) -> Self {
        Self { inner, failing }
    }
}

impl PositionReader for SwitchedReader {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<usize, ClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::transport("worker stopped serving reads"));
        }
        self.inner.read_at(position, buf)
    }
}

/// Output stream of a file being created.
///
/// The file is visible but incomplete until the stream is dropped.
#[derive(Debug)]
pub struct MemoryOutStream {
    store: InMemoryStore,
    key: String,
    buffer: Vec<u8>,
}

impl MemoryOutStream {
    pub(crate) fn new(store: InMemoryStore, key: String) -> Self {
        Self {
            store,
            key,
            buffer: Vec::new(),
        }
    }
}

impl Write for MemoryOutStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.store
            .commit(&self.key, Bytes::copy_from_slice(&self.buffer), false);
        Ok(())
    }
}

impl Drop for MemoryOutStream {
    fn drop(&mut self) {
        let data = Bytes::from(std::mem::take(&mut self.buffer));
        self.store.commit(&self.key, data, true);
    }
}
