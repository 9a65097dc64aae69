use std::io::Read;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{BufferStore, ReadStream, WriteStream};

/// Sizing for a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Number of buffers in the pool. Default: 3.
    pub buffers: usize,
    /// Capacity of each buffer in bytes. Default: 10 000.
    pub buffer_bytes: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            buffers: 3,
            buffer_bytes: 10_000,
        }
    }
}

#[derive(Debug)]
struct NamedBuffer {
    name: Option<String>,
    data: Vec<u8>,
    written_seq: u64,
}

/// A fixed pool of named in-memory buffers.
///
/// Buffers are allocated lazily up to the configured count. Garbage
/// collection releases the least recently written buffer.
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryStoreConfig,
    buffers: Vec<NamedBuffer>,
    seq: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            buffers: Vec::with_capacity(config.buffers),
            config,
            seq: 0,
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Whether a buffer is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// The bytes stored under `id`.
    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.position(id).map(|idx| self.buffers[idx].data.as_slice())
    }

    /// Ids of every buffer in use.
    pub fn ids(&self) -> Vec<&str> {
        self.buffers
            .iter()
            .filter_map(|b| b.name.as_deref())
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.buffers
            .iter()
            .position(|b| b.name.as_deref() == Some(id))
    }

    fn claim(&mut self, id: &str, append: bool) -> Result<usize> {
        if let Some(idx) = self.position(id) {
            if !append {
                self.buffers[idx].data.clear();
            }
            return Ok(idx);
        }
        if append {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        if let Some(idx) = self.buffers.iter().position(|b| b.name.is_none()) {
            let buffer = &mut self.buffers[idx];
            buffer.name = Some(id.to_string());
            buffer.data.clear();
            return Ok(idx);
        }

        if self.buffers.len() < self.config.buffers {
            self.buffers.push(NamedBuffer {
                name: Some(id.to_string()),
                data: Vec::with_capacity(self.config.buffer_bytes),
                written_seq: 0,
            });
            return Ok(self.buffers.len() - 1);
        }

        Err(StoreError::Exhausted { id: id.to_string() })
    }
}

impl BufferStore for MemoryStore {
    fn open_write(&mut self, id: &str, append: bool) -> Result<Box<dyn WriteStream + '_>> {
        let idx = self.claim(id, append)?;
        self.seq += 1;
        let capacity = self.config.buffer_bytes;
        let buffer = &mut self.buffers[idx];
        buffer.written_seq = self.seq;
        Ok(Box::new(MemWriteStream { buffer, capacity }))
    }

    fn open_read(&mut self, id: &str) -> Result<Box<dyn ReadStream + '_>> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok(Box::new(MemReadStream {
            remaining: &self.buffers[idx].data,
        }))
    }

    fn delete_result(&mut self, id: &str) {
        if let Some(idx) = self.position(id) {
            let buffer = &mut self.buffers[idx];
            buffer.name = None;
            buffer.data.clear();
        }
    }

    fn garbage_collect(&mut self) -> usize {
        let oldest = self
            .buffers
            .iter_mut()
            .filter(|b| b.name.is_some())
            .min_by_key(|b| b.written_seq);

        match oldest {
            Some(buffer) => {
                debug!(buffer_id = ?buffer.name, "releasing least recently written buffer");
                buffer.name = None;
                buffer.data.clear();
                1
            }
            None => 0,
        }
    }
}

struct MemWriteStream<'a> {
    buffer: &'a mut NamedBuffer,
    capacity: usize,
}

impl WriteStream for MemWriteStream<'_> {
    fn write(&mut self, bytes: &[u8]) -> usize {
        let room = self.capacity.saturating_sub(self.buffer.data.len());
        let n = room.min(bytes.len());
        self.buffer.data.extend_from_slice(&bytes[..n]);
        n
    }
}

struct MemReadStream<'a> {
    remaining: &'a [u8],
}

impl Read for MemReadStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.remaining.read(buf)
    }
}

impl ReadStream for MemReadStream<'_> {
    fn peek_byte(&mut self) -> Option<u8> {
        self.remaining.first().copied()
    }
}
