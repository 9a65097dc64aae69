use blazewire_store::{BufferStore, StoreError, WriteStream};
use blazewire_transport::Transport;
use tracing::{debug, warn};

use crate::error::FailureCause;

/// An in-progress multi-frame binary receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReassembly {
    /// Type code of the FIRST frame.
    pub frame_type: u8,
    /// Buffer the frames are streamed into.
    pub buffer_id: String,
}

/// Multi-frame receive state. At most one reassembly runs at a time.
#[derive(Debug, Default)]
pub struct Reassembly {
    active: Option<ActiveReassembly>,
}

impl Reassembly {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_type(&self) -> Option<u8> {
        self.active.as_ref().map(|a| a.frame_type)
    }

    pub fn active(&self) -> Option<&ActiveReassembly> {
        self.active.as_ref()
    }

    /// Whether the reassembly in progress writes into `buffer_id`.
    pub fn is_writing(&self, buffer_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.buffer_id == buffer_id)
    }

    pub fn begin(&mut self, frame_type: u8, buffer_id: &str) {
        self.active = Some(ActiveReassembly {
            frame_type,
            buffer_id: buffer_id.to_string(),
        });
    }

    pub fn clear(&mut self) -> Option<ActiveReassembly> {
        self.active.take()
    }
}

/// How a frame lands in its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Start the buffer afresh, garbage collecting once if the store is full.
    Truncate,
    /// Start the buffer afresh, failing outright if the store is full.
    /// Collection must not run while another reply is mid-reassembly.
    TruncateNoCollect,
    /// Continue a buffer that must already exist.
    Append,
}

/// Copy the unread rest of the current transport message into `buffer_id`.
///
/// Opens the buffer according to `mode`, then copies through `chunk`,
/// looping over partial reads until the message is exhausted. A short
/// write fails the copy. Appending to a buffer that no longer exists fails
/// with [`FailureCause::MultipartReadInterrupted`].
pub fn stream_to_store<T, S>(
    transport: &mut T,
    store: &mut S,
    buffer_id: &str,
    mode: WriteMode,
    chunk: &mut [u8],
) -> Result<usize, FailureCause>
where
    T: Transport + ?Sized,
    S: BufferStore + ?Sized,
{
    let append = mode == WriteMode::Append;
    let err = match store.open_write(buffer_id, append) {
        Ok(stream) => return copy_message(transport, stream, buffer_id, chunk),
        Err(e) => e,
    };
    match err {
        StoreError::NotFound { .. } if append => {
            warn!(buffer_id, "reply buffer vanished mid-reassembly");
            return Err(FailureCause::MultipartReadInterrupted);
        }
        e if mode == WriteMode::Truncate => {
            let freed = store.garbage_collect();
            debug!(buffer_id, freed, error = %e, "write stream unavailable, garbage collected");
        }
        e => {
            warn!(buffer_id, error = %e, "failed to open write stream");
            return Err(FailureCause::BufferAllocFail);
        }
    }

    let stream = store.open_write(buffer_id, false).map_err(|e| {
        warn!(buffer_id, error = %e, "failed to open write stream");
        FailureCause::BufferAllocFail
    })?;
    copy_message(transport, stream, buffer_id, chunk)
}

fn copy_message<T>(
    transport: &mut T,
    mut stream: Box<dyn WriteStream + '_>,
    buffer_id: &str,
    chunk: &mut [u8],
) -> Result<usize, FailureCause>
where
    T: Transport + ?Sized,
{
    let mut copied = 0usize;
    loop {
        let want = transport.available().min(chunk.len());
        if want == 0 {
            break;
        }
        let read = transport.read_bytes(&mut chunk[..want]).map_err(|e| {
            warn!(buffer_id, error = %e, "transport read failed mid-frame");
            FailureCause::MultipartReadInterrupted
        })?;
        if read == 0 {
            break;
        }
        let written = stream.write(&chunk[..read]);
        if written != read {
            warn!(buffer_id, read, written, "partial write on reply buffer");
            return Err(FailureCause::StreamWriteFailure);
        }
        copied += read;
    }

    stream.close().map_err(|e| {
        warn!(buffer_id, error = %e, "failed to close reply buffer");
        FailureCause::StreamWriteFailure
    })?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use blazewire_store::{MemoryStore, MemoryStoreConfig};
    use blazewire_transport::MemoryTransport;

    use super::*;

    #[test]
    fn state_transitions() {
        let mut state = Reassembly::default();
        assert!(!state.is_active());
        state.begin(7, "patterns.1");
        assert_eq!(state.active_type(), Some(7));
        assert!(state.is_writing("patterns.1"));
        assert!(!state.is_writing("patterns.2"));
        assert_eq!(state.clear().map(|a| a.frame_type), Some(7));
        assert!(!state.is_active());
    }

    #[test]
    fn copies_through_small_chunks_and_partial_reads() {
        let mut transport = MemoryTransport::new().with_max_read(3);
        transport.push_binary(b"0123456789".to_vec());
        transport.next_message().unwrap();
        let mut store = MemoryStore::default();
        let mut chunk = [0u8; 4];

        let n = stream_to_store(&mut transport, &mut store, "b", WriteMode::Truncate, &mut chunk).unwrap();
        assert_eq!(n, 10);
        assert_eq!(store.get("b"), Some(&b"0123456789"[..]));
    }

    #[test]
    fn append_continues_buffer() {
        let mut transport = MemoryTransport::new();
        transport.push_binary(b"ab".to_vec());
        transport.push_binary(b"cd".to_vec());
        let mut store = MemoryStore::default();
        let mut chunk = [0u8; 8];

        transport.next_message().unwrap();
        stream_to_store(&mut transport, &mut store, "b", WriteMode::Truncate, &mut chunk).unwrap();
        transport.next_message().unwrap();
        stream_to_store(&mut transport, &mut store, "b", WriteMode::Append, &mut chunk).unwrap();
        assert_eq!(store.get("b"), Some(&b"abcd"[..]));
    }

    #[test]
    fn full_store_is_garbage_collected_once() {
        let mut store = MemoryStore::new(MemoryStoreConfig {
            buffers: 1,
            buffer_bytes: 16,
        });
        store.open_write("old", false).unwrap().write(b"x");

        let mut transport = MemoryTransport::new();
        transport.push_binary(b"new".to_vec());
        transport.next_message().unwrap();
        let mut chunk = [0u8; 8];

        stream_to_store(&mut transport, &mut store, "b", WriteMode::Truncate, &mut chunk).unwrap();
        assert!(!store.contains("old"));
        assert_eq!(store.get("b"), Some(&b"new"[..]));
    }

    #[test]
    fn short_write_fails() {
        let mut store = MemoryStore::new(MemoryStoreConfig {
            buffers: 1,
            buffer_bytes: 4,
        });
        let mut transport = MemoryTransport::new();
        transport.push_binary(b"too long".to_vec());
        transport.next_message().unwrap();
        let mut chunk = [0u8; 8];

        assert_eq!(
            stream_to_store(&mut transport, &mut store, "b", WriteMode::Truncate, &mut chunk),
            Err(FailureCause::StreamWriteFailure)
        );
    }

    #[test]
    fn append_to_missing_buffer_fails() {
        let mut transport = MemoryTransport::new();
        transport.push_binary(b"tail".to_vec());
        transport.next_message().unwrap();
        let mut store = MemoryStore::default();
        let mut chunk = [0u8; 8];

        assert_eq!(
            stream_to_store(&mut transport, &mut store, "b", WriteMode::Append, &mut chunk),
            Err(FailureCause::MultipartReadInterrupted)
        );
        assert!(!store.contains("b"));
    }

    #[test]
    fn no_collect_mode_leaves_full_store_alone() {
        let mut store = MemoryStore::new(MemoryStoreConfig {
            buffers: 1,
            buffer_bytes: 16,
        });
        store.open_write("partial", false).unwrap().write(b"head");

        let mut transport = MemoryTransport::new();
        transport.push_binary(b"cfg".to_vec());
        transport.next_message().unwrap();
        let mut chunk = [0u8; 8];

        assert_eq!(
            stream_to_store(
                &mut transport,
                &mut store,
                "expander",
                WriteMode::TruncateNoCollect,
                &mut chunk
            ),
            Err(FailureCause::BufferAllocFail)
        );
        assert_eq!(store.get("partial"), Some(&b"head"[..]));
    }
}
