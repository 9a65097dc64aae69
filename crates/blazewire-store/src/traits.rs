use std::io::Read;

use crate::error::Result;

/// Byte sink for one buffer.
pub trait WriteStream {
    /// Append `bytes`, returning how many were accepted.
    ///
    /// Accepting fewer bytes than offered means the buffer is full or the
    /// backing store failed; callers treat it as fatal for the buffer.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Flush and release the stream.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Byte source for one buffer.
pub trait ReadStream: Read {
    /// Look at the next byte without consuming it.
    fn peek_byte(&mut self) -> Option<u8>;

    /// Consume one byte.
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    /// Release the stream.
    fn close(&mut self) {}
}

/// Storage for reassembled binary payloads, keyed by buffer id.
///
/// Streams borrow the store, so at most one is open at a time.
pub trait BufferStore {
    /// Open `id` for writing, truncating it unless `append` is set.
    ///
    /// Appending requires the buffer to exist already; a missing id fails
    /// with [`StoreError::NotFound`](crate::StoreError::NotFound).
    fn open_write(&mut self, id: &str, append: bool) -> Result<Box<dyn WriteStream + '_>>;

    /// Open `id` for reading from the start.
    fn open_read(&mut self, id: &str) -> Result<Box<dyn ReadStream + '_>>;

    /// Discard the buffer stored under `id`, if any.
    fn delete_result(&mut self, id: &str);

    /// Reclaim space. Called when a write stream could not be opened.
    /// Returns the number of buffers released.
    fn garbage_collect(&mut self) -> usize;
}

impl<S: BufferStore + ?Sized> BufferStore for &mut S {
    fn open_write(&mut self, id: &str, append: bool) -> Result<Box<dyn WriteStream + '_>> {
        (**self).open_write(id, append)
    }

    fn open_read(&mut self, id: &str) -> Result<Box<dyn ReadStream + '_>> {
        (**self).open_read(id)
    }

    fn delete_result(&mut self, id: &str) {
        (**self).delete_result(id)
    }

    fn garbage_collect(&mut self) -> usize {
        (**self).garbage_collect()
    }
}

impl<S: BufferStore + ?Sized> BufferStore for Box<S> {
    fn open_write(&mut self, id: &str, append: bool) -> Result<Box<dyn WriteStream + '_>> {
        (**self).open_write(id, append)
    }

    fn open_read(&mut self, id: &str) -> Result<Box<dyn ReadStream + '_>> {
        (**self).open_read(id)
    }

    fn delete_result(&mut self, id: &str) {
        (**self).delete_result(id)
    }

    fn garbage_collect(&mut self) -> usize {
        (**self).garbage_collect()
    }
}
