//! Buffer stores for reassembled binary replies.
//!
//! Multi-frame binary replies (pattern lists, preview images, expander
//! configuration) are streamed into a [`BufferStore`] under a string id and
//! read back when the reply completes. Two stores are provided:
//! - [`MemoryStore`], a fixed pool of in-memory buffers
//! - [`DirStore`], one file per buffer under a directory

pub mod dir;
pub mod error;
pub mod memory;
pub mod traits;

pub use dir::{DirStore, TrashPredicate};
pub use error::{Result, StoreError};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use traits::{BufferStore, ReadStream, WriteStream};
