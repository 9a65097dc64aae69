//! Request/reply engine for Pixelblaze LED controllers.
//!
//! A controller speaks JSON text and typed binary frames over one
//! connection, with no request ids. Replies are matched to requests by
//! order and by content:
//!
//! - [`ReplyQueue`] holds pending requests as [`Slot`]s in issuance order
//! - the dispatcher offers each inbound message to the front slot and
//!   routes anything unclaimed to a [`Watcher`]
//! - multi-frame binary replies are reassembled into a
//!   [`BufferStore`](blazewire_store::BufferStore) and read back on completion
//!
//! [`Client`] ties these together. Call [`Client::check_for_inbound`]
//! regularly, or block on a [`CompletionToken`] with [`Client::wait`].

pub mod client;
pub mod completion;
pub mod config;
mod dispatch;
pub mod error;
pub mod messages;
pub mod patterns;
pub mod preview;
pub mod queue;
pub mod reassembly;
pub mod slot;
mod unsolicited;
pub mod watcher;

pub use client::{Client, SystemStateRequest, SystemStateTokens, DEFAULT_PLAYLIST};
pub use completion::{Completion, CompletionToken};
pub use config::ClientConfig;
pub use error::{ClientError, FailureCause, Result};
pub use messages::{Control, Peer, Playlist, PlaylistItem, PlaylistUpdate, SequencerState, Settings, Stats};
pub use patterns::{PatternEntry, PatternIter};
pub use queue::ReplyQueue;
pub use reassembly::{stream_to_store, ActiveReassembly, Reassembly, WriteMode};
pub use slot::{Reply, ReplyKind, Slot};
pub use watcher::{NoopWatcher, Watcher};
