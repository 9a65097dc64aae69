//! Message-oriented transport abstraction for Pixelblaze controllers.
//!
//! A controller connection carries whole messages of two kinds, JSON text and
//! binary frames. This is the lowest layer of blazewire; everything else
//! builds on the [`Transport`] trait defined here.
//!
//! - [`MemoryTransport`] is a scripted in-memory implementation
//! - [`WsTransport`] is a poll-based WebSocket implementation (behind `ws`)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "ws")]
pub mod ws;

pub use error::{Result, TransportError};
pub use memory::{MemoryTransport, Outbound};
pub use traits::{InboundMessage, MessageKind, Transport};

#[cfg(feature = "ws")]
pub use ws::WsTransport;
