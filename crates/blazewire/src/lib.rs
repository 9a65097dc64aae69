//! Client protocol engine for Pixelblaze LED controllers.
//!
//! A controller multiplexes JSON text and typed binary frames over one
//! WebSocket, with no request ids. blazewire correlates replies to requests
//! by order and content, reassembles multi-frame binary replies, and routes
//! everything unrequested to a watcher.
//!
//! # Crate Structure
//!
//! - [`transport`]: message-oriented transport trait, in-memory and WebSocket transports
//! - [`frame`]: binary frame types, flags and fragmenting writer
//! - [`store`]: buffer stores for reassembled binary replies
//! - [`client`]: reply queue, dispatcher, reassembler and request API

/// Re-export transport types.
pub mod transport {
    pub use blazewire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use blazewire_frame::*;
}

/// Re-export buffer store types.
pub mod store {
    pub use blazewire_store::*;
}

/// Re-export client types.
pub mod client {
    pub use blazewire_client::*;
}

pub use blazewire_client::{Client, ClientConfig, ClientError, CompletionToken, Watcher};
