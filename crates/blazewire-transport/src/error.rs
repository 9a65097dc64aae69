/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the controller.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// An I/O error occurred on the underlying connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is closed.
    #[error("connection closed")]
    Closed,

    /// A read was attempted with no current message.
    #[error("no current message")]
    NoMessage,

    /// The remote end violated the message protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transport cannot re-establish its connection.
    #[error("reconnect not supported by this transport")]
    ReconnectUnsupported,
}

pub type Result<T> = std::result::Result<T, TransportError>;
