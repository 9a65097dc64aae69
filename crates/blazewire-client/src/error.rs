use std::time::Duration;

/// Why a pending request ended without its reply callback firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FailureCause {
    /// No reply arrived within the configured wait.
    #[error("timed out waiting for reply")]
    TimedOut,

    /// The buffer store could not open a buffer, even after garbage collection.
    #[error("could not allocate a buffer for the reply")]
    BufferAllocFail,

    /// A multi-frame reply was interrupted by an unrelated frame or a read error.
    #[error("multi-frame reply interrupted")]
    MultipartReadInterrupted,

    /// The buffer store accepted fewer bytes than were written.
    #[error("short write into reply buffer")]
    StreamWriteFailure,

    /// The completed reply could not be read back from the buffer store.
    #[error("could not read reply buffer")]
    BufferReadFailure,

    /// The reply matched but its fields could not be decoded.
    #[error("reply could not be decoded")]
    ReplyDecodeFailure,

    /// The connection dropped and could not be repaired.
    #[error("connection lost")]
    ConnectionLost,

    /// The client was shut down with the request still pending.
    #[error("client dropped")]
    ClientDropped,
}

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] blazewire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] blazewire_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The reply queue stayed full after compaction; the request was not sent.
    #[error("reply queue full ({capacity} pending)")]
    QueueFull { capacity: usize },

    /// Waiting for a reply exceeded the caller's deadline.
    #[error("no reply after {0:?}")]
    Timeout(Duration),

    /// The request ended without a reply.
    #[error("request failed: {0}")]
    Failed(FailureCause),

    /// The connection is down and could not be repaired.
    #[error("not connected to controller")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ClientError>;
