/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message ended before a complete frame header was read.
    #[error("truncated frame ({len} bytes, header needs {needed})")]
    Truncated { len: usize, needed: usize },

    /// An outbound frame was requested with no payload.
    #[error("refusing to send an empty binary frame")]
    EmptyFrame,

    /// A fragment size of zero or a payload beyond the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying transport failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] blazewire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
