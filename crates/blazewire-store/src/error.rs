/// Errors that can occur opening buffer streams.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No storage left for a new buffer.
    #[error("buffer store exhausted opening {id:?}")]
    Exhausted { id: String },

    /// No buffer exists under the requested id.
    #[error("buffer {id:?} not found")]
    NotFound { id: String },

    /// An I/O error occurred in a backing store.
    #[error("buffer store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
