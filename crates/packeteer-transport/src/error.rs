/// Errors raised by rewindable stream adapters.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A mark was requested with a read limit the stream cannot buffer.
    #[error("mark limit {requested} exceeds stream capacity {capacity}")]
    MarkLimitExceeded { requested: usize, capacity: usize },

    /// `reset` was called without a valid mark.
    #[error("no valid mark to reset to (never set or read limit exceeded)")]
    MarkInvalidated,

    /// The stream ended before the requested number of bytes could be skipped.
    #[error("stream ended after skipping {actual} of {expected} bytes")]
    Truncated { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
