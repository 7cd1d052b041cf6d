use crate::bigendian::LengthMismatch;
use crate::message::MessageError;

/// Errors that can occur during frame encoding/decoding.
///
/// Corrupt frames are not errors: the scanner skips them and keeps looking.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The sub-id does not fit its fixed-width slot.
    #[error("sub-id too long ({len} UTF-8 bytes, max {max})")]
    SubIdTooLong { len: usize, max: usize },

    /// The sub-id is present but empty, which the wire cannot tell apart from absent.
    #[error("sub-id must not be empty (use no sub-id instead)")]
    SubIdEmpty,

    /// The sub-id contains a NUL byte, which terminates the slot on the wire.
    #[error("sub-id must not contain NUL bytes")]
    SubIdContainsNul,

    /// The stream ended while searching for the start of a frame.
    #[error("end of stream reached while searching for a frame")]
    EndOfStream,

    /// The stream ended partway through a frame.
    #[error("end of stream reached inside a frame")]
    Truncated,

    /// The stream cannot rewind far enough to recover from corrupt frames.
    #[error("stream cannot rewind far enough (capacity {capacity} bytes, need {required})")]
    MarkUnsupported { capacity: usize, required: usize },

    /// The connection was closed while writing a frame.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Marking or rewinding the stream failed.
    #[error("stream rewind failed: {0}")]
    Transport(#[from] packeteer_transport::TransportError),

    /// A fixed-width field had the wrong size.
    #[error("field width mismatch: {0}")]
    Length(#[from] LengthMismatch),

    /// A message could not be serialized for sending.
    #[error(transparent)]
    Message(#[from] MessageError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
