//! Self-synchronizing packet framing for unreliable byte streams.
//!
//! Every frame carries:
//! - A 4-byte magic (`00 53 4D 54`) the reader scans for
//! - A flags bitset, an `i32` type id, a 255-byte sub-id slot and a timestamp
//! - A 2-byte big-endian payload length
//! - A CRC-32 over the header and another over the payload
//!
//! The reader skips garbage and corrupt frames on its own: a bad checksum
//! rewinds to just after the magic and the scan continues from there.
//! Callers only ever see whole, verified frames.

pub mod bigendian;
pub mod body;
pub mod codec;
pub mod error;
pub mod flags;
pub mod message;
pub mod reader;
pub mod reserved;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use body::{BodyError, BodyReader, BodyWriter};
pub use codec::{
    checksum, encode_frame, now_millis, Frame, FrameConfig, HEADER_SIZE, MAGIC, MARK_LIMIT,
    MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use flags::{Flags, FlagsError, FLAG_IGNORE_BODY_CRC, FLAG_UNRELIABLE};
pub use message::{Message, MessageError, MessageRegistry};
pub use reader::{FrameReader, Frames};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::FrameCodec;
