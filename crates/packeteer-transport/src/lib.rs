//! Rewindable stream abstraction.
//!
//! The frame scanner must be able to return to the byte right after a
//! magic sequence whenever a candidate frame turns out to be corrupt. This
//! crate provides that capability on top of plain `std::io` streams:
//! - [`Markable`]: the mark / reset / skip contract the scanner relies on
//! - [`MarkReader`]: buffers any `Read` so it can be rewound (sockets, pipes, stdin)
//! - [`SeekMark`]: marks by stream position on anything that is `Read + Seek`
//!
//! This is the lowest layer of packeteer. Transports themselves (socket
//! setup, file opening) are left to the caller.

pub mod error;
pub mod mark;
pub mod traits;

pub use error::{Result, TransportError};
pub use mark::{MarkReader, SeekMark, DEFAULT_MARK_CAPACITY};
pub use traits::Markable;
