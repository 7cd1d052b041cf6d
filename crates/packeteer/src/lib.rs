//! Self-synchronizing packet framing for unreliable byte streams.
//!
//! Frames carry a magic sequence, a CRC-protected header and a CRC-protected
//! payload, so a reader can join a stream at any point and recover from
//! corruption without help from the transport.
//!
//! # Crate Structure
//!
//! - [`transport`]: rewindable stream adapters (`Markable`, `MarkReader`, `SeekMark`)
//! - [`frame`]: the frame codec, scanner, writer, body codec and message registry

/// Re-export transport types.
pub mod transport {
    pub use packeteer_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use packeteer_frame::*;
}
