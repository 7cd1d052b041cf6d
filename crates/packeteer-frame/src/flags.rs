//! Per-frame transport hint bits.
//!
//! The container holds 32 bits but only the low 16 are written to the wire.

use std::fmt;

/// Bit index: delivery may be unreliable. Not interpreted by the codec.
pub const FLAG_UNRELIABLE: u32 = 0;

/// Bit index: accept frames whose body CRC does not match.
pub const FLAG_IGNORE_BODY_CRC: u32 = 1;

const CAPACITY: u32 = u32::BITS;

/// Requested a binary rendering wider than the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("binary width must be within 0-32, got {0}")]
pub struct FlagsError(pub usize);

/// A fixed-width bitset addressed by bit index.
///
/// `Flags` is `Copy`: writers take a snapshot when a frame is serialized, so
/// later changes never affect a frame already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    raw: u32,
}

impl Flags {
    /// All bits clear.
    pub const fn new() -> Self {
        Self { raw: 0 }
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// The 16 bits that go on the wire.
    pub const fn wire_bits(self) -> u16 {
        self.raw as u16
    }

    /// Set or clear bit `index`. Indices outside the container are ignored.
    pub fn set(&mut self, index: u32, value: bool) -> &mut Self {
        if index < CAPACITY {
            if value {
                self.raw |= 1 << index;
            } else {
                self.raw &= !(1 << index);
            }
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, index: u32, value: bool) -> Self {
        self.set(index, value);
        self
    }

    pub fn get(self, index: u32) -> bool {
        index < CAPACITY && self.raw & (1 << index) != 0
    }

    pub fn is_unreliable(self) -> bool {
        self.get(FLAG_UNRELIABLE)
    }

    pub fn ignores_body_crc(self) -> bool {
        self.get(FLAG_IGNORE_BODY_CRC)
    }

    /// Zero-padded binary rendering, most significant bit first.
    ///
    /// Values with more significant bits than `width` render in full,
    /// the same way an unpadded binary string would.
    pub fn to_binary_string(self, width: usize) -> Result<String, FlagsError> {
        if width > CAPACITY as usize {
            return Err(FlagsError(width));
        }
        Ok(format!("{:0width$b}", self.raw, width = width))
    }
}

impl From<u16> for Flags {
    fn from(bits: u16) -> Self {
        Self::from_raw(u32::from(bits))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032b}", self.raw)
    }
}
