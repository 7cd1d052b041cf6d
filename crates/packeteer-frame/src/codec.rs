use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::bigendian;
use crate::error::{FrameError, Result};
use crate::flags::Flags;

/// Magic bytes: "\0SMT" (0x00 0x53 0x4D 0x54).
pub const MAGIC: [u8; 4] = [0x00, b'S', b'M', b'T'];

pub const FLAGS_LEN: usize = 2;
pub const TYPE_ID_LEN: usize = 4;
/// Fixed sub-id slot: UTF-8, NUL padded.
pub const SUB_ID_LEN: usize = 255;
pub const TIMESTAMP_LEN: usize = 8;
pub const PAYLOAD_LEN_LEN: usize = 2;
pub const CRC_LEN: usize = 4;

/// Bytes covered by the header CRC: flags through payload length.
pub const CRC_REGION_LEN: usize =
    FLAGS_LEN + TYPE_ID_LEN + SUB_ID_LEN + TIMESTAMP_LEN + PAYLOAD_LEN_LEN;

/// Everything before the payload: magic + CRC region + two CRCs = 283 bytes.
pub const HEADER_SIZE: usize = MAGIC.len() + CRC_REGION_LEN + 2 * CRC_LEN;

/// Largest payload a frame can carry, so header plus payload fit in 32767 bytes.
pub const MAX_PAYLOAD: usize = i16::MAX as usize - HEADER_SIZE;

/// How far the scanner may need to rewind after consuming a magic sequence.
pub const MARK_LIMIT: usize = MAX_PAYLOAD + HEADER_SIZE - MAGIC.len();

/// A decoded frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transport hint bits (low 16 bits only).
    pub flags: Flags,
    /// Message type id.
    pub type_id: i32,
    /// Optional string qualifier.
    pub sub_id: Option<String>,
    /// Sender's clock at serialization, epoch milliseconds.
    pub timestamp: i64,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame with empty flags, no sub-id and the current time.
    pub fn new(type_id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            flags: Flags::new(),
            type_id,
            sub_id: None,
            timestamp: now_millis(),
            payload: payload.into(),
        }
    }

    /// Set the sub-id. It must be non-empty, at most 255 UTF-8 bytes and free
    /// of NUL bytes, or encoding fails.
    #[must_use]
    pub fn with_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.sub_id = Some(sub_id.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode this frame, keeping its own flags and timestamp.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(
            self.flags,
            self.type_id,
            self.sub_id.as_deref(),
            self.timestamp,
            &self.payload,
            dst,
        )
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(flags={:016b}, type_id={}, sub_id={}, timestamp={}, payload_length={})",
            self.flags.wire_bits(),
            self.type_id,
            self.sub_id.as_deref().unwrap_or("none"),
            self.timestamp,
            self.payload.len()
        )
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("flags", &self.flags)
            .field("type_id", &self.type_id)
            .field("sub_id", &self.sub_id)
            .field("timestamp", &self.timestamp)
            .field("payload_length", &self.payload.len())
            .finish()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (all integers big-endian):
/// ```text
/// ┌───────────┬───────┬─────────┬──────────┬───────────┬─────────┬────────────┬──────────┬─────────┐
/// │ Magic (4) │ Flags │ Type ID │ Sub-ID   │ Timestamp │ Length  │ Header CRC │ Body CRC │ Payload │
/// │ "\0SMT"   │ (2)   │ (4)     │ (255)    │ (8)       │ (2)     │ (4)        │ (4)      │         │
/// └───────────┴───────┴─────────┴──────────┴───────────┴─────────┴────────────┴──────────┴─────────┘
///             └──────────────── header CRC region ─────────────┘
/// ```
///
/// Nothing is written to `dst` when the payload or sub-id is out of bounds.
pub fn encode_frame(
    flags: Flags,
    type_id: i32,
    sub_id: Option<&str>,
    timestamp: i64,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let sub_id_slot = encode_sub_id(sub_id)?;

    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);

    let region_start = dst.len();
    dst.put_slice(&bigendian::u16_to_bytes(flags.wire_bits()));
    dst.put_slice(&bigendian::i32_to_bytes(type_id));
    dst.put_slice(&sub_id_slot);
    dst.put_slice(&bigendian::i64_to_bytes(timestamp));
    dst.put_slice(&bigendian::u16_to_bytes(payload.len() as u16));

    let header_crc = checksum(&dst[region_start..]);
    dst.put_slice(&bigendian::u32_to_bytes(header_crc));
    dst.put_slice(&bigendian::u32_to_bytes(checksum(payload)));
    dst.put_slice(payload);
    Ok(())
}

/// CRC-32 (IEEE), as used for both the header and the body.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn encode_sub_id(sub_id: Option<&str>) -> Result<[u8; SUB_ID_LEN]> {
    let mut slot = [0u8; SUB_ID_LEN];
    if let Some(sub_id) = sub_id {
        let utf8 = sub_id.as_bytes();
        if utf8.len() > SUB_ID_LEN {
            return Err(FrameError::SubIdTooLong {
                len: utf8.len(),
                max: SUB_ID_LEN,
            });
        }
        if utf8.is_empty() {
            return Err(FrameError::SubIdEmpty);
        }
        if utf8.contains(&0) {
            return Err(FrameError::SubIdContainsNul);
        }
        slot[..utf8.len()].copy_from_slice(utf8);
    }
    Ok(slot)
}

/// Read a sub-id slot up to its first NUL. An empty slot means no sub-id.
pub(crate) fn decode_sub_id(slot: &[u8]) -> Option<String> {
    let len = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    if len == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&slot[..len]).into_owned())
}

/// Current wall clock in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Configuration for frame writers and the async codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Capped at [`MAX_PAYLOAD`].
    pub max_payload_size: usize,
    /// Flags stamped on frames sent with `send`/`send_at`.
    pub flags: Flags,
}

impl FrameConfig {
    /// The payload limit actually enforced.
    pub fn max_payload(&self) -> usize {
        self.max_payload_size.min(MAX_PAYLOAD)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            flags: Flags::new(),
        }
    }
}
