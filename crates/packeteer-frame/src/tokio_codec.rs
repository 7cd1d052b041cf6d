//! Frame codec for `tokio_util::codec::{FramedRead, FramedWrite}`.

use std::io::Cursor;

use bytes::{Buf, BytesMut};
use packeteer_transport::SeekMark;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{Frame, FrameConfig, MAGIC};
use crate::error::FrameError;
use crate::reader::FrameReader;

/// Async adapter over the blocking frame scanner.
///
/// Each decode scans the buffered bytes with the same resynchronizing logic
/// as [`FrameReader`]. Bytes that can no longer start a frame are dropped
/// from the buffer; an incomplete frame stays buffered from its magic on.
///
/// Only [`FrameConfig::max_payload`] applies when encoding. A [`Frame`]
/// carries its own flags and timestamp, so `config.flags` is not stamped.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: FrameConfig,
}

enum Scan {
    Frame(Frame),
    /// More bytes are needed. `partial` is set when a frame was cut short.
    NeedMore { partial: bool },
}

impl FrameCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn scan(&self, src: &mut BytesMut) -> Result<Scan, FrameError> {
        let mut reader = FrameReader::new(SeekMark::new(Cursor::new(&src[..])))?;
        let outcome = reader.read_frame();
        let position = usize::try_from(reader.get_ref().get_ref().position())
            .unwrap_or(src.len())
            .min(src.len());

        match outcome {
            Ok(frame) => {
                src.advance(position);
                Ok(Scan::Frame(frame))
            }
            Err(FrameError::EndOfStream) => {
                // Keep a tail long enough to hold a split magic.
                src.advance(src.len().saturating_sub(MAGIC.len() - 1));
                Ok(Scan::NeedMore { partial: false })
            }
            Err(FrameError::Truncated) => {
                // The scanner rewound to just after the magic.
                src.advance(position.saturating_sub(MAGIC.len()));
                src.reserve(crate::codec::MARK_LIMIT.saturating_sub(src.len()));
                Ok(Scan::NeedMore { partial: true })
            }
            Err(err) => Err(err),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match self.scan(src)? {
            Scan::Frame(frame) => Ok(Some(frame)),
            Scan::NeedMore { .. } => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match self.scan(src)? {
            Scan::Frame(frame) => Ok(Some(frame)),
            Scan::NeedMore { partial: true } => {
                src.clear();
                Err(FrameError::Truncated)
            }
            Scan::NeedMore { partial: false } => {
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let max = self.config.max_payload();
        if frame.payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max,
            });
        }
        frame.encode(dst)
    }
}
