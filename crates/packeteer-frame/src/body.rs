//! Primitive read/write layer for message bodies.
//!
//! Body encoding, independent of framing:
//! - byte, boolean, null marker: one byte
//! - i16 / i32 / i64: big-endian, no prefix
//! - f32 / f64: IEEE-754 bits as i32 / i64
//! - bytes, string: 4-byte big-endian length, then the data (UTF-8 for strings)

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::bigendian;

/// Errors raised while encoding or decoding a message body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body ended before a complete value could be read.
    #[error("end of body: needed {needed} bytes, {available} available")]
    EndOfStream { needed: usize, available: usize },

    /// A length prefix was negative.
    #[error("negative length prefix ({0})")]
    NegativeLength(i32),

    /// A byte field is too long for its 4-byte length prefix.
    #[error("byte field too long ({0} bytes)")]
    TooLong(usize),

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Message-specific validation failed.
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, BodyError>;

const INITIAL_BODY_CAPACITY: usize = 64;

/// Append-only body encoder.
#[derive(Debug, Default)]
pub struct BodyWriter {
    buf: BytesMut,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BODY_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_byte(&mut self, b: u8) -> &mut Self {
        self.buf.put_u8(b);
        self
    }

    /// Length-prefixed byte field.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<&mut Self> {
        let len = i32::try_from(data.len()).map_err(|_| BodyError::TooLong(data.len()))?;
        self.write_i32(len);
        self.buf.put_slice(data);
        Ok(self)
    }

    pub fn write_str(&mut self, s: &str) -> Result<&mut Self> {
        self.write_bytes(s.as_bytes())
    }

    /// Explicit "absent" marker.
    pub fn write_null(&mut self) -> &mut Self {
        self.write_byte(0)
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_byte(u8::from(value))
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.buf.put_slice(&bigendian::i16_to_bytes(v));
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_slice(&bigendian::i32_to_bytes(v));
        self
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_slice(&bigendian::i64_to_bytes(v));
        self
    }

    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_slice(&bigendian::f32_to_bytes(v));
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_slice(&bigendian::f64_to_bytes(v));
        self
    }

    /// Finish and take the encoded body.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Sequential body decoder over an in-memory payload.
///
/// Every read checks the remaining length first; reading past the end
/// fails with [`BodyError::EndOfStream`] and consumes nothing.
#[derive(Debug, Clone)]
pub struct BodyReader {
    buf: Bytes,
}

impl BodyReader {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            buf: payload.into(),
        }
    }

    /// Bytes left to read.
    pub fn available(&self) -> usize {
        self.buf.remaining()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(BodyError::EndOfStream {
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let [b] = self.take::<1>()?;
        Ok(b)
    }

    /// Length-prefixed byte field. Zero-copy.
    pub fn read_bytes(&mut self) -> Result<Bytes> {
        self.ensure(4)?;
        let len = i32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let len = usize::try_from(len).map_err(|_| BodyError::NegativeLength(len))?;
        self.ensure(4 + len)?;
        self.buf.advance(4);
        Ok(self.buf.split_to(len))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let raw = self.read_bytes()?;
        Ok(String::from_utf8(raw.to_vec())?)
    }

    /// Consume a null marker.
    pub fn read_null(&mut self) -> Result<()> {
        self.read_byte().map(|_| ())
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_byte().map(|b| b != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.take::<2>().map(i16::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.take::<4>().map(i32::from_be_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.take::<8>().map(i64::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_i32().map(|bits| f32::from_bits(bits as u32))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_i64().map(|bits| f64::from_bits(bits as u64))
    }
}
