//! Exact-width big-endian conversions.
//!
//! Every multi-byte field on the wire and in message bodies goes through
//! these helpers. Encoding is infallible; decoding from a slice checks the
//! length first so a short or long buffer is reported instead of misread.

/// A slice did not have the width the decoded type requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} bytes, got {actual}")]
pub struct LengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

fn exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N], LengthMismatch> {
    bytes.try_into().map_err(|_| LengthMismatch {
        expected: N,
        actual: bytes.len(),
    })
}

pub fn i16_to_bytes(v: i16) -> [u8; 2] {
    v.to_be_bytes()
}

pub fn bytes_to_i16(bytes: &[u8]) -> Result<i16, LengthMismatch> {
    exact(bytes).map(i16::from_be_bytes)
}

pub fn u16_to_bytes(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

pub fn bytes_to_u16(bytes: &[u8]) -> Result<u16, LengthMismatch> {
    exact(bytes).map(u16::from_be_bytes)
}

pub fn i32_to_bytes(v: i32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn bytes_to_i32(bytes: &[u8]) -> Result<i32, LengthMismatch> {
    exact(bytes).map(i32::from_be_bytes)
}

pub fn u32_to_bytes(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn bytes_to_u32(bytes: &[u8]) -> Result<u32, LengthMismatch> {
    exact(bytes).map(u32::from_be_bytes)
}

pub fn i64_to_bytes(v: i64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn bytes_to_i64(bytes: &[u8]) -> Result<i64, LengthMismatch> {
    exact(bytes).map(i64::from_be_bytes)
}

/// Encodes the raw IEEE-754 bit pattern; NaN payloads survive untouched.
pub fn f32_to_bytes(v: f32) -> [u8; 4] {
    i32_to_bytes(v.to_bits() as i32)
}

pub fn bytes_to_f32(bytes: &[u8]) -> Result<f32, LengthMismatch> {
    bytes_to_i32(bytes).map(|bits| f32::from_bits(bits as u32))
}

/// Encodes the raw IEEE-754 bit pattern; NaN payloads survive untouched.
pub fn f64_to_bytes(v: f64) -> [u8; 8] {
    i64_to_bytes(v.to_bits() as i64)
}

pub fn bytes_to_f64(bytes: &[u8]) -> Result<f64, LengthMismatch> {
    bytes_to_i64(bytes).map(|bits| f64::from_bits(bits as u64))
}
