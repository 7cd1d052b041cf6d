use std::io::{ErrorKind, Read};

use packeteer_transport::{MarkReader, Markable, DEFAULT_MARK_CAPACITY};

use crate::bigendian;
use crate::codec::{
    checksum, decode_sub_id, Frame, CRC_LEN, CRC_REGION_LEN, FLAGS_LEN, HEADER_SIZE, MAGIC,
    MARK_LIMIT, MAX_PAYLOAD, SUB_ID_LEN, TIMESTAMP_LEN, TYPE_ID_LEN,
};
use crate::error::{FrameError, Result};
use crate::flags::Flags;

/// Scans a stream for frames, skipping garbage and corrupt frames.
///
/// Each call to [`read_frame`](FrameReader::read_frame) searches for the
/// magic sequence, validates the header CRC before trusting the declared
/// length, then validates the body CRC. A frame failing either check is
/// abandoned and the search resumes from the byte after its magic, so a
/// real frame hiding inside a corrupt one is still found.
pub struct FrameReader<T> {
    inner: T,
}

impl<T: Markable> FrameReader<T> {
    /// Create a frame reader.
    ///
    /// Fails with [`FrameError::MarkUnsupported`] if the stream cannot rewind
    /// over the largest possible frame.
    pub fn new(inner: T) -> Result<Self> {
        if let Some(capacity) = inner.mark_capacity() {
            if capacity < MARK_LIMIT {
                return Err(FrameError::MarkUnsupported {
                    capacity,
                    required: MARK_LIMIT,
                });
            }
        }
        Ok(Self { inner })
    }

    /// Read the next valid frame (blocking).
    ///
    /// Returns [`FrameError::EndOfStream`] when the stream ends between
    /// frames and [`FrameError::Truncated`] when it ends inside one. In the
    /// latter case the stream is left just after the incomplete frame's magic.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut matched = 0usize;
        loop {
            let byte = self.next_byte()?;
            if byte != MAGIC[matched] {
                // The mismatching byte may itself start the next magic.
                matched = usize::from(byte == MAGIC[0]);
                continue;
            }

            matched += 1;
            if matched < MAGIC.len() {
                continue;
            }
            matched = 0;

            tracing::debug!("found start of frame");
            self.inner.mark(MARK_LIMIT)?;
            match self.read_candidate() {
                Ok(Some(frame)) => {
                    tracing::debug!(type_id = frame.type_id, "decoded frame");
                    return Ok(frame);
                }
                Ok(None) => self.inner.reset()?,
                Err(err) => {
                    if let Err(reset_err) = self.inner.reset() {
                        tracing::warn!(error = %reset_err, "rewind after failed read also failed");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Iterate over frames until the stream ends cleanly between frames.
    ///
    /// Any other error is yielded once and ends the iteration.
    pub fn frames(&mut self) -> Frames<'_, T> {
        Frames {
            reader: self,
            done: false,
        }
    }

    /// Returns `Ok(None)` for a corrupt candidate; the caller rewinds.
    fn read_candidate(&mut self) -> Result<Option<Frame>> {
        let mut region = [0u8; CRC_REGION_LEN];
        self.read_exact(&mut region)?;

        let (flags_bytes, rest) = region.split_at(FLAGS_LEN);
        let (type_id_bytes, rest) = rest.split_at(TYPE_ID_LEN);
        let (sub_id_bytes, rest) = rest.split_at(SUB_ID_LEN);
        let (timestamp_bytes, length_bytes) = rest.split_at(TIMESTAMP_LEN);

        let flags = Flags::from(bigendian::bytes_to_u16(flags_bytes)?);
        let type_id = bigendian::bytes_to_i32(type_id_bytes)?;
        let timestamp = bigendian::bytes_to_i64(timestamp_bytes)?;
        let payload_len = usize::from(bigendian::bytes_to_u16(length_bytes)?);
        tracing::trace!(
            flags = %format_args!("{:016b}", flags.wire_bits()),
            type_id,
            timestamp,
            payload_len,
            "read header fields"
        );

        let mut crc = [0u8; CRC_LEN];
        self.read_exact(&mut crc)?;
        let header_crc = bigendian::bytes_to_u32(&crc)?;
        let computed = checksum(&region);
        tracing::debug!(read = header_crc, computed, "header CRC");
        if header_crc != computed {
            tracing::error!("corrupt frame (header CRC mismatch)");
            return Ok(None);
        }

        if payload_len > MAX_PAYLOAD {
            tracing::error!(payload_len, max = MAX_PAYLOAD, "corrupt frame (length out of range)");
            return Ok(None);
        }

        self.read_exact(&mut crc)?;
        let body_crc = bigendian::bytes_to_u32(&crc)?;
        let mut payload = vec![0u8; payload_len];
        self.read_exact(&mut payload)?;

        let computed = checksum(&payload);
        tracing::debug!(read = body_crc, computed, "body CRC");
        if body_crc != computed {
            if flags.ignores_body_crc() {
                tracing::warn!("body CRC mismatch, accepting anyway (ignore-body-crc flag)");
            } else {
                tracing::error!("corrupt frame (body CRC mismatch)");
                return Ok(None);
            }
        }

        // Return to the mark and skip the whole frame in one go.
        self.inner.reset()?;
        self.inner.skip(HEADER_SIZE - MAGIC.len() + payload_len)?;

        Ok(Some(Frame {
            flags,
            type_id,
            sub_id: decode_sub_id(sub_id_bytes),
            timestamp,
            payload: payload.into(),
        }))
    }

    fn next_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(FrameError::EndOfStream),
                Ok(_) => return Ok(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => FrameError::Truncated,
            _ => FrameError::Io(err),
        })
    }
}

impl<T> FrameReader<T> {
    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<R: Read> FrameReader<MarkReader<R>> {
    /// Create a frame reader over any `Read` stream, buffering it for rewinds.
    pub fn buffered(inner: R) -> Self {
        Self {
            inner: MarkReader::with_capacity(inner, MARK_LIMIT.max(DEFAULT_MARK_CAPACITY)),
        }
    }
}

/// Iterator returned by [`FrameReader::frames`].
pub struct Frames<'a, T> {
    reader: &'a mut FrameReader<T>,
    done: bool,
}

impl<T: Markable> Iterator for Frames<'_, T> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::EndOfStream) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use packeteer_transport::SeekMark;

    use super::*;
    use crate::codec::encode_frame;
    use crate::flags::FLAG_IGNORE_BODY_CRC;

    fn wire(type_id: i32, payload: &[u8]) -> Vec<u8> {
        wire_with(Flags::new(), type_id, None, payload)
    }

    fn wire_with(flags: Flags, type_id: i32, sub_id: Option<&str>, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(flags, type_id, sub_id, 1_234, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn reader(bytes: Vec<u8>) -> FrameReader<SeekMark<Cursor<Vec<u8>>>> {
        FrameReader::new(SeekMark::new(Cursor::new(bytes))).unwrap()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = reader(wire(1, b"hello"));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.type_id, 1);
        assert_eq!(frame.payload.as_ref(), b"hello");
        assert_eq!(frame.timestamp, 1_234);
        assert_eq!(frame.sub_id, None);
        assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
    }

    #[test]
    fn read_multiple_frames() {
        let mut bytes = wire(1, b"one");
        bytes.extend(wire_with(Flags::from_raw(1), 2, Some("two"), b"two"));
        bytes.extend(wire(3, b"three"));

        let mut reader = reader(bytes);
        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!((f1.type_id, f1.payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((f2.type_id, f2.payload.as_ref()), (2, b"two".as_ref()));
        assert_eq!(f2.sub_id.as_deref(), Some("two"));
        assert!(f2.flags.is_unreliable());
        assert_eq!((f3.type_id, f3.payload.as_ref()), (3, b"three".as_ref()));
    }

    #[test]
    fn stream_is_left_right_after_the_payload() {
        let mut bytes = wire(9, b"abc");
        let frame_len = bytes.len();
        bytes.extend_from_slice(b"tail");

        let mut reader = reader(bytes);
        reader.read_frame().unwrap();
        assert_eq!(reader.get_mut().position().unwrap(), frame_len as u64);
    }

    #[test]
    fn skips_leading_garbage() {
        let mut bytes = vec![0xFF, 0x00, 0x53, 0x00, 0x13, 0x37];
        bytes.extend(wire(5, b"after garbage"));

        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 5);
        assert_eq!(frame.payload.as_ref(), b"after garbage");
    }

    #[test]
    fn reanchors_on_repeated_first_magic_byte() {
        // "\0\0SMT": the second NUL breaks the partial match and restarts it.
        let mut bytes = vec![0x00];
        bytes.extend(wire(6, b"x"));
        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 6);

        // "\0S\0SMT": divergence at the third byte, which is a NUL.
        let mut bytes = vec![0x00, b'S'];
        bytes.extend(wire(7, b"y"));
        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 7);
    }

    #[test]
    fn partial_magic_alone_is_not_a_frame() {
        let mut reader = reader(vec![0x00, b'S', b'M', b'X', 0x00, b'S', b'M']);
        assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
    }

    #[test]
    fn corrupt_header_is_skipped() {
        let mut bad = wire(1, b"bad");
        bad[20] ^= 0x01;
        let mut bytes = bad;
        bytes.extend(wire(2, b"good"));

        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 2);
        assert_eq!(frame.payload.as_ref(), b"good");
    }

    #[test]
    fn corrupt_length_field_is_not_trusted() {
        // Claiming a huge payload would swallow the next frame if the
        // length were believed before the header CRC was checked.
        let mut bad = wire(1, b"bad");
        bad[273] = 0x7F;
        let mut bytes = bad;
        bytes.extend(wire(2, b"good"));

        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 2);
    }

    #[test]
    fn frame_nested_in_corrupt_frame_is_found() {
        // A valid frame carried as the payload of a frame whose body CRC is wrong.
        let inner = wire(77, b"inner");
        let mut outer = wire(1, &inner);
        outer[HEADER_SIZE - 1] ^= 0xFF;

        let frame = reader(outer).read_frame().unwrap();
        assert_eq!(frame.type_id, 77);
    }

    #[test]
    fn corrupt_body_is_skipped_without_flag() {
        let mut bad = wire(1, b"payload");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        let mut bytes = bad;
        bytes.extend(wire(2, b"next"));

        let frame = reader(bytes).read_frame().unwrap();
        assert_eq!(frame.type_id, 2);
    }

    #[test]
    fn corrupt_body_accepted_with_ignore_flag() {
        let flags = Flags::new().with(FLAG_IGNORE_BODY_CRC, true);
        let mut bad = wire_with(flags, 1, None, b"payload");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;

        let frame = reader(bad).read_frame().unwrap();
        assert_eq!(frame.type_id, 1);
        assert_eq!(frame.payload.as_ref(), b"payloae");
        assert!(frame.flags.ignores_body_crc());
    }

    #[test]
    fn end_of_stream_while_searching() {
        let mut reader = reader(Vec::new());
        assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
    }

    #[test]
    fn truncated_frame_is_a_stream_error() {
        let bytes = wire(1, b"complete payload");
        let cut = bytes[..bytes.len() - 4].to_vec();

        let mut reader = reader(cut);
        assert!(matches!(reader.read_frame(), Err(FrameError::Truncated)));
        // Rewound to just after the magic.
        assert_eq!(reader.get_mut().position().unwrap(), MAGIC.len() as u64);
    }

    #[test]
    fn truncated_header_is_a_stream_error() {
        let bytes = wire(1, b"x");
        let mut reader = reader(bytes[..100].to_vec());
        assert!(matches!(reader.read_frame(), Err(FrameError::Truncated)));
    }

    #[test]
    fn rejects_stream_that_cannot_rewind_far_enough() {
        let small = MarkReader::with_capacity(Cursor::new(Vec::<u8>::new()), 1024);
        let err = FrameReader::new(small).err().unwrap();
        assert!(matches!(
            err,
            FrameError::MarkUnsupported {
                capacity: 1024,
                required: MARK_LIMIT
            }
        ));
    }

    #[test]
    fn partial_read_handling() {
        let mut bytes = vec![0xAA; 10];
        bytes.extend(wire(4, b"slow"));
        let byte_reader = ByteByByteReader { bytes, pos: 0 };

        let mut reader = FrameReader::buffered(byte_reader);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.type_id, 4);
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn max_payload_frame_through_buffered_reader() {
        let payload = vec![0x5A; MAX_PAYLOAD];
        let mut bytes = vec![0x00, b'S'];
        bytes.extend(wire(8, &payload));
        bytes.extend(wire(9, b"after"));

        let mut reader = FrameReader::buffered(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.len(), MAX_PAYLOAD);
        assert_eq!(reader.read_frame().unwrap().type_id, 9);
    }

    #[test]
    fn frames_iterator_stops_at_end_of_stream() {
        let mut bytes = wire(1, b"a");
        bytes.extend_from_slice(b"noise");
        bytes.extend(wire(2, b"b"));

        let mut reader = reader(bytes);
        let ids: Vec<i32> = reader.frames().map(|f| f.unwrap().type_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn frames_iterator_yields_truncation_once() {
        let mut bytes = wire(1, b"a");
        let partial = wire(2, b"bbbb");
        bytes.extend_from_slice(&partial[..50]);

        let mut reader = reader(bytes);
        let mut frames = reader.frames();
        assert!(frames.next().unwrap().is_ok());
        assert!(matches!(frames.next(), Some(Err(FrameError::Truncated))));
        assert!(frames.next().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(8, b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::buffered(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.type_id, 8);
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(7, b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::buffered(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = reader(Vec::new());
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::buffered(right);

        writer.send(1, Some("ping"), b"ping").unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.type_id, 1);
        assert_eq!(frame.sub_id.as_deref(), Some("ping"));
        assert_eq!(frame.payload.as_ref(), b"ping");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
