use std::io::Cursor;

use bytes::BytesMut;
use packeteer_frame::{
    encode_frame, BodyError, BodyReader, BodyWriter, Flags, Frame, FrameError, FrameReader,
    FrameWriter, Message, FLAG_IGNORE_BODY_CRC, HEADER_SIZE, MAX_PAYLOAD,
};
use packeteer_transport::SeekMark;

fn encoded(flags: Flags, type_id: i32, sub_id: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(flags, type_id, sub_id, 1_700_000_000_000, payload, &mut buf).unwrap();
    buf.to_vec()
}

fn seekable(bytes: Vec<u8>) -> FrameReader<SeekMark<Cursor<Vec<u8>>>> {
    FrameReader::new(SeekMark::new(Cursor::new(bytes))).unwrap()
}

struct Counter(i32);

impl Message for Counter {
    const ID: i32 = 42;

    fn write_body(&self, out: &mut BodyWriter) -> Result<(), BodyError> {
        out.write_i32(self.0);
        Ok(())
    }

    fn read_body(_sub_id: Option<&str>, input: &mut BodyReader) -> Result<Self, BodyError> {
        Ok(Counter(input.read_i32()?))
    }
}

#[test]
fn writer_to_reader_roundtrip() {
    let mut writer = FrameWriter::new(Vec::new());
    writer.send_at(5, Some("alpha"), b"first", 11).unwrap();
    writer.send_at(6, None, b"", 12).unwrap();
    let bytes = writer.into_inner();

    let mut reader = FrameReader::buffered(&bytes[..]);
    let first = reader.read_frame().unwrap();
    assert_eq!(first.type_id, 5);
    assert_eq!(first.sub_id.as_deref(), Some("alpha"));
    assert_eq!(first.timestamp, 11);
    assert_eq!(first.payload.as_ref(), b"first");

    let second = reader.read_frame().unwrap();
    assert_eq!(second.type_id, 6);
    assert_eq!(second.sub_id, None);
    assert!(second.payload.is_empty());

    assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
}

#[test]
fn garbage_and_corrupt_frames_are_skipped() {
    let a = encoded(Flags::new(), 1, Some("a"), b"frame A");
    let mut b = encoded(Flags::new(), 2, Some("b"), b"frame B");
    b[40] ^= 0x01;

    let mut stream = b"\xFF\x00\x01line noise".to_vec();
    stream.extend_from_slice(&a);
    stream.extend_from_slice(b"\x00S\x00\x00more noise");
    stream.extend_from_slice(&b);
    stream.extend_from_slice(&a);

    let mut reader = FrameReader::buffered(&stream[..]);
    let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.type_id == 1));
    assert!(frames.iter().all(|f| f.payload.as_ref() == b"frame A"));
}

#[test]
fn ignore_body_crc_flag_accepts_damaged_payload() {
    let flags = Flags::new().with(FLAG_IGNORE_BODY_CRC, true);
    let mut lenient = encoded(flags, 3, None, b"media sample");
    let mut strict = encoded(Flags::new(), 4, None, b"media sample");
    let last = lenient.len() - 1;
    lenient[last] ^= 0x10;
    strict[last] ^= 0x10;

    let mut stream = strict;
    stream.extend_from_slice(&lenient);

    let mut reader = seekable(stream);
    let frame = reader.read_frame().unwrap();
    assert_eq!(frame.type_id, 3);
    assert!(frame.flags.ignores_body_crc());
    assert_ne!(frame.payload.as_ref(), b"media sample");
    assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
}

#[test]
fn payload_bounds() {
    let mut buf = BytesMut::new();
    let too_big = vec![0u8; MAX_PAYLOAD + 1];
    let err = encode_frame(Flags::new(), 1, None, 0, &too_big, &mut buf).unwrap_err();
    assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    assert!(buf.is_empty());

    let largest = encoded(Flags::new(), 1, None, &vec![0xAB; MAX_PAYLOAD]);
    assert_eq!(largest.len(), HEADER_SIZE + MAX_PAYLOAD);
    let frame = FrameReader::buffered(&largest[..]).read_frame().unwrap();
    assert_eq!(frame.payload.len(), MAX_PAYLOAD);
}

#[test]
fn magic_prefix_collisions() {
    let frame = encoded(Flags::new(), 8, None, b"x");
    let prefixes: [&[u8]; 5] = [b"\x00", b"\x00\x00", b"\x00S", b"\x00SM", b"\x00S\x00SM"];
    for prefix in prefixes {
        let mut stream = prefix.to_vec();
        stream.extend_from_slice(&frame);

        let decoded = seekable(stream).read_frame().unwrap();
        assert_eq!(decoded.type_id, 8, "prefix {prefix:?}");
    }
}

#[test]
fn corrupted_copy_then_clean_copy() {
    let payload = Counter(123_456).serialize().unwrap();
    assert_eq!(payload.as_ref(), &[0x00, 0x01, 0xE2, 0x40]);

    let mut writer = FrameWriter::new(Vec::new());
    writer.write_message(&Counter(123_456)).unwrap();
    let clean = writer.into_inner();
    let mut damaged = clean.clone();
    damaged[18] ^= 0xFF;

    let mut stream = damaged;
    stream.extend_from_slice(&clean);

    let mut reader = FrameReader::buffered(&stream[..]);
    let frame = reader.read_frame().unwrap();
    assert_eq!(frame.type_id, Counter::ID);
    let counter = Counter::deserialize(frame.sub_id.as_deref(), frame.payload).unwrap();
    assert_eq!(counter.0, 123_456);

    assert!(matches!(reader.read_frame(), Err(FrameError::EndOfStream)));
}

#[test]
fn truncated_tail_after_valid_frame() {
    let frame = encoded(Flags::new(), 1, None, b"whole");
    let mut stream = frame.clone();
    stream.extend_from_slice(&frame[..HEADER_SIZE - 2]);

    let mut reader = seekable(stream);
    assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"whole");
    assert!(matches!(reader.read_frame(), Err(FrameError::Truncated)));
}
