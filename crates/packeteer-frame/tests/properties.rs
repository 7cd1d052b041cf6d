//! Property-based tests for frame encoding and stream resynchronization.

use bytes::{Bytes, BytesMut};
use packeteer_frame::{Flags, Frame, FrameReader, HEADER_SIZE, MAX_PAYLOAD};
use proptest::prelude::*;

// Sub-ids are 1..=252 bytes of non-NUL text, inside the 255-byte slot.
fn sub_id_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[^\\x00]{1,63}")
}

fn frame_strategy(max_payload: usize) -> impl Strategy<Value = Frame> {
    (
        any::<u16>(),
        any::<i32>(),
        sub_id_strategy(),
        any::<i64>(),
        proptest::collection::vec(any::<u8>(), 0..=max_payload),
    )
        .prop_map(|(flags, type_id, sub_id, timestamp, payload)| Frame {
            flags: Flags::from(flags),
            type_id,
            sub_id,
            timestamp,
            payload: Bytes::from(payload),
        })
}

fn wire(frame: &Frame) -> Vec<u8> {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf).expect("should encode");
    buf.to_vec()
}

proptest! {
    #[test]
    fn frame_round_trip(frame in frame_strategy(MAX_PAYLOAD)) {
        let bytes = wire(&frame);
        prop_assert_eq!(bytes.len(), HEADER_SIZE + frame.payload.len());

        let mut reader = FrameReader::buffered(&bytes[..]);
        let parsed = reader.read_frame().expect("should decode");
        prop_assert_eq!(parsed, frame);
    }

    #[test]
    fn scanner_skips_garbage_and_corrupt_header(
        garbage in proptest::collection::vec(any::<u8>(), 0..512),
        valid in frame_strategy(256),
        corrupt in frame_strategy(256),
        index in 4..HEADER_SIZE - 4,
        mask in 1u8..,
    ) {
        let good = wire(&valid);
        let mut broken = wire(&corrupt);
        broken[index] ^= mask;

        let mut stream = garbage;
        stream.extend_from_slice(&good);
        stream.extend_from_slice(&broken);
        stream.extend_from_slice(&good);

        let mut reader = FrameReader::buffered(&stream[..]);
        let first = reader.read_frame().expect("first valid frame should decode");
        prop_assert_eq!(&first, &valid);
        let second = reader.read_frame().expect("corrupt frame should be skipped");
        prop_assert_eq!(&second, &valid);
    }
}
