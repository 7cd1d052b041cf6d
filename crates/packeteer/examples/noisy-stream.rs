//! Write frames into a buffer, damage it, and watch the reader recover.
//!
//! ```sh
//! cargo run -p packeteer --example noisy-stream
//! ```

use packeteer::frame::{FrameError, FrameReader, FrameWriter, Result};

fn main() -> Result<()> {
    let mut writer = FrameWriter::new(Vec::new());
    for (i, text) in ["alpha", "bravo", "charlie", "delta"].iter().enumerate() {
        writer.get_mut().extend_from_slice(b"\x00S line noise ");
        writer.send(i as i32, Some("demo"), text.as_bytes())?;
    }
    let mut stream = writer.into_inner();

    // Flip a bit inside the second frame's header.
    let second = find_nth_magic(&stream, 1).unwrap_or(0);
    stream[second + 30] ^= 0x04;

    let mut reader = FrameReader::buffered(&stream[..]);
    loop {
        match reader.read_frame() {
            Ok(frame) => println!("{frame}"),
            Err(FrameError::EndOfStream) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn find_nth_magic(bytes: &[u8], n: usize) -> Option<usize> {
    bytes
        .windows(packeteer::frame::MAGIC.len())
        .enumerate()
        .filter(|(_, window)| *window == packeteer::frame::MAGIC)
        .map(|(offset, _)| offset)
        .nth(n)
}
