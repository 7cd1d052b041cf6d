use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, now_millis, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::flags::Flags;
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a message under [`Message::ID`], stamped with the current time.
    pub fn write_message<M: Message>(&mut self, message: &M) -> Result<()> {
        let payload = message.serialize()?;
        self.send(M::ID, message.sub_id(), &payload)
    }

    /// Write a complete frame, keeping its own flags and timestamp.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.encode_and_write(
            frame.flags,
            frame.type_id,
            frame.sub_id.as_deref(),
            frame.timestamp,
            &frame.payload,
        )
    }

    /// Encode and send a raw payload, stamped with the current time.
    pub fn send(&mut self, type_id: i32, sub_id: Option<&str>, payload: &[u8]) -> Result<()> {
        self.send_at(type_id, sub_id, payload, now_millis())
    }

    /// Encode and send a raw payload with an explicit timestamp.
    pub fn send_at(
        &mut self,
        type_id: i32,
        sub_id: Option<&str>,
        payload: &[u8],
        timestamp: i64,
    ) -> Result<()> {
        // Flags are Copy: this is the snapshot the frame is written with.
        let flags = self.config.flags;
        self.encode_and_write(flags, type_id, sub_id, timestamp, payload)
    }

    fn encode_and_write(
        &mut self,
        flags: Flags,
        type_id: i32,
        sub_id: Option<&str>,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<()> {
        let max = self.config.max_payload();
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        self.buf.clear();
        encode_frame(flags, type_id, sub_id, timestamp, payload, &mut self.buf)?;
        tracing::trace!(type_id, len = self.buf.len(), "writing frame");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Flags stamped on frames sent with [`send`](Self::send).
    pub fn flags(&self) -> Flags {
        self.config.flags
    }

    /// Replace the flags used for subsequent sends.
    pub fn set_flags(&mut self, flags: Flags) {
        self.config.flags = flags;
    }

    /// Mutable access to the flags used for subsequent sends.
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.config.flags
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame encoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
