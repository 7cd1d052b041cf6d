//! Typed messages carried inside frames.
//!
//! A message type supplies its numeric id, an optional sub-id and the logic
//! to write and read its own body. The framing layer only ever sees the id,
//! the sub-id and the serialized payload.
//!
//! Decoding a frame back into a message goes through a [`MessageRegistry`]:
//! an explicit table from type id to decode function, filled at startup.

use std::collections::HashMap;

use bytes::Bytes;

use crate::body::{BodyError, BodyReader, BodyWriter};
use crate::codec::Frame;

/// Errors raised while converting between messages and payloads.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Body encoding failed.
    #[error("failed to serialize {message} (type {type_id}): {source}")]
    Serialize {
        message: &'static str,
        type_id: i32,
        source: BodyError,
    },

    /// Body decoding failed.
    #[error("failed to deserialize {message} (type {type_id}): {source}")]
    Deserialize {
        message: &'static str,
        type_id: i32,
        source: BodyError,
    },

    /// No decoder is registered for this type id.
    #[error("no message registered for type {0}")]
    UnknownType(i32),
}

pub type Result<T> = std::result::Result<T, MessageError>;

/// A message with its own body encoding.
pub trait Message: Sized {
    /// Numeric type id written to the frame header.
    const ID: i32;

    /// Optional string qualifier, at most 255 UTF-8 bytes.
    fn sub_id(&self) -> Option<&str> {
        None
    }

    fn write_body(&self, out: &mut BodyWriter) -> std::result::Result<(), BodyError>;

    /// Rebuild a message from its body. `sub_id` is whatever the frame carried.
    fn read_body(
        sub_id: Option<&str>,
        input: &mut BodyReader,
    ) -> std::result::Result<Self, BodyError>;

    /// Encode the body into a payload.
    fn serialize(&self) -> Result<Bytes> {
        let mut out = BodyWriter::new();
        self.write_body(&mut out)
            .map_err(|source| MessageError::Serialize {
                message: std::any::type_name::<Self>(),
                type_id: Self::ID,
                source,
            })?;
        Ok(out.into_bytes())
    }

    /// Decode a payload produced by [`serialize`](Message::serialize).
    fn deserialize(sub_id: Option<&str>, payload: impl Into<Bytes>) -> Result<Self> {
        let mut input = BodyReader::new(payload);
        Self::read_body(sub_id, &mut input).map_err(|source| MessageError::Deserialize {
            message: std::any::type_name::<Self>(),
            type_id: Self::ID,
            source,
        })
    }
}

type DecodeFn<M> = fn(Option<&str>, Bytes) -> Result<M>;

fn decode_into<T, M>(sub_id: Option<&str>, payload: Bytes) -> Result<M>
where
    T: Message + Into<M>,
{
    T::deserialize(sub_id, payload).map(Into::into)
}

/// Maps frame type ids to message decoders producing a common type `M`.
///
/// `M` is typically an enum with one variant per message type:
///
/// ```
/// # use packeteer_frame::{Message, MessageRegistry, BodyReader, BodyWriter, BodyError};
/// struct Ping(i64);
///
/// impl Message for Ping {
///     const ID: i32 = 1;
///     fn write_body(&self, out: &mut BodyWriter) -> Result<(), BodyError> {
///         out.write_i64(self.0);
///         Ok(())
///     }
///     fn read_body(_: Option<&str>, input: &mut BodyReader) -> Result<Self, BodyError> {
///         Ok(Ping(input.read_i64()?))
///     }
/// }
///
/// enum Inbound {
///     Ping(Ping),
/// }
///
/// impl From<Ping> for Inbound {
///     fn from(p: Ping) -> Self {
///         Inbound::Ping(p)
///     }
/// }
///
/// let mut registry = MessageRegistry::<Inbound>::new();
/// registry.register::<Ping>();
/// assert!(registry.contains(1));
/// ```
pub struct MessageRegistry<M> {
    decoders: HashMap<i32, DecodeFn<M>>,
}

impl<M> MessageRegistry<M> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `T` under `T::ID`, replacing any earlier registration.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Message + Into<M>,
    {
        if self
            .decoders
            .insert(T::ID, decode_into::<T, M> as DecodeFn<M>)
            .is_some()
        {
            tracing::warn!(type_id = T::ID, "message decoder replaced");
        }
        self
    }

    pub fn contains(&self, type_id: i32) -> bool {
        self.decoders.contains_key(&type_id)
    }

    /// Decode a raw payload for `type_id`.
    pub fn decode(&self, type_id: i32, sub_id: Option<&str>, payload: Bytes) -> Result<M> {
        let decode = self
            .decoders
            .get(&type_id)
            .ok_or(MessageError::UnknownType(type_id))?;
        decode(sub_id, payload)
    }

    /// Decode the payload of a scanned frame.
    pub fn dispatch(&self, frame: &Frame) -> Result<M> {
        self.decode(frame.type_id, frame.sub_id.as_deref(), frame.payload.clone())
    }
}

impl<M> Default for MessageRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for MessageRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.decoders.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("MessageRegistry").field("type_ids", &ids).finish()
    }
}
