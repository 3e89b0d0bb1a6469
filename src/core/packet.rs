//! # Packet Model
//!
//! The typed packet contract and the type-erased carrier that moves decoded
//! packets between the codec, the registry, and dispatch.
//!
//! ## Layers
//! - [`Packet`]: implemented by each concrete message type; binds a numeric
//!   wire id to payload encode/decode logic.
//! - [`AnyPacket`]: what a read produces when the caller did not name a
//!   type up front. Holds either a boxed decoded value or the raw bytes of
//!   an id nobody registered.
//! - [`UnknownPacket`]: verbatim id + payload, re-encodable untouched, so a
//!   relay can pass through traffic it does not understand.

use std::any::Any;
use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::core::cursor::ByteCursor;
use crate::core::varint::VarInt;
use crate::error::{ProtocolError, Result};

/// A concrete protocol message with a fixed wire id.
///
/// `encode` writes only the payload; the frame writer prepends the length
/// and id varints. `encoded_len` must predict the payload size exactly,
/// since the writer reserves and length-prefixes from it before encoding.
pub trait Packet: Sized + Send + Sync + 'static {
    /// Wire id this type decodes from and encodes to.
    const ID: i32;

    /// Decodes the payload from a complete frame body.
    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self>;

    /// Writes the payload into `buf`, returning the bytes written.
    fn encode(&self, buf: &mut BytesMut) -> Result<usize>;

    /// Exact payload size `encode` will produce for this value.
    fn encoded_len(&self) -> usize;
}

/// Raw frame body for a wire id with no registered decoder.
///
/// Carries the id and payload exactly as received. Writing one back emits
/// the same bytes, which keeps proxy-style consumers lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPacket {
    /// Wire id as it appeared on the stream.
    pub id: VarInt,
    /// Payload bytes, untouched.
    pub payload: Bytes,
}

impl UnknownPacket {
    /// Frame body size when re-encoded verbatim: id bytes plus payload.
    pub fn body_len(&self) -> usize {
        self.id.encoded_len() + self.payload.len()
    }

    /// Captures a complete frame body, id varint included, from `cursor`.
    pub fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let id = VarInt::decode(cursor)?;
        let payload = Bytes::copy_from_slice(cursor.read_remaining());
        Ok(Self { id, payload })
    }

    /// Writes the body back out byte-for-byte, returning its length.
    pub fn write_to(&self, buf: &mut BytesMut) -> usize {
        let id_len = self.id.encode(buf);
        buf.extend_from_slice(&self.payload);
        id_len + self.payload.len()
    }
}

enum PacketBody {
    Typed(Box<dyn Any + Send + Sync>),
    Unknown(UnknownPacket),
}

/// Type-erased decoded packet.
///
/// Produced by untyped reads. Consumers either route on [`id`](Self::id)
/// and [`downcast`](Self::downcast) to the concrete type, or fall through
/// to [`as_unknown`](Self::as_unknown) for ids outside their protocol.
pub struct AnyPacket {
    id: i32,
    name: &'static str,
    body: PacketBody,
}

impl AnyPacket {
    /// Wraps a decoded typed packet.
    pub fn typed<T: Packet>(value: T) -> Self {
        Self {
            id: T::ID,
            name: std::any::type_name::<T>(),
            body: PacketBody::Typed(Box::new(value)),
        }
    }

    /// Wraps a frame body that failed registry lookup.
    pub fn unknown(packet: UnknownPacket) -> Self {
        Self {
            id: packet.id.value(),
            name: "unknown",
            body: PacketBody::Unknown(packet),
        }
    }

    /// Wire id of the carried packet.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Type name of the carried packet, or `"unknown"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the carried value is a `T`.
    pub fn is<T: Packet>(&self) -> bool {
        matches!(&self.body, PacketBody::Typed(boxed) if boxed.is::<T>())
    }

    /// Whether the id missed the registry at decode time.
    pub fn is_unknown(&self) -> bool {
        matches!(self.body, PacketBody::Unknown(_))
    }

    /// Consumes the carrier, yielding the typed packet.
    ///
    /// Fails with [`ProtocolError::PacketTypeMismatch`] when the carried
    /// value is some other type or an unknown body.
    pub fn downcast<T: Packet>(self) -> Result<T> {
        match self.body {
            PacketBody::Typed(boxed) => boxed
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| ProtocolError::PacketTypeMismatch { id: self.id }),
            PacketBody::Unknown(_) => Err(ProtocolError::PacketTypeMismatch { id: self.id }),
        }
    }

    /// Borrows the typed packet without consuming the carrier.
    pub fn downcast_ref<T: Packet>(&self) -> Option<&T> {
        match &self.body {
            PacketBody::Typed(boxed) => boxed.downcast_ref::<T>(),
            PacketBody::Unknown(_) => None,
        }
    }

    /// Borrows the raw body when the id missed the registry.
    pub fn as_unknown(&self) -> Option<&UnknownPacket> {
        match &self.body {
            PacketBody::Unknown(packet) => Some(packet),
            PacketBody::Typed(_) => None,
        }
    }

    /// Consumes the carrier, yielding the raw body when unknown.
    pub fn into_unknown(self) -> Option<UnknownPacket> {
        match self.body {
            PacketBody::Unknown(packet) => Some(packet),
            PacketBody::Typed(_) => None,
        }
    }
}

impl fmt::Debug for AnyPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyPacket")
            .field("id", &format_args!("{:#04x}", self.id))
            .field("name", &self.name)
            .field("unknown", &self.is_unknown())
            .finish()
    }
}
