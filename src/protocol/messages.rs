//! # Built-in Messages
//!
//! The handshake, status, and session upkeep packets every deployment
//! speaks, plus [`builtin_registry`] to install them in one call.
//!
//! Integer fields marked as varints below use the variable-length wire
//! encoding; the Rust structs hold plain integers.

use bytes::{BufMut, BytesMut};

use crate::core::cursor::ByteCursor;
use crate::core::packet::Packet;
use crate::core::varint::VarInt;
use crate::core::wire::{var_string_len, WireWrite};
use crate::error::Result;
use crate::protocol::registry::PacketRegistry;

/// Longest accepted hostname in a [`Handshake`].
pub const MAX_ADDRESS_LEN: usize = 255;

/// Longest accepted player name in a [`LoginStart`].
pub const MAX_USERNAME_LEN: usize = 16;

/// Ceiling for free-form strings (status payloads, disconnect reasons).
pub const MAX_STRING_LEN: usize = 32 * 1024;

/// Opening packet of every connection. Id `0x00`.
///
/// Wire: varint protocol version, address string, big-endian port,
/// varint next state (1 = status, 2 = login).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

impl Packet for Handshake {
    const ID: i32 = 0x00;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            protocol_version: VarInt::decode(cursor)?.value(),
            server_address: cursor.read_var_string(MAX_ADDRESS_LEN)?,
            server_port: cursor.read_u16()?,
            next_state: VarInt::decode(cursor)?.value(),
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        let mut written = buf.put_var_int(self.protocol_version);
        written += buf.put_var_string(&self.server_address);
        buf.put_u16(self.server_port);
        written += 2;
        written += buf.put_var_int(self.next_state);
        Ok(written)
    }

    fn encoded_len(&self) -> usize {
        VarInt(self.protocol_version).encoded_len()
            + var_string_len(&self.server_address)
            + 2
            + VarInt(self.next_state).encoded_len()
    }
}

/// Empty status query. Id `0x01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRequest;

impl Packet for StatusRequest {
    const ID: i32 = 0x01;

    fn decode(_cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self)
    }

    fn encode(&self, _buf: &mut BytesMut) -> Result<usize> {
        Ok(0)
    }

    fn encoded_len(&self) -> usize {
        0
    }
}

/// Status reply carrying an opaque server-description string, typically
/// JSON. Id `0x02`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub payload: String,
}

impl Packet for StatusResponse {
    const ID: i32 = 0x02;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            payload: cursor.read_var_string(MAX_STRING_LEN)?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        Ok(buf.put_var_string(&self.payload))
    }

    fn encoded_len(&self) -> usize {
        var_string_len(&self.payload)
    }
}

/// Latency probe with a caller-chosen nonce. Id `0x03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub nonce: i64,
}

impl Packet for Ping {
    const ID: i32 = 0x03;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            nonce: cursor.read_i64()?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        buf.put_slice(&self.nonce.to_be_bytes());
        Ok(8)
    }

    fn encoded_len(&self) -> usize {
        8
    }
}

/// Echo of a [`Ping`] nonce. Id `0x04`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub nonce: i64,
}

impl Packet for Pong {
    const ID: i32 = 0x04;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            nonce: cursor.read_i64()?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        buf.put_slice(&self.nonce.to_be_bytes());
        Ok(8)
    }

    fn encoded_len(&self) -> usize {
        8
    }
}

/// First login packet, naming the joining player. Id `0x05`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
}

impl Packet for LoginStart {
    const ID: i32 = 0x05;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            username: cursor.read_var_string(MAX_USERNAME_LEN)?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        Ok(buf.put_var_string(&self.username))
    }

    fn encoded_len(&self) -> usize {
        var_string_len(&self.username)
    }
}

/// Server-initiated close with a human-readable reason. Id `0x06`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: String,
}

impl Packet for Disconnect {
    const ID: i32 = 0x06;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            reason: cursor.read_var_string(MAX_STRING_LEN)?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        Ok(buf.put_var_string(&self.reason))
    }

    fn encoded_len(&self) -> usize {
        var_string_len(&self.reason)
    }
}

/// Periodic liveness check; the peer echoes the same id back. Id `0x07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Packet for KeepAlive {
    const ID: i32 = 0x07;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            id: cursor.read_i64()?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<usize> {
        buf.put_slice(&self.id.to_be_bytes());
        Ok(8)
    }

    fn encoded_len(&self) -> usize {
        8
    }
}

/// Registry pre-loaded with every packet in this module.
pub fn builtin_registry() -> PacketRegistry {
    let mut registry = PacketRegistry::new();
    registry
        .register::<Handshake>()
        .register::<StatusRequest>()
        .register::<StatusResponse>()
        .register::<Ping>()
        .register::<Pong>()
        .register::<LoginStart>()
        .register::<Disconnect>()
        .register::<KeepAlive>();
    registry
}
