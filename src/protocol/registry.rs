//! # Packet Registry
//!
//! Maps wire ids to type-erased decode and encode entry points.
//!
//! A [`PacketRegistry`] is the mutable build-time view: protocols register
//! their packet types during startup, ids can be replaced or removed, and
//! nothing here is shared. Calling [`prepare`](PacketRegistry::prepare)
//! freezes the table into a [`PreparedRegistry`], an immutable snapshot
//! behind an `Arc` that connections clone and read without locking.
//!
//! Later mutations of the builder never leak into snapshots already handed
//! out; a connection keeps the protocol shape it was opened with.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use crate::core::cursor::ByteCursor;
use crate::core::packet::{AnyPacket, Packet};
use crate::error::{ProtocolError, Result};

type DecodeFn = Arc<dyn Fn(&mut ByteCursor<'_>) -> Result<AnyPacket> + Send + Sync>;
type EncodeFn = Arc<dyn Fn(&AnyPacket, &mut BytesMut) -> Result<usize> + Send + Sync>;
type BodyLenFn = Arc<dyn Fn(&AnyPacket) -> Result<usize> + Send + Sync>;

/// Erased per-id entry: everything the stream needs to move one packet
/// type across the wire without knowing it statically.
#[derive(Clone)]
pub struct PacketVTable {
    id: i32,
    name: &'static str,
    decode: DecodeFn,
    encode: EncodeFn,
    body_len: BodyLenFn,
}

impl PacketVTable {
    fn of<T: Packet>() -> Self {
        Self {
            id: T::ID,
            name: std::any::type_name::<T>(),
            decode: Arc::new(|cursor| Ok(AnyPacket::typed(T::decode(cursor)?))),
            encode: Arc::new(|packet, buf| {
                let typed = packet
                    .downcast_ref::<T>()
                    .ok_or(ProtocolError::PacketTypeMismatch { id: T::ID })?;
                typed.encode(buf)
            }),
            body_len: Arc::new(|packet| {
                let typed = packet
                    .downcast_ref::<T>()
                    .ok_or(ProtocolError::PacketTypeMismatch { id: T::ID })?;
                Ok(typed.encoded_len())
            }),
        }
    }

    /// Wire id this entry serves.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Type name of the registered packet.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Decodes a complete frame body into a typed carrier.
    pub fn decode_body(&self, cursor: &mut ByteCursor<'_>) -> Result<AnyPacket> {
        (self.decode)(cursor)
    }

    /// Encodes the carried packet's payload into `buf`.
    ///
    /// Fails with [`ProtocolError::PacketTypeMismatch`] if the carrier does
    /// not actually hold this entry's type.
    pub fn encode_body(&self, packet: &AnyPacket, buf: &mut BytesMut) -> Result<usize> {
        (self.encode)(packet, buf)
    }

    /// Exact payload size the carried packet will encode to.
    pub fn payload_len(&self, packet: &AnyPacket) -> Result<usize> {
        (self.body_len)(packet)
    }
}

impl fmt::Debug for PacketVTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketVTable")
            .field("id", &format_args!("{:#04x}", self.id))
            .field("name", &self.name)
            .finish()
    }
}

/// Mutable id-to-type table, populated before any traffic flows.
#[derive(Debug, Default)]
pub struct PacketRegistry {
    entries: HashMap<i32, PacketVTable>,
}

impl PacketRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under [`Packet::ID`], replacing any previous entry
    /// for that id.
    pub fn register<T: Packet>(&mut self) -> &mut Self {
        let entry = PacketVTable::of::<T>();
        if let Some(old) = self.entries.insert(T::ID, entry) {
            debug!(
                id = T::ID,
                old = old.name(),
                new = std::any::type_name::<T>(),
                "packet id re-registered"
            );
        }
        self
    }

    /// Removes the entry for `id`, returning whether one existed.
    pub fn unregister(&mut self, id: i32) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Whether `id` currently has an entry.
    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no ids are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freezes the current table into an immutable shareable snapshot.
    pub fn prepare(&self) -> PreparedRegistry {
        debug!(packets = self.entries.len(), "registry snapshot prepared");
        PreparedRegistry {
            entries: Arc::new(self.entries.clone()),
        }
    }
}

/// Immutable registry snapshot shared across connections.
///
/// Cloning is an `Arc` bump; lookups never lock.
#[derive(Debug, Clone)]
pub struct PreparedRegistry {
    entries: Arc<HashMap<i32, PacketVTable>>,
}

impl PreparedRegistry {
    /// Looks up the entry for `id`.
    pub fn get(&self, id: i32) -> Option<&PacketVTable> {
        self.entries.get(&id)
    }

    /// Whether `id` was registered when this snapshot was taken.
    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of ids in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
