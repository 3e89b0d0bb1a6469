//! # Error Types
//!
//! Error handling for the wire protocol engine.
//!
//! This module defines all error variants that can occur while framing,
//! decoding, registering, or dispatching packets, from low-level I/O errors
//! to protocol violations that must terminate a connection.
//!
//! ## Error Categories
//! - **I/O Errors**: transport read/write failures
//! - **Framing Errors**: malformed varints, invalid or oversized frame lengths
//! - **Protocol Errors**: unexpected packet ids on typed reads
//! - **Registration Errors**: duplicate handler instances, unregistered ids
//! - **Configuration Errors**: invalid engine configuration
//!
//! Two conditions are deliberately *not* errors anywhere in this crate:
//! incomplete data (an expected, frequent state of a socket buffer, signaled
//! as `Ok(None)` by the non-blocking decoders) and cancellation (signaled as
//! [`Outcome::Canceled`](crate::protocol::stream::Outcome)). Only genuine
//! violations surface as `ProtocolError`.

use std::io;
use thiserror::Error;

/// Error message constants shared by the framing layer.
///
/// Static strings keep the hot decode path free of per-error allocations.
pub mod constants {
    /// Varint terminated by end of input before its final byte.
    pub const ERR_VARINT_TRUNCATED: &str = "truncated before terminal byte";
    /// Varint exceeded the 5-byte limit for 32-bit values.
    pub const ERR_VARINT_TOO_LONG: &str = "exceeds 5-byte maximum for VarInt";
    /// Varint exceeded the 10-byte limit for 64-bit values.
    pub const ERR_VARLONG_TOO_LONG: &str = "exceeds 10-byte maximum for VarLong";
    /// Cursor rewind past the start of the unconsumed window.
    pub const ERR_REWIND_UNDERFLOW: &str = "rewind past start of buffer window";
}

/// Primary error type for all protocol engine operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A varint field could not be decoded: either the input ended before a
    /// byte without the continuation bit, or the encoding ran past the
    /// canonical maximum length. Continuing to parse the stream after this
    /// is unsafe; the connection should be closed.
    #[error("malformed varint: {0}")]
    MalformedVarInt(&'static str),

    /// The declared frame length implies a negative payload or is otherwise
    /// impossible (smaller than the packet id it must contain).
    #[error("invalid frame length: {length}")]
    InvalidFrameLength { length: i32 },

    /// The declared frame length exceeds the configured maximum.
    #[error("frame too large: {length} bytes (max {max})")]
    OversizedFrame { length: usize, max: usize },

    /// A typed read decoded a frame whose id does not match the requested
    /// packet type. Fatal for the connection: the peer is in the wrong
    /// protocol state.
    #[error("unexpected packet id: expected {expected:#04x}, got {got:#04x}")]
    UnexpectedPacketId { expected: i32, got: i32 },

    /// A packet payload failed its field-level decode (bad UTF-8, field out
    /// of range, truncated body). Aborts the current connection's frame
    /// loop, never the process.
    #[error("malformed packet payload: {0}")]
    MalformedPacket(String),

    /// A packet's `encode` wrote a different number of bytes than its
    /// `encoded_len` promised. The frame would be corrupt on the wire.
    #[error("encoded size mismatch: expected {expected} bytes, wrote {actual}")]
    EncodedSizeMismatch { expected: usize, actual: usize },

    /// A type-erased write was attempted for an id with no registry entry.
    #[error("no registered packet type for id {id:#04x}")]
    UnregisteredPacket { id: i32 },

    /// A type-erased packet value did not downcast to the type registered
    /// under its id (stale value written through a re-registered snapshot).
    #[error("packet value does not match type registered for id {id:#04x}")]
    PacketTypeMismatch { id: i32 },

    /// The same handler instance was registered twice on one pipeline.
    #[error("handler instance already registered for this event type")]
    DuplicateHandler,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Broken internal invariant, such as a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
