//! # Core Wire Format
//!
//! Byte-level building blocks of the protocol: variable-length integers,
//! the speculative read cursor, write helpers, the packet contract, and
//! the length-delimited frame codec.
//!
//! Everything above this layer (registry, streams, dispatch) manipulates
//! [`Frame`]s and [`Packet`]s; nothing above it touches raw varints.
//!
//! ## Frame layout
//!
//! ```text
//! | length: VarInt | id: VarInt | payload: [u8] |
//! |                 `-- length counts these --' |
//! ```

pub mod codec;
pub mod cursor;
pub mod packet;
pub mod varint;
pub mod wire;

pub use codec::{Frame, FrameCodec, DEFAULT_MAX_FRAME_LEN};
pub use cursor::ByteCursor;
pub use packet::{AnyPacket, Packet, UnknownPacket};
pub use varint::{VarInt, VarLong};
pub use wire::{var_string_len, WireWrite};
