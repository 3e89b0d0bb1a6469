//! # Protocol Layer
//!
//! Everything between raw frames and application logic: the id-to-type
//! registry, the per-connection packet stream, and the built-in message
//! set.
//!
//! Typical wiring: build a [`PacketRegistry`] (starting from
//! [`messages::builtin_registry`] or empty), [`prepare`] it once, then hand
//! the snapshot to a [`PacketStream`] per accepted connection.
//!
//! [`prepare`]: PacketRegistry::prepare

pub mod messages;
pub mod registry;
pub mod stream;

pub use registry::{PacketRegistry, PacketVTable, PreparedRegistry};
pub use stream::{Outcome, PacketStream};
