//! # gamewire
//!
//! Wire-protocol engine for game servers: varint-delimited framing, a
//! type-registry packet codec, and priority-ordered async event dispatch.
//!
//! ## Layers
//!
//! - [`core`]: varints, the speculative byte cursor, the packet contract,
//!   and a [`tokio_util::codec`]-compatible frame codec.
//! - [`protocol`]: the id registry with immutable prepared snapshots, the
//!   per-connection [`PacketStream`], and the built-in message set.
//! - [`dispatch`]: pre/post handler pipelines with compiled call
//!   strategies and a type-keyed [`EventBus`].
//! - [`config`], [`utils`]: TOML-backed settings, logging setup, and
//!   engine counters.
//!
//! ## Example
//!
//! ```no_run
//! use gamewire::config::EngineConfig;
//! use gamewire::protocol::messages::{self, Ping, Pong};
//! use gamewire::protocol::{Outcome, PacketStream};
//!
//! # async fn run() -> gamewire::Result<()> {
//! let registry = messages::builtin_registry().prepare();
//! let config = EngineConfig::default();
//!
//! let socket = tokio::net::TcpStream::connect("play.example.net:25565").await?;
//! let mut stream = PacketStream::new(socket, registry, config.codec);
//!
//! stream.write_packet(&Ping { nonce: 7 })?;
//! if stream.flush().await?.is_canceled() {
//!     return Ok(());
//! }
//! if let Outcome::Ready(pong) = stream.read_as::<Pong>().await? {
//!     assert_eq!(pong.nonce, 7);
//! }
//! stream.close().await
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod utils;

pub use config::EngineConfig;
pub use core::{AnyPacket, ByteCursor, Frame, FrameCodec, Packet, UnknownPacket, VarInt, VarLong};
pub use dispatch::{DispatchPriority, EventBus, EventDispatcher, HandlerId};
pub use error::{ProtocolError, Result};
pub use protocol::{Outcome, PacketRegistry, PacketStream, PreparedRegistry};
