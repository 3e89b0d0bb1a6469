//! # Packet Stream
//!
//! Per-connection packet I/O over any async byte stream.
//!
//! A [`PacketStream`] owns the transport, a [`PreparedRegistry`] snapshot,
//! and both directions of buffering. Reads run a three-stage frame state
//! machine (length, id, payload) that makes progress only when enough bytes
//! are buffered, so a malicious or slow peer can never wedge a partially
//! parsed frame into a bad state. Writes stage complete frames in a local
//! buffer and hit the socket only on [`flush`](PacketStream::flush),
//! letting callers batch bursts into one syscall.
//!
//! ## Cancellation
//!
//! Every blocking operation races a [`CancellationToken`]. A fired token
//! resolves reads and flushes to [`Outcome::Canceled`] instead of an error:
//! tearing a connection down on purpose is a normal event, not a fault.
//! [`close`](PacketStream::close) cancels the token, drains what it can,
//! shuts the write half down, and is safe to call any number of times.
//!
//! ## Unknown packets
//!
//! Frames whose id misses the registry surface as [`UnknownPacket`] bodies
//! instead of errors, and can be written back out untouched. Relays and
//! version-skewed peers stay functional without registering the world.

use std::fmt;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::CodecConfig;
use crate::core::cursor::ByteCursor;
use crate::core::packet::{AnyPacket, Packet, UnknownPacket};
use crate::core::varint::VarInt;
use crate::core::wire::WireWrite;
use crate::error::{ProtocolError, Result};
use crate::protocol::registry::PreparedRegistry;
use crate::utils::metrics;

/// Result of a cancellable stream operation.
///
/// `Canceled` means the stream's token fired while the operation was
/// waiting; the stream is on its way down and the caller should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// The operation completed with a value.
    Ready(T),
    /// The cancellation token fired first.
    Canceled,
}

impl<T> Outcome<T> {
    /// Whether the token fired before completion.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Unwraps the value, mapping cancellation to `None`.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Canceled => None,
        }
    }
}

/// Frame read progress. Each state records what earlier stages learned so
/// no byte is ever parsed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Waiting for the length prefix varint.
    AwaitingLength,
    /// Length known; waiting for the id varint inside the body.
    AwaitingId { body_len: usize },
    /// Length and id known; waiting for the full body to buffer.
    AwaitingPayload {
        body_len: usize,
        id: VarInt,
        id_len: usize,
    },
}

/// A complete frame body as pulled off the wire: id varint plus payload.
#[derive(Debug)]
struct RawFrame {
    id: VarInt,
    id_len: usize,
    body: bytes::Bytes,
}

impl RawFrame {
    /// Cursor positioned at the start of the payload, id already skipped.
    fn payload_cursor(&self) -> Result<ByteCursor<'_>> {
        let mut cursor = ByteCursor::new(&self.body);
        if cursor.try_read_exact(self.id_len).is_none() {
            return Err(ProtocolError::MalformedPacket(
                "frame body shorter than its id".into(),
            ));
        }
        Ok(cursor)
    }
}

/// Typed packet I/O over one connection.
pub struct PacketStream<S> {
    io: S,
    registry: PreparedRegistry,
    config: CodecConfig,
    cancel: CancellationToken,
    read_buf: BytesMut,
    write_buf: BytesMut,
    read_state: ReadState,
    closed: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> PacketStream<S> {
    /// Wraps `io` with a fresh cancellation token.
    pub fn new(io: S, registry: PreparedRegistry, config: CodecConfig) -> Self {
        Self::with_cancellation(io, registry, config, CancellationToken::new())
    }

    /// Wraps `io`, tying the stream's lifetime to an external token.
    ///
    /// Cancelling `cancel` (or any of its clones) resolves in-flight reads
    /// and flushes to [`Outcome::Canceled`].
    pub fn with_cancellation(
        io: S,
        registry: PreparedRegistry,
        config: CodecConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            io,
            registry,
            read_buf: BytesMut::with_capacity(config.read_buffer_capacity),
            write_buf: BytesMut::with_capacity(config.write_buffer_capacity),
            config,
            cancel,
            read_state: ReadState::AwaitingLength,
            closed: false,
        }
    }

    /// Clone of the stream's cancellation token, for handing to the task
    /// that decides when this connection dies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Registry snapshot this stream decodes against.
    pub fn registry(&self) -> &PreparedRegistry {
        &self.registry
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reads the next packet, whatever its id.
    ///
    /// Registered ids come back typed inside the [`AnyPacket`]; unknown ids
    /// come back as raw bodies. Errors are fatal to the stream.
    pub async fn read_any(&mut self) -> Result<Outcome<AnyPacket>> {
        self.ensure_open()?;
        let frame = match self.next_frame().await.map_err(note_protocol_error)? {
            Outcome::Ready(frame) => frame,
            Outcome::Canceled => return Ok(Outcome::Canceled),
        };
        let packet = self.decode_packet(&frame).map_err(note_protocol_error)?;
        debug!(id = packet.id(), name = packet.name(), "packet received");
        Ok(Outcome::Ready(packet))
    }

    /// Reads the next packet, requiring it to be a `T`.
    ///
    /// Any other id is a protocol desync and fails with
    /// [`ProtocolError::UnexpectedPacketId`]; the frame is consumed either
    /// way, so the connection should be torn down on error.
    pub async fn read_as<T: Packet>(&mut self) -> Result<Outcome<T>> {
        self.ensure_open()?;
        let frame = match self.next_frame().await.map_err(note_protocol_error)? {
            Outcome::Ready(frame) => frame,
            Outcome::Canceled => return Ok(Outcome::Canceled),
        };
        if frame.id.value() != T::ID {
            return Err(note_protocol_error(ProtocolError::UnexpectedPacketId {
                expected: T::ID,
                got: frame.id.value(),
            }));
        }
        let mut cursor = frame.payload_cursor().map_err(note_protocol_error)?;
        let packet = T::decode(&mut cursor).map_err(note_protocol_error)?;
        self.warn_trailing(T::ID, cursor.remaining());
        Ok(Outcome::Ready(packet))
    }

    /// Stages a typed packet in the write buffer. Nothing reaches the wire
    /// until [`flush`](Self::flush).
    pub fn write_packet<T: Packet>(&mut self, packet: &T) -> Result<()> {
        self.ensure_open()?;
        self.stage_frame(T::ID, packet.encoded_len(), |buf| packet.encode(buf))
            .map_err(note_protocol_error)
    }

    /// Stages a type-erased packet, looking its encoder up in the registry.
    ///
    /// Unknown bodies are re-emitted verbatim. A typed carrier whose id was
    /// never registered fails with [`ProtocolError::UnregisteredPacket`].
    pub fn write_any(&mut self, packet: &AnyPacket) -> Result<()> {
        self.ensure_open()?;
        self.write_any_inner(packet).map_err(note_protocol_error)
    }

    fn write_any_inner(&mut self, packet: &AnyPacket) -> Result<()> {
        if let Some(raw) = packet.as_unknown() {
            let body_len = raw.body_len();
            if body_len > self.config.max_frame_len {
                return Err(ProtocolError::OversizedFrame {
                    length: body_len,
                    max: self.config.max_frame_len,
                });
            }
            self.write_buf
                .reserve(VarInt(body_len as i32).encoded_len() + body_len);
            self.write_buf.put_var_int(body_len as i32);
            raw.write_to(&mut self.write_buf);
            metrics::global().record_frame_encoded();
            trace!(id = raw.id.value(), body_len, "unknown packet staged verbatim");
            return Ok(());
        }

        let entry = self
            .registry
            .get(packet.id())
            .ok_or(ProtocolError::UnregisteredPacket { id: packet.id() })?
            .clone();
        let payload_len = entry.payload_len(packet)?;
        self.stage_frame(packet.id(), payload_len, |buf| entry.encode_body(packet, buf))
    }

    /// Writes everything staged so far to the transport and flushes it.
    pub async fn flush(&mut self) -> Result<Outcome<()>> {
        self.ensure_open()?;
        while !self.write_buf.is_empty() {
            let cancel = self.cancel.clone();
            tokio::select! {
                _ = cancel.cancelled() => return Ok(Outcome::Canceled),
                written = self.io.write_buf(&mut self.write_buf) => {
                    let n = written?;
                    if n == 0 {
                        return Err(ProtocolError::ConnectionClosed);
                    }
                    metrics::global().add_bytes_written(n as u64);
                }
            }
        }
        self.io.flush().await?;
        Ok(Outcome::Ready(()))
    }

    /// Tears the stream down: fires the cancellation token, makes a
    /// best-effort attempt to drain staged frames, and shuts the write half
    /// down. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cancel.cancel();
        if !self.write_buf.is_empty() {
            let _ = self.io.write_all_buf(&mut self.write_buf).await;
        }
        let _ = self.io.shutdown().await;
        debug!("packet stream closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(())
    }

    /// Pulls the next complete frame, waiting for bytes as needed.
    async fn next_frame(&mut self) -> Result<Outcome<RawFrame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                metrics::global().record_frame_decoded();
                trace!(
                    id = frame.id.value(),
                    body_len = frame.body.len(),
                    "frame assembled"
                );
                return Ok(Outcome::Ready(frame));
            }
            let target = self.read_buf.len() + 1;
            match self.fill_at_least(target).await? {
                Outcome::Ready(()) => {}
                Outcome::Canceled => return Ok(Outcome::Canceled),
            }
        }
    }

    /// Suspends until at least `target` bytes are buffered.
    ///
    /// Resolves [`Outcome::Canceled`] when the token fires first and
    /// [`ProtocolError::ConnectionClosed`] when the peer hangs up.
    async fn fill_at_least(&mut self, target: usize) -> Result<Outcome<()>> {
        while self.read_buf.len() < target {
            let cancel = self.cancel.clone();
            tokio::select! {
                _ = cancel.cancelled() => return Ok(Outcome::Canceled),
                read = self.io.read_buf(&mut self.read_buf) => {
                    let n = read?;
                    if n == 0 {
                        return Err(ProtocolError::ConnectionClosed);
                    }
                    metrics::global().add_bytes_read(n as u64);
                }
            }
        }
        Ok(Outcome::Ready(()))
    }

    /// Advances the read state machine as far as buffered bytes allow.
    ///
    /// Returns `Ok(None)` when more bytes are needed; consumed prefixes are
    /// remembered in [`ReadState`], never re-parsed.
    fn parse_frame(&mut self) -> Result<Option<RawFrame>> {
        loop {
            match self.read_state {
                ReadState::AwaitingLength => {
                    let mut cursor = ByteCursor::new(&self.read_buf);
                    let Some(length) = VarInt::try_decode(&mut cursor)? else {
                        return Ok(None);
                    };
                    let declared = length.value();
                    if declared < 1 {
                        return Err(ProtocolError::InvalidFrameLength { length: declared });
                    }
                    let body_len = declared as usize;
                    if body_len > self.config.max_frame_len {
                        return Err(ProtocolError::OversizedFrame {
                            length: body_len,
                            max: self.config.max_frame_len,
                        });
                    }
                    self.read_buf.advance(cursor.position());
                    self.read_buf
                        .reserve(body_len.saturating_sub(self.read_buf.len()));
                    self.read_state = ReadState::AwaitingId { body_len };
                }
                ReadState::AwaitingId { body_len } => {
                    // The id must land inside the declared body, so the
                    // probe window stops at the body boundary.
                    let window_len = self.read_buf.len().min(body_len);
                    let mut cursor = ByteCursor::new(&self.read_buf[..window_len]);
                    match VarInt::try_decode(&mut cursor)? {
                        Some(id) => {
                            self.read_state = ReadState::AwaitingPayload {
                                body_len,
                                id,
                                id_len: cursor.position(),
                            };
                        }
                        None if window_len == body_len => {
                            // Whole body is here yet the id never
                            // terminated: the declared length is too short.
                            return Err(ProtocolError::InvalidFrameLength {
                                length: body_len as i32,
                            });
                        }
                        None => return Ok(None),
                    }
                }
                ReadState::AwaitingPayload { body_len, id, id_len } => {
                    if self.read_buf.len() < body_len {
                        return Ok(None);
                    }
                    let body = self.read_buf.split_to(body_len).freeze();
                    self.read_state = ReadState::AwaitingLength;
                    return Ok(Some(RawFrame { id, id_len, body }));
                }
            }
        }
    }

    /// Turns a complete frame body into a packet via the registry, falling
    /// back to a raw capture for unregistered ids.
    fn decode_packet(&self, frame: &RawFrame) -> Result<AnyPacket> {
        let mut cursor = frame.payload_cursor()?;
        let Some(entry) = self.registry.get(frame.id.value()) else {
            // Step back over the id so the raw capture keeps it.
            cursor.rewind(frame.id_len)?;
            let raw = UnknownPacket::read_from(&mut cursor)?;
            metrics::global().record_unknown_packet();
            debug!(
                id = raw.id.value(),
                payload_len = raw.payload.len(),
                "unknown packet id, passing through raw"
            );
            return Ok(AnyPacket::unknown(raw));
        };
        let packet = entry.decode_body(&mut cursor)?;
        self.warn_trailing(frame.id.value(), cursor.remaining());
        Ok(packet)
    }

    fn warn_trailing(&self, id: i32, trailing: usize) {
        if trailing > 0 {
            warn!(id, trailing, "decoder left trailing payload bytes");
        }
    }

    /// Stages one frame: length prefix, id, then `encode`'s payload. The
    /// payload must come out exactly `payload_len` bytes or the staged
    /// frame is rolled back and the write fails.
    fn stage_frame<F>(&mut self, id: i32, payload_len: usize, encode: F) -> Result<()>
    where
        F: FnOnce(&mut BytesMut) -> Result<usize>,
    {
        let id_var = VarInt(id);
        let body_len = id_var.encoded_len() + payload_len;
        if body_len > self.config.max_frame_len {
            return Err(ProtocolError::OversizedFrame {
                length: body_len,
                max: self.config.max_frame_len,
            });
        }

        let frame_start = self.write_buf.len();
        self.write_buf
            .reserve(VarInt(body_len as i32).encoded_len() + body_len);
        self.write_buf.put_var_int(body_len as i32);
        id_var.encode(&mut self.write_buf);

        let payload_start = self.write_buf.len();
        let claimed = match encode(&mut self.write_buf) {
            Ok(claimed) => claimed,
            Err(err) => {
                self.write_buf.truncate(frame_start);
                return Err(err);
            }
        };
        let actual = self.write_buf.len() - payload_start;
        if claimed != payload_len || actual != payload_len {
            self.write_buf.truncate(frame_start);
            return Err(ProtocolError::EncodedSizeMismatch {
                expected: payload_len,
                actual: if actual == payload_len { claimed } else { actual },
            });
        }

        metrics::global().record_frame_encoded();
        trace!(id, payload_len, "frame staged");
        Ok(())
    }
}

impl<S> fmt::Debug for PacketStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketStream")
            .field("read_state", &self.read_state)
            .field("read_buffered", &self.read_buf.len())
            .field("write_buffered", &self.write_buf.len())
            .field("closed", &self.closed)
            .finish()
    }
}

fn note_protocol_error(err: ProtocolError) -> ProtocolError {
    if !matches!(err, ProtocolError::Io(_) | ProtocolError::ConnectionClosed) {
        metrics::global().record_protocol_error();
    }
    err
}
