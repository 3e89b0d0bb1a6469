//! # Frame Codec
//!
//! Length-delimited framing for the packet stream, expressed as a
//! [`tokio_util::codec`] pair so it drops into `Framed` transports.
//!
//! ## Wire layout
//!
//! ```text
//! +----------------+-----------------+------------------+
//! | length: VarInt | id: VarInt      | payload bytes    |
//! +----------------+-----------------+------------------+
//!   counts id+payload, not itself
//! ```
//!
//! Decoding is non-destructive until a whole frame is buffered: a partial
//! frame yields `Ok(None)` with the source untouched, and the length bound
//! is enforced before any buffering is committed, so a hostile length
//! prefix cannot make the peer allocate.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::cursor::ByteCursor;
use crate::core::varint::VarInt;
use crate::core::wire::WireWrite;
use crate::error::{ProtocolError, Result};

/// Default ceiling on the decoded frame body (id + payload), 2 MiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// One delimited unit on the wire: a packet id and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet id as decoded from (or destined for) the wire.
    pub id: VarInt,
    /// Payload bytes, excluding the length and id prefixes.
    pub payload: Bytes,
}

impl Frame {
    /// Builds a frame from a raw id and payload.
    pub fn new(id: i32, payload: Bytes) -> Self {
        Self {
            id: VarInt(id),
            payload,
        }
    }

    /// Size of the length-prefixed body: id bytes plus payload.
    pub fn body_len(&self) -> usize {
        self.id.encoded_len() + self.payload.len()
    }

    /// Total bytes this frame occupies on the wire, prefix included.
    pub fn wire_len(&self) -> usize {
        let body = self.body_len();
        VarInt(body as i32).encoded_len() + body
    }
}

/// Stateless codec turning a byte stream into [`Frame`]s and back.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Creates a codec enforcing `max_frame_len` on decoded and encoded
    /// frame bodies.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Configured body ceiling.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let mut cursor = ByteCursor::new(&src[..]);

        let Some(length) = VarInt::try_decode(&mut cursor)? else {
            return Ok(None);
        };
        let declared = length.value();
        if declared < 1 {
            // The body always contains at least one id byte.
            return Err(ProtocolError::InvalidFrameLength { length: declared });
        }
        let body_len = declared as usize;
        if body_len > self.max_frame_len {
            return Err(ProtocolError::OversizedFrame {
                length: body_len,
                max: self.max_frame_len,
            });
        }

        let prefix_len = cursor.position();
        if cursor.remaining() < body_len {
            // Pre-size for the rest of the frame, then wait for more bytes.
            src.reserve(prefix_len + body_len - src.len());
            return Ok(None);
        }

        src.advance(prefix_len);
        let body = src.split_to(body_len).freeze();

        let mut body_cursor = ByteCursor::new(&body);
        let id = match VarInt::try_decode(&mut body_cursor)? {
            Some(id) => id,
            // Continuation bit still set at the body boundary: the declared
            // length cannot even hold the id.
            None => return Err(ProtocolError::InvalidFrameLength { length: declared }),
        };
        let payload = body.slice(body_cursor.position()..);

        Ok(Some(Frame { id, payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let body_len = frame.body_len();
        if body_len > self.max_frame_len {
            return Err(ProtocolError::OversizedFrame {
                length: body_len,
                max: self.max_frame_len,
            });
        }

        dst.reserve(VarInt(body_len as i32).encoded_len() + body_len);
        dst.put_var_int(body_len as i32);
        frame.id.encode(dst);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}
