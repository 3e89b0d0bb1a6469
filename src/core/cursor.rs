//! # Byte Cursor
//!
//! Speculative reader over the unconsumed window of a receive buffer.
//!
//! A [`ByteCursor`] borrows a contiguous byte window and tracks a read
//! position. Nothing a cursor does touches the backing buffer: the owner
//! commits consumed bytes afterwards by advancing the buffer by
//! [`ByteCursor::position`]. That split is what lets the frame decoder peek
//! at a partially-received frame and retry later without losing or
//! re-parsing the prefix it already buffered.
//!
//! Two families of readers coexist:
//! - `try_*` readers report insufficient data by returning `None` and
//!   leaving the cursor exactly where it was, the hot-path contract used
//!   while a frame is still accumulating.
//! - `read_*` readers are for complete payloads, where running out of bytes
//!   means the packet itself is malformed; they return
//!   [`ProtocolError::MalformedPacket`].

use crate::core::varint::VarInt;
use crate::error::{constants, ProtocolError, Result};

/// Read cursor over a borrowed byte window.
///
/// Cheap to copy; callers that need all-or-nothing multi-field reads copy
/// the cursor, parse the copy, and assign it back only on success.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor over `buf`, positioned at its start.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read position: the number of bytes consumed so far.
    ///
    /// This is the value the buffer owner passes to `BytesMut::advance`
    /// when it commits a successful parse.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes left in the window.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Advances by exactly `n` bytes and returns them, or returns `None`
    /// and leaves the cursor untouched when fewer than `n` remain.
    pub fn try_read_exact(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    /// Single-byte counterpart of [`try_read_exact`](Self::try_read_exact).
    pub fn try_read_u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Moves the cursor backward by `n` bytes within the window.
    ///
    /// Used when an id lookup misses and the raw id bytes must be re-exposed
    /// to the unknown-packet decoder.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.pos {
            return Err(ProtocolError::MalformedPacket(
                constants::ERR_REWIND_UNDERFLOW.into(),
            ));
        }
        self.pos -= n;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let rem = self.remaining();
        let slice = self.try_read_exact(N).ok_or_else(|| {
            ProtocolError::MalformedPacket(format!("truncated field: need {N} bytes, {rem} left"))
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Reads a single byte from a complete payload.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a boolean encoded as a single byte (zero = false).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a big-endian `u16` (network order).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads exactly `n` bytes from a complete payload.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let rem = self.remaining();
        self.try_read_exact(n).ok_or_else(|| {
            ProtocolError::MalformedPacket(format!("truncated field: need {n} bytes, {rem} left"))
        })
    }

    /// Consumes and returns everything left in the window.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    /// Reads a varint-length-prefixed UTF-8 string of at most `max_len`
    /// bytes. The length cap is checked before any allocation.
    pub fn read_var_string(&mut self, max_len: usize) -> Result<String> {
        let len = VarInt::decode(self)?.value();
        if len < 0 {
            return Err(ProtocolError::MalformedPacket(format!(
                "negative string length {len}"
            )));
        }
        let len = len as usize;
        if len > max_len {
            return Err(ProtocolError::MalformedPacket(format!(
                "string length {len} exceeds limit {max_len}"
            )));
        }
        let raw = self.read_bytes(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| ProtocolError::MalformedPacket(format!("invalid UTF-8 string: {e}")))
    }
}
