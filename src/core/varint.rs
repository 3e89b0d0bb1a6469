//! # Variable-Length Integers
//!
//! LEB128-style varint primitives shared by every layer of the wire format.
//!
//! Each encoded byte carries seven data bits, low group first, with the high
//! bit set on every byte except the last. A [`VarInt`] spans at most five
//! bytes and a [`VarLong`] at most ten; a continuation bit still set at that
//! cap is malformed input and kills the frame.
//!
//! Encoding is always canonical (minimal length). Decoding accepts
//! zero-padded non-minimal input within the byte cap, since remote stacks
//! are allowed to emit it, and discards data bits beyond the value width.

use bytes::BufMut;

use crate::core::cursor::ByteCursor;
use crate::error::{constants, ProtocolError, Result};

/// Low seven bits of each encoded byte hold payload data.
pub const VARINT_DATA_MASK: u8 = 0x7F;

/// High bit flags that another byte follows.
pub const VARINT_CONTINUATION_BIT: u8 = 0x80;

/// 32-bit integer in variable-length wire encoding.
///
/// Negative values sign-extend to the full five bytes, so frame lengths and
/// packet ids (which are never negative in practice) stay short while the
/// type remains a plain `i32` everywhere outside the codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarInt(pub i32);

impl VarInt {
    /// Upper bound on the encoded size of any `VarInt`.
    pub const MAX_BYTES: usize = 5;

    /// Underlying value.
    pub fn value(self) -> i32 {
        self.0
    }

    /// Number of bytes the canonical encoding of this value occupies.
    pub fn encoded_len(self) -> usize {
        let raw = self.0 as u32;
        if raw == 0 {
            1
        } else {
            (31 - raw.leading_zeros() as usize) / 7 + 1
        }
    }

    /// Writes the canonical encoding into `buf`, returning the byte count.
    pub fn encode(self, buf: &mut (impl BufMut + ?Sized)) -> usize {
        let mut raw = self.0 as u32;
        let mut written = 0;
        loop {
            let group = (raw as u8) & VARINT_DATA_MASK;
            raw >>= 7;
            written += 1;
            if raw == 0 {
                buf.put_u8(group);
                return written;
            }
            buf.put_u8(group | VARINT_CONTINUATION_BIT);
        }
    }

    /// Decodes from a window that may end mid-value.
    ///
    /// Returns `Ok(None)` when the bytes so far are a valid prefix of an
    /// encoding, leaving `cursor` unmoved so the caller can retry once more
    /// data arrives. A sixth continuation byte is malformed.
    pub fn try_decode(cursor: &mut ByteCursor<'_>) -> Result<Option<Self>> {
        let mut probe = *cursor;
        let mut value: u32 = 0;
        for group in 0..Self::MAX_BYTES {
            let Some(byte) = probe.try_read_u8() else {
                return Ok(None);
            };
            value |= u32::from(byte & VARINT_DATA_MASK) << (7 * group);
            if byte & VARINT_CONTINUATION_BIT == 0 {
                *cursor = probe;
                return Ok(Some(Self(value as i32)));
            }
        }
        Err(ProtocolError::MalformedVarInt(
            constants::ERR_VARINT_TOO_LONG,
        ))
    }

    /// Decodes from a window that must contain the whole value.
    ///
    /// Truncation is malformed here, unlike [`try_decode`](Self::try_decode):
    /// complete payloads have no more data coming.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Self::try_decode(cursor)?.ok_or(ProtocolError::MalformedVarInt(
            constants::ERR_VARINT_TRUNCATED,
        ))
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<VarInt> for i32 {
    fn from(value: VarInt) -> Self {
        value.0
    }
}

impl std::fmt::Display for VarInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 64-bit integer in variable-length wire encoding, capped at ten bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarLong(pub i64);

impl VarLong {
    /// Upper bound on the encoded size of any `VarLong`.
    pub const MAX_BYTES: usize = 10;

    /// Underlying value.
    pub fn value(self) -> i64 {
        self.0
    }

    /// Number of bytes the canonical encoding of this value occupies.
    pub fn encoded_len(self) -> usize {
        let raw = self.0 as u64;
        if raw == 0 {
            1
        } else {
            (63 - raw.leading_zeros() as usize) / 7 + 1
        }
    }

    /// Writes the canonical encoding into `buf`, returning the byte count.
    pub fn encode(self, buf: &mut (impl BufMut + ?Sized)) -> usize {
        let mut raw = self.0 as u64;
        let mut written = 0;
        loop {
            let group = (raw as u8) & VARINT_DATA_MASK;
            raw >>= 7;
            written += 1;
            if raw == 0 {
                buf.put_u8(group);
                return written;
            }
            buf.put_u8(group | VARINT_CONTINUATION_BIT);
        }
    }

    /// Decodes from a window that may end mid-value. Same contract as
    /// [`VarInt::try_decode`], with an eleventh byte being malformed.
    pub fn try_decode(cursor: &mut ByteCursor<'_>) -> Result<Option<Self>> {
        let mut probe = *cursor;
        let mut value: u64 = 0;
        for group in 0..Self::MAX_BYTES {
            let Some(byte) = probe.try_read_u8() else {
                return Ok(None);
            };
            value |= u64::from(byte & VARINT_DATA_MASK) << (7 * group);
            if byte & VARINT_CONTINUATION_BIT == 0 {
                *cursor = probe;
                return Ok(Some(Self(value as i64)));
            }
        }
        Err(ProtocolError::MalformedVarInt(
            constants::ERR_VARLONG_TOO_LONG,
        ))
    }

    /// Decodes from a window that must contain the whole value.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Self::try_decode(cursor)?.ok_or(ProtocolError::MalformedVarInt(
            constants::ERR_VARINT_TRUNCATED,
        ))
    }
}

impl From<i64> for VarLong {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<VarLong> for i64 {
    fn from(value: VarLong) -> Self {
        value.0
    }
}

impl std::fmt::Display for VarLong {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
