//! # Wire Write Helpers
//!
//! Extension trait layering the protocol's field encodings over any
//! [`BufMut`], so packet `encode` impls read as a flat sequence of
//! `put_*` calls instead of hand-rolled varint loops.

use bytes::BufMut;

use crate::core::varint::{VarInt, VarLong};

/// Protocol field encodings for any growable byte sink.
pub trait WireWrite: BufMut {
    /// Appends a canonical varint.
    fn put_var_int(&mut self, value: i32) -> usize {
        VarInt(value).encode(self)
    }

    /// Appends a canonical varlong.
    fn put_var_long(&mut self, value: i64) -> usize {
        VarLong(value).encode(self)
    }

    /// Appends a varint-length-prefixed UTF-8 string.
    fn put_var_string(&mut self, value: &str) -> usize {
        let prefix = self.put_var_int(value.len() as i32);
        self.put_slice(value.as_bytes());
        prefix + value.len()
    }

    /// Appends a boolean as a single byte.
    fn put_bool(&mut self, value: bool) -> usize {
        self.put_u8(u8::from(value));
        1
    }
}

impl<B: BufMut + ?Sized> WireWrite for B {}

/// Encoded size of a varint-length-prefixed string, for exact-capacity
/// reservations ahead of an encode.
pub fn var_string_len(value: &str) -> usize {
    VarInt(value.len() as i32).encoded_len() + value.len()
}
