//! Leaf value encoder.

use bytes::{BufMut, Bytes, BytesMut};

/// Maximum encoded size of a zig-zag varint.
pub const MAX_VARINT_LEN: usize = 10;

pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Append the zig-zag varint form of `n` to `buf`; returns the number of
/// bytes written.
pub fn put_long(buf: &mut impl BufMut, n: i64) -> usize {
    let mut z = zigzag_encode(n);
    let mut written = 1;
    while z >= 0x80 {
        buf.put_u8((z as u8 & 0x7f) | 0x80);
        z >>= 7;
        written += 1;
    }
    buf.put_u8(z as u8);
    written
}

/// Growable output buffer for binary-encoded values.
///
/// Encoding never fails; schema conformance is checked by the
/// [`DatumWriter`](crate::DatumWriter).
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_null(&mut self) {}

    pub fn write_boolean(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    pub fn write_int(&mut self, v: i32) {
        put_long(&mut self.buf, i64::from(v));
    }

    pub fn write_long(&mut self, v: i64) {
        put_long(&mut self.buf, v);
    }

    pub fn write_float(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn write_double(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.write_long(v.len() as i64);
        self.buf.put_slice(v);
    }

    pub fn write_string(&mut self, v: &str) {
        self.write_bytes(v.as_bytes());
    }

    /// Raw bytes without a length prefix.
    pub fn write_fixed(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    pub fn write_enum(&mut self, ordinal: u32) {
        self.write_long(i64::from(ordinal));
    }

    pub fn write_union_index(&mut self, index: u32) {
        self.write_long(i64::from(index));
    }

    /// Item count of an array or map block; `0` terminates the sequence.
    pub fn write_block_count(&mut self, count: usize) {
        self.write_long(count as i64);
    }

    /// Block header in the negative-count form, followed by the byte size of
    /// the block's items.
    pub fn write_sized_block_header(&mut self, count: usize, byte_len: usize) {
        self.write_long(-(count as i64));
        self.write_long(byte_len as i64);
    }

    /// Append everything written to `other`.
    pub fn append(&mut self, other: &Encoder) {
        self.buf.extend_from_slice(&other.buf);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Take the written bytes, leaving the encoder empty.
    pub fn split(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_maps_small_magnitudes_to_small_codes() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn put_long_reports_length() {
        let mut buf = Vec::new();
        assert_eq!(put_long(&mut buf, 63), 1);
        assert_eq!(put_long(&mut buf, 64), 2);
        assert_eq!(put_long(&mut buf, i64::MIN), MAX_VARINT_LEN);
    }
}
