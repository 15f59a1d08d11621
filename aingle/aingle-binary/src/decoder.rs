//! Leaf value decoder over an in-memory buffer.

use bytes::{Buf, Bytes};

use crate::{
    encoder::{MAX_VARINT_LEN, zigzag_decode},
    error::DecodeError,
};

type Result<T> = std::result::Result<T, DecodeError>;

/// Cursor over binary-encoded bytes.
#[derive(Debug, Clone)]
pub struct Decoder {
    buf: Bytes,
    initial_len: usize,
}

/// Header of one array or map block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Number of items in the block; `0` marks the end of the sequence.
    pub count: usize,
    /// Byte size of the block's items, present for negative-count blocks.
    pub byte_len: Option<usize>,
}

impl Decoder {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        let buf = buf.into();
        let initial_len = buf.len();
        Self { buf, initial_len }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.initial_len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(DecodeError::UnexpectedEndOfInput { needed, remaining });
        }
        Ok(())
    }

    pub fn read_null(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.buf.try_get_u8()? != 0)
    }

    pub fn read_long(&mut self) -> Result<i64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let b = self.buf.try_get_u8()?;
            value |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(zigzag_decode(value));
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| DecodeError::IntOutOfRange { value })
    }

    pub fn read_float(&mut self) -> Result<f32> {
        Ok(self.buf.try_get_f32_le()?)
    }

    pub fn read_double(&mut self) -> Result<f64> {
        Ok(self.buf.try_get_f64_le()?)
    }

    fn read_length(&mut self) -> Result<usize> {
        let length = self.read_long()?;
        usize::try_from(length).map_err(|_| DecodeError::NegativeLength { length })
    }

    pub fn read_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_length()?;
        self.read_fixed(len)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Exactly `size` raw bytes.
    pub fn read_fixed(&mut self, size: usize) -> Result<Bytes> {
        self.ensure(size)?;
        Ok(self.buf.copy_to_bytes(size))
    }

    pub fn read_enum(&mut self) -> Result<i32> {
        self.read_int()
    }

    pub fn read_union_index(&mut self) -> Result<i64> {
        self.read_long()
    }

    /// Read an array/map block header, accepting both the plain and the
    /// negative-count (byte-length-prefixed) forms.
    pub fn read_block_header(&mut self) -> Result<BlockHeader> {
        let count = self.read_long()?;
        if count >= 0 {
            return Ok(BlockHeader {
                count: count as usize,
                byte_len: None,
            });
        }
        let byte_len = self.read_length()?;
        Ok(BlockHeader {
            count: count.unsigned_abs() as usize,
            byte_len: Some(byte_len),
        })
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }

    pub fn skip_long(&mut self) -> Result<()> {
        self.read_long().map(drop)
    }

    pub fn skip_bytes(&mut self) -> Result<()> {
        let len = self.read_length()?;
        self.skip(len)
    }
}

impl From<&[u8]> for Decoder {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<Vec<u8>> for Decoder {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}
