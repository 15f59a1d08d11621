//! Varint and length-prefixed helpers for byte streams.
//!
//! Used where data is read or written incrementally (container headers and
//! block framing) rather than from an in-memory buffer.

use std::io::{self, Read, Write};

use crate::{
    encoder::{MAX_VARINT_LEN, put_long, zigzag_decode},
    error::DecodeError,
};

/// Write `n` as a zig-zag varint; returns the number of bytes written.
pub fn write_long<W: Write + ?Sized>(w: &mut W, n: i64) -> io::Result<usize> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    let len = put_long(&mut buf, n);
    w.write_all(&buf)?;
    Ok(len)
}

/// Write a length-prefixed byte string; returns the number of bytes written.
pub fn write_bytes<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> io::Result<usize> {
    let prefix = write_long(w, bytes.len() as i64)?;
    w.write_all(bytes)?;
    Ok(prefix + bytes.len())
}

/// Read a zig-zag varint.
pub fn read_long<R: Read + ?Sized>(r: &mut R) -> Result<i64, DecodeError> {
    read_long_or_eof(r)?.ok_or(DecodeError::UnexpectedEndOfInput {
        needed: 1,
        remaining: 0,
    })
}

/// Read a zig-zag varint, or `None` if the stream ends before its first byte.
///
/// End of stream after the first byte is still an error.
pub fn read_long_or_eof<R: Read + ?Sized>(r: &mut R) -> Result<Option<i64>, DecodeError> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_LEN {
        if r.read(&mut byte)? == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(DecodeError::UnexpectedEndOfInput {
                needed: 1,
                remaining: 0,
            });
        }
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(Some(zigzag_decode(value)));
        }
    }
    Err(DecodeError::VarintOverflow)
}

/// Read a non-negative length.
pub fn read_length<R: Read + ?Sized>(r: &mut R) -> Result<usize, DecodeError> {
    let length = read_long(r)?;
    usize::try_from(length).map_err(|_| DecodeError::NegativeLength { length })
}

/// Read exactly `len` bytes.
pub fn read_exact_vec<R: Read + ?Sized>(r: &mut R, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::new();
    let read = r.take(len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(DecodeError::UnexpectedEndOfInput {
            needed: len,
            remaining: read,
        });
    }
    Ok(buf)
}

/// Read a length-prefixed byte string.
pub fn read_bytes<R: Read + ?Sized>(r: &mut R) -> Result<Vec<u8>, DecodeError> {
    let len = read_length(r)?;
    read_exact_vec(r, len)
}

pub fn read_string<R: Read + ?Sized>(r: &mut R) -> Result<String, DecodeError> {
    Ok(String::from_utf8(read_bytes(r)?)?)
}
