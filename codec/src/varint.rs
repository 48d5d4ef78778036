//! Variable-length unsigned integer encoding and decoding
//!
//! The number of leading 1-bits in the first byte is the number of bytes that follow it (0
//! through 8). The bits of the first byte below its leading run, followed by the remaining bytes
//! in big-endian order, form the value:
//!
//! ```text
//! 0xxxxxxx                                  0 ..= 2^7 - 1
//! 10xxxxxx xxxxxxxx                         0 ..= 2^14 - 1
//! 110xxxxx xxxxxxxx xxxxxxxx                0 ..= 2^21 - 1
//! ...
//! 11111110 xxxxxxxx (x7)                    0 ..= 2^56 - 1
//! 11111111 xxxxxxxx (x8)                    0 ..= 2^64 - 1
//! ```
//!
//! Because the total length is known from the first byte alone, a reader never needs to look
//! ahead to find where a value ends.

use crate::Error;
use bytes::{Buf, BufMut};

/// The maximum number of bytes in an encoded value.
pub const MAX_SIZE: usize = 9;

const DATA_BITS_PER_BYTE: u32 = 7;

/// Returns the number of bytes in the value that starts with `first`.
#[inline]
pub fn measure(first: u8) -> usize {
    first.leading_ones() as usize + 1
}

/// Returns the number of bytes needed to encode `value`.
#[inline]
pub fn size(value: u64) -> usize {
    let bits = u64::BITS - value.leading_zeros();
    (bits.div_ceil(DATA_BITS_PER_BYTE) as usize).clamp(1, MAX_SIZE)
}

/// Encodes `value` into `buf`.
pub fn write(value: u64, buf: &mut impl BufMut) {
    let len = size(value);
    if len == 1 {
        // Fast path for small values (common case for lengths and counts).
        buf.put_u8(value as u8);
        return;
    }
    if len == MAX_SIZE {
        buf.put_u8(0xff);
        buf.put_u64(value);
        return;
    }

    // The value fits in the low `7 * len` bits, so the marker bits of the first byte are zero
    // before they are set.
    let bytes = value.to_be_bytes();
    let mut scratch = [0u8; MAX_SIZE];
    scratch[..len].copy_from_slice(&bytes[8 - len..]);
    scratch[0] |= 0xffu8 << (MAX_SIZE - len);
    buf.put_slice(&scratch[..len]);
}

/// Decodes a value from the start of `bytes`, returning it with the number of bytes consumed.
///
/// Returns [Error::EndOfBuffer] if `bytes` is shorter than the encoding announced by its first
/// byte. Callers reading a stream should treat that as a request for more data.
pub fn read(bytes: &[u8]) -> Result<(u64, usize), Error> {
    let Some(&first) = bytes.first() else {
        return Err(Error::EndOfBuffer);
    };
    let len = measure(first);
    if bytes.len() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok((decode(first, &bytes[1..len]), len))
}

/// Decodes a value from a [Buf], advancing it past the encoding.
pub fn read_buf(buf: &mut impl Buf) -> Result<u64, Error> {
    if !buf.has_remaining() {
        return Err(Error::EndOfBuffer);
    }
    let first = buf.chunk()[0];
    let len = measure(first);
    if buf.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    buf.advance(1);
    let mut rest = [0u8; MAX_SIZE - 1];
    buf.copy_to_slice(&mut rest[..len - 1]);
    Ok(decode(first, &rest[..len - 1]))
}

/// Combines the data bits of `first` with the trailing bytes of an encoding.
#[inline]
fn decode(first: u8, rest: &[u8]) -> u64 {
    // First bytes of 0xfe and 0xff carry no data bits.
    let mut value = match rest.len() {
        extra @ 0..=6 => u64::from(first & (0xff >> (extra + 1))),
        _ => 0,
    };
    for &byte in rest {
        value = (value << 8) | u64::from(byte);
    }
    value
}

/// Returns `true` if `value` was encoded in the fewest bytes possible.
#[inline]
pub fn is_canonical(value: u64, len: usize) -> bool {
    size(value) == len
}
