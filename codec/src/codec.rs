//! Traits for types with a fixed place in a compact binary stream.
//!
//! Fields describe themselves, but the values carried next to them (digests, packages, the
//! fields themselves when framed in a larger stream) are written and read through these traits
//! so callers can size a buffer once and fill it without reallocating.

use crate::error::Error;
use bytes::{Buf, BufMut, BytesMut};

/// Types that can be serialized into a buffer.
pub trait Write {
    /// Writes `self` to `buf`.
    ///
    /// Implementations may panic if `buf` runs out of capacity.
    fn write(&self, buf: &mut impl BufMut);
}

/// Types that know how many bytes [Write::write] will produce.
pub trait EncodeSize {
    /// Returns the exact number of bytes written by [Write::write].
    fn encode_size(&self) -> usize;
}

/// Types that can be read from a buffer.
///
/// `Cfg` carries whatever bounds the reader needs (for example [crate::Limits] when reading a
/// field from an untrusted peer). Use `()` when no configuration applies.
pub trait Read<Cfg = ()>: Sized {
    /// Reads a value from the front of `buf`, consuming exactly its bytes.
    fn read_cfg(buf: &mut impl Buf, cfg: &Cfg) -> Result<Self, Error>;
}

/// Serializes into a freshly allocated buffer of exactly [EncodeSize::encode_size] bytes.
pub trait Encode: Write + EncodeSize {
    /// # Panics
    ///
    /// Panics if [Write::write] and [EncodeSize::encode_size] disagree.
    fn encode(&self) -> BytesMut {
        let len = self.encode_size();
        let mut buffer = BytesMut::with_capacity(len);
        self.write(&mut buffer);
        assert_eq!(buffer.len(), len, "write() did not write expected bytes");
        buffer
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Reads a value that must span the whole buffer.
pub trait Decode<Cfg = ()>: Read<Cfg> {
    /// Fails with [Error::ExtraData] if any bytes remain after the value.
    fn decode_cfg(mut buf: impl Buf, cfg: &Cfg) -> Result<Self, Error> {
        let result = Self::read_cfg(&mut buf, cfg)?;
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }
        Ok(result)
    }
}

impl<Cfg, T: Read<Cfg>> Decode<Cfg> for T {}

/// Types whose serialized size never varies.
pub trait FixedSize {
    const SIZE: usize;
}

impl<T: FixedSize> EncodeSize for T {
    fn encode_size(&self) -> usize {
        Self::SIZE
    }
}

/// [Read] without configuration.
pub trait ReadExt: Read<()> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        <Self as Read<()>>::read_cfg(buf, &())
    }
}

impl<T: Read<()>> ReadExt for T {}

/// [Decode] without configuration.
pub trait DecodeExt: Decode<()> {
    fn decode(buf: impl Buf) -> Result<Self, Error> {
        <Self as Decode<()>>::decode_cfg(buf, &())
    }
}

impl<T: Decode<()>> DecodeExt for T {}

// Hash payloads are raw fixed-width byte strings
impl<const N: usize> Write for [u8; N] {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> Read for [u8; N] {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        if buf.remaining() < N {
            return Err(Error::EndOfBuffer);
        }
        let mut array = [0u8; N];
        buf.copy_to_slice(&mut array);
        Ok(array)
    }
}

impl<const N: usize> FixedSize for [u8; N] {
    const SIZE: usize = N;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HASH_SIZE;
    use bytes::Bytes;

    #[test]
    fn test_hash_too_short() {
        let mut reader = Bytes::from(vec![0xab; HASH_SIZE - 1]);
        assert!(matches!(
            <[u8; HASH_SIZE]>::read(&mut reader),
            Err(Error::EndOfBuffer)
        ));
    }

    #[test]
    fn test_hash_extra_data() {
        let encoded = Bytes::from(vec![0xab; HASH_SIZE + 1]);
        assert!(matches!(
            <[u8; HASH_SIZE]>::decode(encoded),
            Err(Error::ExtraData(1))
        ));
    }

    #[test]
    fn test_hash() {
        let value = [7u8; HASH_SIZE];
        let encoded = value.encode();
        assert_eq!(encoded.len(), HASH_SIZE);
        assert_eq!(<[u8; HASH_SIZE]>::decode(encoded).unwrap(), value);
    }
}
