//! SHA-256 implementation of the `Hasher` trait.
//!
//! This implementation uses the `sha2` crate to generate SHA-256 digests.
//!
//! # Example
//! ```rust
//! use compactbin_cryptography::{Hasher, Sha256};
//!
//! let mut hasher = Sha256::new();
//! hasher.update(b"hello,");
//! hasher.update(b"world!");
//! let digest = hasher.finalize();
//! println!("digest: {digest}");
//! ```

use crate::{Error, Hasher};
use bytes::{Buf, BufMut};
use compactbin_codec::{Error as CodecError, FixedSize, Read, Write, HASH_SIZE};
use compactbin_utils::hex;
use sha2::{Digest as _, Sha256 as ISha256};
use std::fmt;

/// Generate a SHA-256 digest from a message.
pub fn hash(message: &[u8]) -> Digest {
    let array: [u8; HASH_SIZE] = ISha256::digest(message).into();
    Digest(array)
}

/// SHA-256 hasher.
#[derive(Debug)]
pub struct Sha256 {
    hasher: ISha256,
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Sha256 {
    fn clone(&self) -> Self {
        // State is not carried over
        Self::default()
    }
}

impl Hasher for Sha256 {
    type Digest = Digest;

    fn new() -> Self {
        Self {
            hasher: ISha256::new(),
        }
    }

    fn update(&mut self, message: &[u8]) {
        self.hasher.update(message);
    }

    fn finalize(&mut self) -> Self::Digest {
        let array: [u8; HASH_SIZE] = self.hasher.finalize_reset().into();
        Digest(array)
    }

    fn reset(&mut self) {
        self.hasher = ISha256::new();
    }
}

/// Digest of a SHA-256 hashing operation.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Digest([u8; HASH_SIZE]);

impl Write for Digest {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl Read for Digest {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        <[u8; HASH_SIZE]>::read_cfg(buf, &()).map(Self)
    }
}

impl FixedSize for Digest {
    const SIZE: usize = HASH_SIZE;
}

impl From<[u8; HASH_SIZE]> for Digest {
    fn from(value: [u8; HASH_SIZE]) -> Self {
        Self(value)
    }
}

impl From<Digest> for [u8; HASH_SIZE] {
    fn from(value: Digest) -> Self {
        value.0
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; HASH_SIZE] = value.try_into().map_err(|_| Error::InvalidDigestLength)?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl crate::Digest for Digest {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"", "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"; "empty")]
    #[test_case(b"hello world", "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"; "hello world")]
    fn test_known_digests(message: &[u8], expected: &str) {
        assert_eq!(hash(message).to_string(), expected);
        let bytes = compactbin_utils::from_hex(expected).unwrap();
        assert_eq!(Digest::try_from(bytes.as_slice()), Ok(hash(message)));
        assert_eq!(Sha256::hash(message), hash(message));
    }
}
