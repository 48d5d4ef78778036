//! BLAKE3 implementation of the `Hasher` trait.
//!
//! This is the default hash function for packages. With the `parallel-blake3` feature, large
//! messages are hashed across the rayon thread pool.
//!
//! # Example
//! ```rust
//! use compactbin_cryptography::{Blake3, Hasher};
//!
//! let mut hasher = Blake3::new();
//! hasher.update(b"hello,");
//! hasher.update(b"world!");
//! let digest = hasher.finalize();
//! println!("digest: {digest}");
//! ```

use crate::{Error, Hasher};
use blake3::Hasher as IBlake3;
use bytes::{Buf, BufMut};
use compactbin_codec::{Error as CodecError, FixedSize, Read, Write, HASH_SIZE};
use compactbin_utils::hex;
use std::fmt;

/// Messages at least this large are hashed in parallel when `parallel-blake3` is enabled.
#[cfg(feature = "parallel-blake3")]
const PARALLEL_THRESHOLD: usize = 128 * 1024;

/// Generate a BLAKE3 digest from a message.
pub fn hash(message: &[u8]) -> Digest {
    let mut hasher = Blake3::new();
    hasher.update(message);
    hasher.finalize()
}

/// BLAKE3 hasher.
#[derive(Debug)]
pub struct Blake3 {
    hasher: IBlake3,
}

impl Default for Blake3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Blake3 {
    fn clone(&self) -> Self {
        // State is not carried over
        Self::default()
    }
}

impl Hasher for Blake3 {
    type Digest = Digest;

    fn new() -> Self {
        Self {
            hasher: IBlake3::new(),
        }
    }

    fn update(&mut self, message: &[u8]) {
        #[cfg(feature = "parallel-blake3")]
        if message.len() >= PARALLEL_THRESHOLD {
            self.hasher.update_rayon(message);
            return;
        }
        self.hasher.update(message);
    }

    fn finalize(&mut self) -> Self::Digest {
        let digest = Digest(*self.hasher.finalize().as_bytes());
        self.hasher.reset();
        digest
    }

    fn reset(&mut self) {
        self.hasher.reset();
    }
}

/// Digest of a BLAKE3 hashing operation.
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
