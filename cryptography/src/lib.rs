//! Hash compact binary fields and attachments.
//!
//! # Status
//!
//! `compactbin-cryptography` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use compactbin_codec::{Array, Field, FixedSize, Object, Read, Write, HASH_SIZE};
use rand::{CryptoRng, RngCore};
use std::{
    fmt::{Debug, Display},
    hash::Hash,
};
use thiserror::Error;

pub mod blake3;
pub use blake3::Blake3;
pub mod sha256;
pub use sha256::Sha256;

/// Errors that can occur when interacting with cryptographic primitives.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid digest length")]
    InvalidDigestLength,
}

/// The output of a [Hasher].
///
/// Every digest is [HASH_SIZE] bytes, the size of a hash field in a compact binary tree.
pub trait Digest:
    Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Display
    + Send
    + Sync
    + AsRef<[u8]>
    + From<[u8; HASH_SIZE]>
    + Into<[u8; HASH_SIZE]>
    + for<'a> TryFrom<&'a [u8], Error = Error>
    + Write
    + Read
    + FixedSize
    + 'static
{
    /// Generate a random [Digest].
    ///
    /// # Warning
    ///
    /// This function is typically used for testing and is not recommended
    /// for production use.
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut digest = [0u8; HASH_SIZE];
        rng.fill_bytes(&mut digest);
        Self::from(digest)
    }
}

/// Interface that compactbin crates rely on for hashing.
///
/// Packages are generic over the hash function so that the same format can be verified with
/// whichever algorithm a deployment agrees on.
///
/// This trait is required to implement the `Clone` trait because it is often
/// part of a struct that is cloned. In practice, implementations do not actually
/// clone the hasher state but users should not rely on this behavior and call `reset`
/// after cloning.
pub trait Hasher: Clone + Send + Sync + 'static {
    /// Digest generated by the hasher.
    type Digest: Digest;

    /// Create a new hasher.
    fn new() -> Self;

    /// Append message to previously recorded data.
    fn update(&mut self, message: &[u8]);

    /// Hash all recorded data and reset the hasher
    /// to the initial state.
    fn finalize(&mut self) -> Self::Digest;

    /// Reset the hasher without generating a hash.
    ///
    /// This function does not need to be called after `finalize`.
    fn reset(&mut self);

    /// Hash a single message.
    fn hash(message: &[u8]) -> Self::Digest {
        let mut hasher = Self::new();
        hasher.update(message);
        hasher.finalize()
    }

    /// Return result of hashing nothing.
    fn empty() -> Self::Digest {
        Self::new().finalize()
    }
}

/// Compact binary values that can be hashed in place.
///
/// A [Field] hashes as its type byte (name flag included) followed by everything after it,
/// even when it is an element of a uniform container. An [Array] or [Object] hashes as if it
/// were serialized on its own without a name, so a container hashes the same wherever it sits.
pub trait Hashable {
    /// Appends the hashed bytes of `self` to `hasher`.
    fn update_hasher<H: Hasher>(&self, hasher: &mut H);

    /// Hashes `self` on its own.
    fn digest<H: Hasher>(&self) -> H::Digest {
        let mut hasher = H::new();
        self.update_hasher(&mut hasher);
        hasher.finalize()
    }
}

impl Hashable for Field {
    fn update_hasher<H: Hasher>(&self, hasher: &mut H) {
        hasher.update(&[self.tag().as_u8()]);
        hasher.update(self.body());
    }
}

/// Hashes an unnamed container of the field's type.
fn update_container<H: Hasher>(field: &Field, hasher: &mut H) {
    hasher.update(&[field.field_type() as u8]);
    hasher.update(field.payload());
}

impl Hashable for Array {
    fn update_hasher<H: Hasher>(&self, hasher: &mut H) {
        update_container(self.as_field(), hasher);
    }
}

impl Hashable for Object {
    fn update_hasher<H: Hasher>(&self, hasher: &mut H) {
        update_container(self.as_field(), hasher);
    }
}
