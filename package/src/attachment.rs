//! Content-addressed payloads carried alongside a package's root object.

use bytes::Bytes;
use compactbin_codec::Object;
use compactbin_cryptography::{Blake3, Hashable, Hasher};
use std::fmt;

/// The payload of an [Attachment].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// An opaque blob, hashed as its raw bytes.
    Binary(Bytes),
    /// A standalone object, hashed as an unnamed object (type byte included).
    Object(Object),
}

impl Body {
    /// Hashes this body.
    pub(crate) fn digest<H: Hasher>(&self) -> H::Digest {
        match self {
            Self::Binary(data) => H::hash(data),
            Self::Object(object) => object.digest::<H>(),
        }
    }
}

/// A binary blob or object identified by its content hash.
pub struct Attachment<H: Hasher = Blake3> {
    body: Body,
    hash: H::Digest,
}

impl<H: Hasher> Attachment<H> {
    /// Creates a binary attachment.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = H::hash(&data);
        Self {
            body: Body::Binary(data),
            hash,
        }
    }

    /// Creates an object attachment. The object is stored unnamed, with its own type byte.
    pub fn object(object: &Object) -> Self {
        let hash = object.digest::<H>();
        Self {
            body: Body::Object(object.to_standalone()),
            hash,
        }
    }

    /// Pairs a body with a hash that has already been verified.
    pub(crate) fn from_parts(body: Body, hash: H::Digest) -> Self {
        Self { body, hash }
    }

    pub fn hash(&self) -> H::Digest {
        self.hash
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.body, Body::Binary(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.body, Body::Object(_))
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Binary(data) => Some(data),
            Body::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match &self.body {
            Body::Object(object) => Some(object),
            Body::Binary(_) => None,
        }
    }
}

impl<H: Hasher> Clone for Attachment<H> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            hash: self.hash,
        }
    }
}

impl<H: Hasher> PartialEq for Attachment<H> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.body == other.body
    }
}

impl<H: Hasher> Eq for Attachment<H> {}

impl<H: Hasher> fmt::Debug for Attachment<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("hash", &self.hash)
            .field("body", &self.body)
            .finish()
    }
}
