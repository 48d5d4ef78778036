//! A root object bundled with hash-verified attachments.

use crate::{
    attachment::{Attachment, Body},
    Config, Error,
};
use bytes::{BufMut, Bytes};
use compactbin_codec::{
    load as load_field, load_bytes, varint, EncodeSize, Field, FieldType, Object, Write,
    HASH_SIZE,
};
use compactbin_cryptography::{Blake3, Hashable, Hasher};
use rayon::prelude::*;
use std::{fmt, io};
use tracing::{debug, warn};

/// A package: an optional root object plus attachments, each verified against its hash.
///
/// Serialized, a package is a sequence of unnamed fields:
///
/// ```text
/// [Object root][Reference: hash(root)]              (only with a root object)
/// ([Binary data][BinaryReference: hash(data)] | [Object object][Hash: hash(object)])*
/// [Null]
/// ```
///
/// Attachments are kept sorted by hash, so the encoding does not depend on the order they
/// were added in.
///
/// # Compatibility
///
/// Object attachments are tagged with a plain [FieldType::Hash] and only the root object with
/// [FieldType::Reference] (type byte `0x0e`). Existing encoders of this format tag every object
/// attachment with `0x0e`, their object attachment type. Their packages with object attachments
/// do not load here: an object after the first one followed by `0x0e` fails with
/// [Error::MissingHash]. Readers that expect that tagging will not accept the `Hash` written
/// here after an object attachment either.
pub struct Package<H: Hasher = Blake3> {
    object: Option<(Object, H::Digest)>,
    attachments: Vec<Attachment<H>>,
}

/// A body read from a stream, along with the hash it claims to have.
struct Unverified<H: Hasher> {
    body: Body,
    declared: H::Digest,
}

impl<H: Hasher> Unverified<H> {
    fn verify(&self) -> Result<(), Error> {
        let computed = self.body.digest::<H>();
        if computed != self.declared {
            return Err(Error::HashMismatch {
                declared: self.declared.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }
}

impl<H: Hasher> Default for Package<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Hasher> Package<H> {
    pub fn new() -> Self {
        Self {
            object: None,
            attachments: Vec::new(),
        }
    }

    /// Creates a package with `object` as its root.
    pub fn with_object(object: &Object) -> Self {
        let mut package = Self::new();
        package.set_object(object);
        package
    }

    /// Replaces the root object. It is stored unnamed, with its own type byte.
    pub fn set_object(&mut self, object: &Object) {
        let hash = object.digest::<H>();
        self.object = Some((object.to_standalone(), hash));
    }

    pub fn object(&self) -> Option<&Object> {
        self.object.as_ref().map(|(object, _)| object)
    }

    pub fn object_hash(&self) -> Option<H::Digest> {
        self.object.as_ref().map(|(_, hash)| *hash)
    }

    /// Adds an attachment, returning `false` if one with the same hash is already present.
    pub fn add_attachment(&mut self, attachment: Attachment<H>) -> bool {
        match self.position(&attachment.hash()) {
            Ok(_) => false,
            Err(index) => {
                self.attachments.insert(index, attachment);
                true
            }
        }
    }

    pub fn find_attachment(&self, hash: &H::Digest) -> Option<&Attachment<H>> {
        self.position(hash).ok().map(|index| &self.attachments[index])
    }

    /// Returns the attachments, sorted by hash.
    pub fn attachments(&self) -> &[Attachment<H>] {
        &self.attachments
    }

    fn position(&self, hash: &H::Digest) -> Result<usize, usize> {
        self.attachments
            .binary_search_by(|attachment| attachment.hash().cmp(hash))
    }

    /// Writes the package to `out`.
    pub fn save(&self, out: &mut impl io::Write) -> Result<(), Error> {
        let mut buffer = Vec::with_capacity(self.encode_size());
        self.write(&mut buffer);
        out.write_all(&buffer)?;
        debug!(
            size = buffer.len(),
            attachments = self.attachments.len(),
            "saved package"
        );
        Ok(())
    }

    /// Reads and verifies a package from `reader`.
    ///
    /// Reading stops at the terminating `Null` field. If any field is malformed or out of
    /// place, or any hash does not match its payload, the whole package is rejected.
    pub fn load(reader: &mut impl io::Read, cfg: &Config) -> Result<Self, Error> {
        Self::parse(|| load_field(reader, &cfg.limits), cfg)
            .inspect_err(|err| warn!(?err, "rejected package"))
    }

    /// Reads and verifies a package that must span all of `bytes`.
    pub fn decode(mut bytes: Bytes, cfg: &Config) -> Result<Self, Error> {
        let package = Self::parse(|| load_bytes(&mut bytes, &cfg.limits), cfg)
            .inspect_err(|err| warn!(?err, "rejected package"))?;
        if !bytes.is_empty() {
            warn!(remaining = bytes.len(), "rejected package with trailing data");
            return Err(compactbin_codec::Error::ExtraData(bytes.len()).into());
        }
        Ok(package)
    }

    fn parse(
        mut next: impl FnMut() -> Result<Field, compactbin_codec::Error>,
        cfg: &Config,
    ) -> Result<Self, Error> {
        let mut object = None;
        let mut pending: Vec<Unverified<H>> = Vec::new();
        loop {
            let field = next_unnamed(&mut next)?;
            let field_type = field.field_type();
            let body = match field_type {
                FieldType::Null => break,
                FieldType::Binary => Body::Binary(field.as_binary_bytes().unwrap_or_default()),
                FieldType::Object | FieldType::UniformObject => Body::Object(
                    field
                        .as_object()
                        .map_err(|_| Error::UnexpectedField(field_type))?,
                ),
                other => return Err(Error::UnexpectedField(other)),
            };

            // Only the first object of a stream may be the root
            let first = object.is_none() && pending.is_empty();
            let hash = next_unnamed(&mut next)?;
            let is_root = match (&body, hash.field_type()) {
                (Body::Binary(_), FieldType::BinaryReference) => false,
                (Body::Object(_), FieldType::Hash) => false,
                (Body::Object(_), FieldType::Reference) if first => true,
                _ => return Err(Error::MissingHash(field_type)),
            };
            let declared = H::Digest::from(read_hash(&hash)?);
            let unverified = Unverified { body, declared };
            if !is_root {
                pending.push(unverified);
                continue;
            }
            unverified.verify()?;
            if let Body::Object(root) = unverified.body {
                object = Some((root, declared));
            }
        }

        // Check every attachment before keeping any of them
        if cfg.parallel_verify {
            pending.par_iter().try_for_each(Unverified::verify)?;
        } else {
            pending.iter().try_for_each(Unverified::verify)?;
        }
        let mut package = Self {
            object,
            attachments: Vec::with_capacity(pending.len()),
        };
        for Unverified { body, declared } in pending {
            if !package.add_attachment(Attachment::from_parts(body, declared)) {
                return Err(Error::DuplicateAttachment(declared.to_string()));
            }
        }
        debug!(
            root = package.object.is_some(),
            attachments = package.attachments.len(),
            "loaded package"
        );
        Ok(package)
    }
}

/// Reads the next field, rejecting names: every field in a package stream is unnamed.
fn next_unnamed(
    next: &mut impl FnMut() -> Result<Field, compactbin_codec::Error>,
) -> Result<Field, Error> {
    let field = next()?;
    if field.has_name() {
        return Err(Error::UnexpectedName(field.name().to_string()));
    }
    Ok(field)
}

fn read_hash(field: &Field) -> Result<[u8; HASH_SIZE], Error> {
    field
        .as_hash()
        .map_err(|_| Error::UnexpectedField(field.field_type()))
}

fn write_hash(buf: &mut impl BufMut, field_type: FieldType, hash: impl Into<[u8; HASH_SIZE]>) {
    buf.put_u8(field_type as u8);
    buf.put_slice(&hash.into());
}

impl<H: Hasher> Write for Package<H> {
    fn write(&self, buf: &mut impl BufMut) {
        if let Some((object, hash)) = &self.object {
            object.as_field().write(buf);
            write_hash(buf, FieldType::Reference, *hash);
        }
        for attachment in &self.attachments {
            match attachment.body() {
                Body::Binary(data) => {
                    buf.put_u8(FieldType::Binary as u8);
                    varint::write(data.len() as u64, buf);
                    buf.put_slice(data);
                    write_hash(buf, FieldType::BinaryReference, attachment.hash());
                }
                Body::Object(object) => {
                    object.as_field().write(buf);
                    write_hash(buf, FieldType::Hash, attachment.hash());
                }
            }
        }
        buf.put_u8(FieldType::Null as u8);
    }
}

impl<H: Hasher> EncodeSize for Package<H> {
    fn encode_size(&self) -> usize {
        const HASH_FIELD: usize = 1 + HASH_SIZE;
        let root = self
            .object
            .as_ref()
            .map_or(0, |(object, _)| object.as_field().encode_size() + HASH_FIELD);
        let attachments: usize = self
            .attachments
            .iter()
            .map(|attachment| {
                let body = match attachment.body() {
                    Body::Binary(data) => 1 + varint::size(data.len() as u64) + data.len(),
                    Body::Object(object) => object.as_field().encode_size(),
                };
                body + HASH_FIELD
            })
            .sum();
        root + attachments + 1
    }
}

impl<H: Hasher> Clone for Package<H> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

impl<H: Hasher> PartialEq for Package<H> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object && self.attachments == other.attachments
    }
}

impl<H: Hasher> Eq for Package<H> {}

impl<H: Hasher> fmt::Debug for Package<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("object", &self.object)
            .field("attachments", &self.attachments)
            .finish()
    }
}
