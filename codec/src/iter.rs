//! Iteration over the children of a container.

use crate::{Field, Tag};
use bytes::{Buf, Bytes};

/// An iterator over consecutive fields in a shared buffer.
///
/// Each child is a zero-copy view; the iterator only advances a [Bytes] cursor.
#[derive(Clone, Debug, Default)]
pub struct FieldIter {
    remaining: Bytes,
    uniform: Option<Tag>,
}

impl FieldIter {
    /// Creates an iterator over `region`. When `uniform` is set, children have no type byte
    /// and share that tag.
    pub(crate) fn new(region: Bytes, uniform: Option<Tag>) -> Self {
        Self {
            remaining: region,
            uniform,
        }
    }

    /// Returns the tag shared by every child, if the container is uniform.
    pub fn uniform(&self) -> Option<Tag> {
        self.uniform
    }
}

impl Iterator for FieldIter {
    type Item = Field;

    fn next(&mut self) -> Option<Field> {
        if self.remaining.is_empty() {
            return None;
        }
        let field = Field::parse(self.remaining.clone(), self.uniform).ok()?;
        let size = field.as_bytes().len();
        if size == 0 {
            self.remaining.clear();
            return None;
        }
        self.remaining.advance(size);
        Some(field)
    }
}

impl std::iter::FusedIterator for FieldIter {}
