//! A view of an array field.

use crate::{AccessError, Field, FieldIter};

/// An array: an ordered sequence of unnamed fields.
#[derive(Clone, PartialEq, Eq)]
pub struct Array {
    field: Field,
}

impl Array {
    /// Wraps a field already known to be an array.
    pub(crate) fn from_field(field: Field) -> Self {
        Self { field }
    }

    /// Returns the underlying field.
    pub fn as_field(&self) -> &Field {
        &self.field
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.field
            .container()
            .and_then(|(_, _, count)| count)
            .map_or(0, |count| count as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> FieldIter {
        self.field.children()
    }
}

impl TryFrom<Field> for Array {
    type Error = AccessError;

    fn try_from(field: Field) -> Result<Self, Self::Error> {
        if !field.field_type().is_array() {
            return Err(AccessError::Type);
        }
        Ok(Self { field })
    }
}

impl From<Array> for Field {
    fn from(array: Array) -> Self {
        array.field
    }
}

impl IntoIterator for &Array {
    type Item = Field;
    type IntoIter = FieldIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
