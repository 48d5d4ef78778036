//! A view of an object field.

use crate::{AccessError, Field, FieldIter, Writer};

/// An object: a sequence of uniquely named fields.
#[derive(Clone, PartialEq, Eq)]
pub struct Object {
    field: Field,
}

impl Object {
    /// Wraps a field already known to be an object.
    pub(crate) fn from_field(field: Field) -> Self {
        Self { field }
    }

    /// Returns the underlying field.
    pub fn as_field(&self) -> &Field {
        &self.field
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn iter(&self) -> FieldIter {
        self.field.children()
    }

    /// Returns this object as an unnamed field that carries its own type byte.
    ///
    /// Named objects and elements of uniform containers are rewritten; anything else is
    /// returned as is.
    pub fn to_standalone(&self) -> Object {
        if self.field.is_embedded() && !self.field.has_name() {
            return self.clone();
        }
        let mut writer = Writer::new();
        writer.field(&self.field);
        Self::from_field(writer.save())
    }

    /// Returns the member named `name` (case-sensitive).
    pub fn find(&self, name: &str) -> Option<Field> {
        self.iter().find(|field| field.name() == name)
    }

    /// Returns the first member whose name matches `name`, ignoring ASCII case.
    pub fn find_ignore_case(&self, name: &str) -> Option<Field> {
        self.iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<Field> for Object {
    type Error = AccessError;

    fn try_from(field: Field) -> Result<Self, Self::Error> {
        if !field.field_type().is_object() {
            return Err(AccessError::Type);
        }
        Ok(Self { field })
    }
}

impl From<Object> for Field {
    fn from(object: Object) -> Self {
        object.field
    }
}

impl IntoIterator for &Object {
    type Item = Field;
    type IntoIter = FieldIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|field| (field.name().to_string(), field)))
            .finish()
    }
}
