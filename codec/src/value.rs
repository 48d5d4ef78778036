//! An owned, eagerly decoded field tree.

use crate::{field_type::HASH_SIZE, Field, FieldValue, Writer};
use bytes::Bytes;
use uuid::Uuid;

/// A field's value detached from any buffer.
///
/// Converting a [Value] to a [Field] goes through a [Writer], so the usual normalizations
/// apply: non-negative integers read back as [Value::Integer] and doubles that fit a float
/// read back as [Value::Float32].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    /// A positive integer larger than `i64::MAX`.
    UnsignedInteger(u64),
    Float32(f32),
    Float64(f64),
    Binary(Bytes),
    String(String),
    Array(Vec<Value>),
    /// Members in encoding order.
    Object(Vec<(String, Value)>),
    Reference([u8; HASH_SIZE]),
    BinaryReference([u8; HASH_SIZE]),
    Hash([u8; HASH_SIZE]),
    Uuid(Uuid),
    /// Ticks of 100ns since `0001-01-01T00:00:00Z`.
    DateTime(i64),
    /// Signed ticks of 100ns.
    TimeSpan(i64),
}

impl Value {
    /// Encodes this value as an unnamed field.
    pub fn to_field(&self) -> Field {
        let mut writer = Writer::new();
        writer.value(self);
        writer.save()
    }

    /// Returns the member named `name`, if this is an object.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl From<&Field> for Value {
    fn from(field: &Field) -> Self {
        match field.value() {
            FieldValue::Null => Self::Null,
            FieldValue::Bool(value) => Self::Bool(value),
            FieldValue::Integer(value) => Self::Integer(value),
            FieldValue::UnsignedInteger(value) => Self::UnsignedInteger(value),
            FieldValue::Float32(value) => Self::Float32(value),
            FieldValue::Float64(value) => Self::Float64(value),
            FieldValue::Binary(_) => Self::Binary(field.as_binary_bytes().unwrap_or_default()),
            FieldValue::String(value) => Self::String(value.to_string()),
            FieldValue::Array(array) => Self::Array(array.iter().map(|e| Self::from(&e)).collect()),
            FieldValue::Object(object) => Self::Object(
                object
                    .iter()
                    .map(|member| (member.name().to_string(), Self::from(&member)))
                    .collect(),
            ),
            FieldValue::Reference(hash) => Self::Reference(hash),
            FieldValue::BinaryReference(hash) => Self::BinaryReference(hash),
            FieldValue::Hash(hash) => Self::Hash(hash),
            FieldValue::Uuid(uuid) => Self::Uuid(uuid),
            FieldValue::DateTime(ticks) => Self::DateTime(ticks),
            FieldValue::TimeSpan(ticks) => Self::TimeSpan(ticks),
        }
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        Self::from(&field)
    }
}

impl From<&Value> for Field {
    fn from(value: &Value) -> Self {
        value.to_field()
    }
}
