//! Field kinds and the serialized type byte.
//!
//! A type byte holds a [FieldType] in its low five bits and the [HAS_FIELD_NAME] flag in its
//! high bit. The two bits in between are reserved and must be zero.

use crate::Error;
use std::fmt;

/// Flag set in a type byte when the field is followed by its name.
pub const HAS_FIELD_NAME: u8 = 0x80;

/// Bits of a type byte that must never be set.
const RESERVED_MASK: u8 = 0x60;

/// Bits of a type byte that select the [FieldType].
const TYPE_MASK: u8 = 0x1f;

/// The kind of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    None = 0x00,
    Null = 0x01,
    Object = 0x02,
    UniformObject = 0x03,
    Array = 0x04,
    UniformArray = 0x05,
    Binary = 0x06,
    String = 0x07,
    IntegerPositive = 0x08,
    IntegerNegative = 0x09,
    Float32 = 0x0a,
    Float64 = 0x0b,
    BoolFalse = 0x0c,
    BoolTrue = 0x0d,
    /// Hash of an object attachment.
    Reference = 0x0e,
    /// Hash of a binary attachment.
    BinaryReference = 0x0f,
    Hash = 0x10,
    Uuid = 0x11,
    /// Ticks of 100ns since `0001-01-01T00:00:00Z`.
    DateTime = 0x12,
    /// Signed ticks of 100ns.
    TimeSpan = 0x13,
}

/// Payload size of [FieldType::Reference], [FieldType::BinaryReference], and [FieldType::Hash].
pub const HASH_SIZE: usize = 32;

impl FieldType {
    /// Returns the kind numbered `value`, if any.
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::None,
            0x01 => Self::Null,
            0x02 => Self::Object,
            0x03 => Self::UniformObject,
            0x04 => Self::Array,
            0x05 => Self::UniformArray,
            0x06 => Self::Binary,
            0x07 => Self::String,
            0x08 => Self::IntegerPositive,
            0x09 => Self::IntegerNegative,
            0x0a => Self::Float32,
            0x0b => Self::Float64,
            0x0c => Self::BoolFalse,
            0x0d => Self::BoolTrue,
            0x0e => Self::Reference,
            0x0f => Self::BinaryReference,
            0x10 => Self::Hash,
            0x11 => Self::Uuid,
            0x12 => Self::DateTime,
            0x13 => Self::TimeSpan,
            _ => return None,
        })
    }

    /// Returns the payload size of a fixed-size kind, or `None` for dynamic-size kinds.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::None | Self::Null | Self::BoolFalse | Self::BoolTrue => Some(0),
            Self::Float32 => Some(4),
            Self::Float64 | Self::DateTime | Self::TimeSpan => Some(8),
            Self::Uuid => Some(16),
            Self::Reference | Self::BinaryReference | Self::Hash => Some(HASH_SIZE),
            Self::Object
            | Self::UniformObject
            | Self::Array
            | Self::UniformArray
            | Self::Binary
            | Self::String
            | Self::IntegerPositive
            | Self::IntegerNegative => None,
        }
    }

    pub const fn is_object(self) -> bool {
        matches!(self, Self::Object | Self::UniformObject)
    }

    pub const fn is_array(self) -> bool {
        matches!(self, Self::Array | Self::UniformArray)
    }

    pub const fn is_container(self) -> bool {
        self.is_object() || self.is_array()
    }

    pub const fn is_uniform(self) -> bool {
        matches!(self, Self::UniformObject | Self::UniformArray)
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, Self::IntegerPositive | Self::IntegerNegative)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, Self::BoolFalse | Self::BoolTrue)
    }

    /// Returns `true` for references to object or binary attachments.
    pub const fn is_attachment(self) -> bool {
        matches!(self, Self::Reference | Self::BinaryReference)
    }

    /// Returns `true` for kinds with a [HASH_SIZE] payload.
    pub const fn is_hash(self) -> bool {
        matches!(self, Self::Reference | Self::BinaryReference | Self::Hash)
    }
}

/// A serialized type byte: a [FieldType] plus whether the field carries a name.
///
/// Two fields have the same effective type iff their tags are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    field_type: FieldType,
    named: bool,
}

impl Tag {
    /// Returns a tag for `field_type`, flagged as named if `named` is set.
    pub const fn new(field_type: FieldType, named: bool) -> Self {
        Self { field_type, named }
    }

    /// Parses a type byte.
    pub fn from_u8(byte: u8) -> Result<Self, Error> {
        if byte & RESERVED_MASK != 0 {
            return Err(Error::InvalidType(byte));
        }
        match FieldType::from_u8(byte & TYPE_MASK) {
            Some(field_type) => Ok(Self {
                field_type,
                named: byte & HAS_FIELD_NAME != 0,
            }),
            None => Err(Error::InvalidType(byte)),
        }
    }

    /// Returns the serialized type byte.
    pub const fn as_u8(self) -> u8 {
        let flag = if self.named { HAS_FIELD_NAME } else { 0 };
        self.field_type as u8 | flag
    }

    pub const fn field_type(self) -> FieldType {
        self.field_type
    }

    /// Returns `true` if a name follows the type byte.
    pub const fn has_name(self) -> bool {
        self.named
    }

    /// Returns this tag with the name flag set.
    pub const fn with_name(self) -> Self {
        Self::new(self.field_type, true)
    }

    /// Returns this tag with the name flag cleared.
    pub const fn without_name(self) -> Self {
        Self::new(self.field_type, false)
    }

    /// Returns `true` if a field with this tag and no type byte occupies zero bytes.
    ///
    /// Such a tag can never be shared by the elements of a uniform container.
    pub const fn is_zero_size(self) -> bool {
        !self.named && matches!(self.field_type.fixed_size(), Some(0))
    }
}

impl From<FieldType> for Tag {
    fn from(field_type: FieldType) -> Self {
        Self::new(field_type, false)
    }
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte)
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        tag.as_u8()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.named {
            write!(f, "{:?}+Name", self.field_type)
        } else {
            write!(f, "{:?}", self.field_type)
        }
    }
}
