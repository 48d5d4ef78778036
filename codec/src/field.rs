//! A lazy, buffer-backed view of one field.
//!
//! A [Field] holds a reference-counted [Bytes] handle sliced to exactly its own bytes, so any
//! number of fields (and their children) may share one allocation without copying.

use crate::{
    codec::{EncodeSize, Write},
    field_type::HASH_SIZE,
    measure::measure_complete,
    validate::{validate, ValidateMode},
    varint, AccessError, Array, Error, FieldIter, FieldType, Limits, Object, Tag,
};
use bytes::{BufMut, Bytes};
use chrono::{DateTime, TimeDelta, Utc};
use compactbin_utils::{ticks_to_date_time, ticks_to_time_span};
use std::fmt;
use uuid::Uuid;

/// Largest integer magnitude that converts to `f32` without loss.
const F32_EXACT_LIMIT: u64 = 1 << f32::MANTISSA_DIGITS;

/// Largest integer magnitude that converts to `f64` without loss.
const F64_EXACT_LIMIT: u64 = 1 << f64::MANTISSA_DIGITS;

/// A typed, optionally named node of a compact binary tree.
///
/// Every field handed out by this crate has been validated (or produced by a
/// [Writer](crate::Writer)), so accessors never read out of bounds.
#[derive(Clone)]
pub struct Field {
    /// The field's bytes, starting at its type byte when `embedded`.
    buffer: Bytes,
    tag: Tag,
    embedded: bool,
    name_start: usize,
    payload_start: usize,
}

/// A borrowed, match-friendly view of a field's value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Bool(bool),
    /// Any integer that fits in an `i64`.
    Integer(i64),
    /// A positive integer larger than `i64::MAX`.
    UnsignedInteger(u64),
    Float32(f32),
    Float64(f64),
    Binary(&'a [u8]),
    String(&'a str),
    Array(Array),
    Object(Object),
    Reference([u8; HASH_SIZE]),
    BinaryReference([u8; HASH_SIZE]),
    Hash([u8; HASH_SIZE]),
    Uuid(Uuid),
    DateTime(i64),
    TimeSpan(i64),
}

impl Field {
    /// Validates `buffer` as exactly one field and returns a view of it.
    pub fn new(buffer: Bytes) -> Result<Self, Error> {
        Self::new_with_limits(buffer, &Limits::default())
    }

    /// Validates `buffer` as exactly one field under `limits` and returns a view of it.
    pub fn new_with_limits(buffer: Bytes, limits: &Limits) -> Result<Self, Error> {
        validate(&buffer, None, ValidateMode::all(), limits)?;
        Self::parse(buffer, None)
    }

    /// Returns a view of the field at the start of `buffer` without validating its contents.
    ///
    /// `buffer` is sliced to the measured size of the field.
    pub(crate) fn parse(buffer: Bytes, external: Option<Tag>) -> Result<Self, Error> {
        let (tag, size) = measure_complete(&buffer, external)?;
        let buffer = buffer.slice(..size);
        let mut offset = usize::from(external.is_none());
        let name_start = if tag.has_name() {
            let (len, len_size) = varint::read(&buffer[offset..])?;
            let start = offset + len_size;
            offset = start + len as usize;
            start
        } else {
            offset
        };
        Ok(Self {
            buffer,
            tag,
            embedded: external.is_none(),
            name_start,
            payload_start: offset,
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn field_type(&self) -> FieldType {
        self.tag.field_type()
    }

    pub fn has_name(&self) -> bool {
        self.tag.has_name()
    }

    /// Returns the field's name, or `""` if it has none.
    pub fn name(&self) -> &str {
        if !self.tag.has_name() {
            return "";
        }
        std::str::from_utf8(&self.buffer[self.name_start..self.payload_start]).unwrap_or_default()
    }

    /// Returns the payload: everything after the type byte and name.
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.payload_start..]
    }

    /// Returns `true` if the field's bytes start with its own type byte.
    ///
    /// Elements of uniform containers take their type from the container instead.
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Returns the bytes this view covers (excluding the type byte when not embedded).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the shared buffer this view covers.
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Returns the bytes after the type byte: the name (if any) and the payload.
    pub fn body(&self) -> &[u8] {
        &self.buffer[usize::from(self.embedded)..]
    }

    /// Iterates the children of an array or object. Other fields have no children.
    pub fn children(&self) -> FieldIter {
        match self.container() {
            Some((region, uniform, _)) => FieldIter::new(region, uniform),
            None => FieldIter::default(),
        }
    }

    /// Locates the children region of a container: its bytes, shared child tag, and element
    /// count (arrays only).
    pub(crate) fn container(&self) -> Option<(Bytes, Option<Tag>, Option<u64>)> {
        let field_type = self.field_type();
        if !field_type.is_container() {
            return None;
        }
        let payload = self.payload();
        let (_, mut offset) = varint::read(payload).ok()?;
        let mut count = None;
        if field_type.is_array() {
            let (value, len) = varint::read(&payload[offset..]).ok()?;
            count = Some(value);
            offset += len;
        }
        let mut uniform = None;
        if field_type.is_uniform() {
            uniform = Some(Tag::from_u8(*payload.get(offset)?).ok()?);
            offset += 1;
        }
        let region = self.buffer.slice(self.payload_start + offset..);
        Some((region, uniform, count))
    }

    /// Returns the value of the field for match-based access.
    pub fn value(&self) -> FieldValue<'_> {
        match self.field_type() {
            FieldType::None | FieldType::Null => FieldValue::Null,
            FieldType::BoolFalse => FieldValue::Bool(false),
            FieldType::BoolTrue => FieldValue::Bool(true),
            FieldType::IntegerPositive | FieldType::IntegerNegative => match self.as_i64() {
                Ok(value) => FieldValue::Integer(value),
                Err(_) => FieldValue::UnsignedInteger(self.magnitude().0),
            },
            FieldType::Float32 => FieldValue::Float32(self.read_f32()),
            FieldType::Float64 => FieldValue::Float64(self.read_f64()),
            FieldType::Binary => FieldValue::Binary(self.sized_payload()),
            FieldType::String => FieldValue::String(self.as_str().unwrap_or_default()),
            FieldType::Object | FieldType::UniformObject => {
                FieldValue::Object(Object::from_field(self.clone()))
            }
            FieldType::Array | FieldType::UniformArray => {
                FieldValue::Array(Array::from_field(self.clone()))
            }
            FieldType::Reference => FieldValue::Reference(self.read_hash()),
            FieldType::BinaryReference => FieldValue::BinaryReference(self.read_hash()),
            FieldType::Hash => FieldValue::Hash(self.read_hash()),
            FieldType::Uuid => FieldValue::Uuid(self.read_uuid()),
            FieldType::DateTime => FieldValue::DateTime(self.read_i64()),
            FieldType::TimeSpan => FieldValue::TimeSpan(self.read_i64()),
        }
    }

    pub fn as_object(&self) -> Result<Object, AccessError> {
        Object::try_from(self.clone())
    }

    pub fn as_array(&self) -> Result<Array, AccessError> {
        Array::try_from(self.clone())
    }

    /// Returns the bytes of a binary field.
    pub fn as_binary(&self) -> Result<&[u8], AccessError> {
        self.expect_type(FieldType::Binary)?;
        Ok(self.sized_payload())
    }

    /// Returns the bytes of a binary field as a zero-copy slice of the shared buffer.
    pub fn as_binary_bytes(&self) -> Result<Bytes, AccessError> {
        let len = self.as_binary()?.len();
        let end = self.buffer.len();
        Ok(self.buffer.slice(end - len..))
    }

    pub fn as_str(&self) -> Result<&str, AccessError> {
        self.expect_type(FieldType::String)?;
        std::str::from_utf8(self.sized_payload()).map_err(|_| AccessError::Type)
    }

    pub fn as_bool(&self) -> Result<bool, AccessError> {
        match self.field_type() {
            FieldType::BoolTrue => Ok(true),
            FieldType::BoolFalse => Ok(false),
            _ => Err(AccessError::Type),
        }
    }

    /// Returns a single-precision float.
    ///
    /// Integers are accepted when they convert exactly. A `Float64` field is always a range
    /// error, even when its value would fit.
    pub fn as_f32(&self) -> Result<f32, AccessError> {
        match self.field_type() {
            FieldType::Float32 => Ok(self.read_f32()),
            FieldType::Float64 => Err(AccessError::Range),
            FieldType::IntegerPositive | FieldType::IntegerNegative => {
                let (magnitude, negative) = self.magnitude();
                if magnitude >= F32_EXACT_LIMIT - u64::from(negative) {
                    return Err(AccessError::Range);
                }
                Ok(if negative {
                    -(magnitude as f32) - 1.0
                } else {
                    magnitude as f32
                })
            }
            _ => Err(AccessError::Type),
        }
    }

    /// Returns a double-precision float. Integers are accepted when they convert exactly.
    pub fn as_f64(&self) -> Result<f64, AccessError> {
        match self.field_type() {
            FieldType::Float32 => Ok(f64::from(self.read_f32())),
            FieldType::Float64 => Ok(self.read_f64()),
            FieldType::IntegerPositive | FieldType::IntegerNegative => {
                let (magnitude, negative) = self.magnitude();
                if magnitude >= F64_EXACT_LIMIT - u64::from(negative) {
                    return Err(AccessError::Range);
                }
                Ok(if negative {
                    -(magnitude as f64) - 1.0
                } else {
                    magnitude as f64
                })
            }
            _ => Err(AccessError::Type),
        }
    }

    /// Returns the hash of an object attachment.
    pub fn as_reference(&self) -> Result<[u8; HASH_SIZE], AccessError> {
        self.expect_type(FieldType::Reference)?;
        Ok(self.read_hash())
    }

    /// Returns the hash of a binary attachment.
    pub fn as_binary_reference(&self) -> Result<[u8; HASH_SIZE], AccessError> {
        self.expect_type(FieldType::BinaryReference)?;
        Ok(self.read_hash())
    }

    /// Returns the hash of an object or binary attachment.
    pub fn as_attachment(&self) -> Result<[u8; HASH_SIZE], AccessError> {
        if !self.field_type().is_attachment() {
            return Err(AccessError::Type);
        }
        Ok(self.read_hash())
    }

    /// Returns the payload of any hash-sized field: a plain hash or either kind of reference.
    pub fn as_hash(&self) -> Result<[u8; HASH_SIZE], AccessError> {
        if !self.field_type().is_hash() {
            return Err(AccessError::Type);
        }
        Ok(self.read_hash())
    }

    pub fn as_uuid(&self) -> Result<Uuid, AccessError> {
        self.expect_type(FieldType::Uuid)?;
        Ok(self.read_uuid())
    }

    pub fn as_date_time_ticks(&self) -> Result<i64, AccessError> {
        self.expect_type(FieldType::DateTime)?;
        Ok(self.read_i64())
    }

    /// Returns a date-time, or [AccessError::Range] if its ticks are not representable.
    pub fn as_date_time(&self) -> Result<DateTime<Utc>, AccessError> {
        ticks_to_date_time(self.as_date_time_ticks()?).ok_or(AccessError::Range)
    }

    pub fn as_time_span_ticks(&self) -> Result<i64, AccessError> {
        self.expect_type(FieldType::TimeSpan)?;
        Ok(self.read_i64())
    }

    pub fn as_time_span(&self) -> Result<TimeDelta, AccessError> {
        Ok(ticks_to_time_span(self.as_time_span_ticks()?))
    }

    /// Calls `visitor` with every attachment reference in this field, including itself, in
    /// encoding order.
    pub fn visit_attachments(&self, visitor: &mut impl FnMut(&Field)) {
        if self.field_type().is_attachment() {
            visitor(self);
        }
        for child in self.children() {
            child.visit_attachments(visitor);
        }
    }

    fn expect_type(&self, field_type: FieldType) -> Result<(), AccessError> {
        if self.field_type() != field_type {
            return Err(AccessError::Type);
        }
        Ok(())
    }

    /// Returns the integer magnitude and whether it is negative.
    ///
    /// A negative integer stores the ones' complement of its value.
    fn magnitude(&self) -> (u64, bool) {
        let magnitude = varint::read(self.payload()).map_or(0, |(value, _)| value);
        (
            magnitude,
            self.field_type() == FieldType::IntegerNegative,
        )
    }

    /// Returns the bytes after the length prefix of a binary or string payload.
    fn sized_payload(&self) -> &[u8] {
        let payload = self.payload();
        match varint::read(payload) {
            Ok((_, len_size)) => &payload[len_size..],
            Err(_) => &[],
        }
    }

    fn read_array<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        let payload = self.payload();
        let len = N.min(payload.len());
        out[..len].copy_from_slice(&payload[..len]);
        out
    }

    fn read_f32(&self) -> f32 {
        f32::from_be_bytes(self.read_array())
    }

    fn read_f64(&self) -> f64 {
        f64::from_be_bytes(self.read_array())
    }

    fn read_i64(&self) -> i64 {
        i64::from_be_bytes(self.read_array())
    }

    fn read_hash(&self) -> [u8; HASH_SIZE] {
        self.read_array()
    }

    fn read_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.read_array())
    }
}

// Implements range-checked integer accessors.
macro_rules! impl_unsigned {
    ($name:ident, $type:ty) => {
        #[doc = concat!("Returns the value as `", stringify!($type), "`, rejecting negatives.")]
        pub fn $name(&self) -> Result<$type, AccessError> {
            if !self.field_type().is_integer() {
                return Err(AccessError::Type);
            }
            let (magnitude, negative) = self.magnitude();
            if negative {
                return Err(AccessError::Range);
            }
            <$type>::try_from(magnitude).map_err(|_| AccessError::Range)
        }
    };
}

macro_rules! impl_signed {
    ($name:ident, $type:ty) => {
        #[doc = concat!("Returns the value as `", stringify!($type), "`.")]
        pub fn $name(&self) -> Result<$type, AccessError> {
            if !self.field_type().is_integer() {
                return Err(AccessError::Type);
            }
            let (magnitude, negative) = self.magnitude();
            if magnitude >> (<$type>::BITS - 1) != 0 {
                return Err(AccessError::Range);
            }
            let value = magnitude as $type;
            Ok(if negative { !value } else { value })
        }
    };
}

impl Field {
    impl_unsigned!(as_u8, u8);
    impl_unsigned!(as_u16, u16);
    impl_unsigned!(as_u32, u32);
    impl_unsigned!(as_u64, u64);
    impl_signed!(as_i8, i8);
    impl_signed!(as_i16, i16);
    impl_signed!(as_i32, i32);
    impl_signed!(as_i64, i64);
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.body() == other.body()
    }
}

impl Eq for Field {}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("tag", &self.tag)
            .field("name", &self.name())
            .field("size", &self.encode_size())
            .finish()
    }
}

impl Write for Field {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.tag.as_u8());
        buf.put_slice(self.body());
    }
}

impl EncodeSize for Field {
    fn encode_size(&self) -> usize {
        1 + self.body().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writer;

    fn single(write: impl FnOnce(&mut Writer)) -> Field {
        let mut writer = Writer::new();
        write(&mut writer);
        writer.save()
    }

    #[test]
    fn test_unsigned_ranges() {
        let field = single(|w| {
            w.integer_u64(255);
        });
        assert_eq!(field.as_u8(), Ok(255));
        assert_eq!(field.as_i8(), Err(AccessError::Range));
        assert_eq!(field.as_i16(), Ok(255));

        let field = single(|w| {
            w.integer_u64(u64::MAX);
        });
        assert_eq!(field.as_u64(), Ok(u64::MAX));
        assert_eq!(field.as_u32(), Err(AccessError::Range));
        assert_eq!(field.as_i64(), Err(AccessError::Range));
        assert_eq!(field.value(), FieldValue::UnsignedInteger(u64::MAX));
    }

    #[test]
    fn test_signed_ranges() {
        let field = single(|w| {
            w.integer_i64(-128);
        });
        assert_eq!(field.field_type(), FieldType::IntegerNegative);
        assert_eq!(field.payload(), &[0x7f]);
        assert_eq!(field.as_i8(), Ok(-128));
        assert_eq!(field.as_u8(), Err(AccessError::Range));
        assert_eq!(field.as_u64(), Err(AccessError::Range));

        let field = single(|w| {
            w.integer_i64(-129);
        });
        assert_eq!(field.as_i8(), Err(AccessError::Range));
        assert_eq!(field.as_i16(), Ok(-129));

        let field = single(|w| {
            w.integer_i64(i64::MIN);
        });
        assert_eq!(field.as_i64(), Ok(i64::MIN));
        assert_eq!(field.as_i32(), Err(AccessError::Range));
        assert_eq!(field.value(), FieldValue::Integer(i64::MIN));

        let field = single(|w| {
            w.integer_i64(i64::MAX);
        });
        assert_eq!(field.as_i64(), Ok(i64::MAX));
        assert_eq!(field.as_u64(), Ok(i64::MAX as u64));
    }

    #[test]
    fn test_float_from_integer() {
        let field = single(|w| {
            w.integer_u64((1 << 24) - 1);
        });
        assert_eq!(field.as_f32(), Ok(16_777_215.0));
        let field = single(|w| {
            w.integer_u64(1 << 24);
        });
        assert_eq!(field.as_f32(), Err(AccessError::Range));
        assert_eq!(field.as_f64(), Ok(16_777_216.0));

        let field = single(|w| {
            w.integer_i64(-(1 << 24));
        });
        assert_eq!(field.as_f32(), Err(AccessError::Range));
        let field = single(|w| {
            w.integer_i64(-(1 << 24) + 1);
        });
        assert_eq!(field.as_f32(), Ok(-16_777_215.0));

        let field = single(|w| {
            w.integer_u64(1 << 53);
        });
        assert_eq!(field.as_f64(), Err(AccessError::Range));
        let field = single(|w| {
            w.integer_i64(-(1 << 53) + 1);
        });
        assert_eq!(field.as_f64(), Ok(-9_007_199_254_740_991.0));
    }

    #[test]
    fn test_float_widths() {
        let field = single(|w| {
            w.float64(0.1);
        });
        assert_eq!(field.field_type(), FieldType::Float64);
        assert_eq!(field.as_f64(), Ok(0.1));
        assert_eq!(field.as_f32(), Err(AccessError::Range));

        let field = single(|w| {
            w.float32(0.5);
        });
        assert_eq!(field.as_f32(), Ok(0.5));
        assert_eq!(field.as_f64(), Ok(0.5));
    }

    #[test]
    fn test_type_errors() {
        let field = single(|w| {
            w.string("text");
        });
        assert_eq!(field.as_str(), Ok("text"));
        assert_eq!(field.as_u8(), Err(AccessError::Type));
        assert_eq!(field.as_f64(), Err(AccessError::Type));
        assert_eq!(field.as_bool(), Err(AccessError::Type));
        assert_eq!(field.as_binary(), Err(AccessError::Type));
        assert_eq!(field.as_uuid(), Err(AccessError::Type));
        assert!(field.as_object().is_err());
        assert!(field.as_array().is_err());
    }

    #[test]
    fn test_hash_kinds() {
        let hash = [7u8; HASH_SIZE];
        let reference = single(|w| {
            w.reference(hash);
        });
        let binary_reference = single(|w| {
            w.binary_reference(hash);
        });
        let plain = single(|w| {
            w.hash(hash);
        });

        assert_eq!(reference.as_reference(), Ok(hash));
        assert_eq!(reference.as_binary_reference(), Err(AccessError::Type));
        assert_eq!(binary_reference.as_binary_reference(), Ok(hash));
        assert_eq!(binary_reference.as_attachment(), Ok(hash));
        assert_eq!(plain.as_attachment(), Err(AccessError::Type));
        for field in [&reference, &binary_reference, &plain] {
            assert_eq!(field.as_hash(), Ok(hash));
        }
    }

    #[test]
    fn test_binary_zero_copy() {
        let field = single(|w| {
            w.binary(&[1, 2, 3]);
        });
        assert_eq!(field.as_binary(), Ok(&[1u8, 2, 3][..]));
        let bytes = field.as_binary_bytes().unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3]);
        assert_eq!(
            bytes.as_ptr(),
            field.as_bytes()[field.as_bytes().len() - 3..].as_ptr()
        );
    }

    #[test]
    fn test_date_time_and_time_span() {
        let field = single(|w| {
            w.date_time_ticks(compactbin_utils::UNIX_EPOCH_TICKS);
        });
        assert_eq!(
            field.as_date_time(),
            Ok(DateTime::from_timestamp(0, 0).unwrap())
        );
        let field = single(|w| {
            w.date_time_ticks(i64::MIN);
        });
        assert_eq!(field.as_date_time(), Err(AccessError::Range));

        let field = single(|w| {
            w.time_span_ticks(-10);
        });
        assert_eq!(field.as_time_span(), Ok(TimeDelta::microseconds(-1)));
        assert_eq!(field.as_date_time_ticks(), Err(AccessError::Type));
    }

    #[test]
    fn test_equality_ignores_sharing() {
        let a = single(|w| {
            w.string("same");
        });
        let b = single(|w| {
            w.string("same");
        });
        let c = single(|w| {
            w.string("diff");
        });
        assert_eq!(a, b);
        assert_ne!(a, c);

        // Same payload, different type
        let d = single(|w| {
            w.integer_u64(1);
        });
        let e = single(|w| {
            w.integer_i64(-2);
        });
        assert_eq!(d.payload(), e.payload());
        assert_ne!(d, e);
    }

    #[test]
    fn test_encode_adds_type_byte() {
        use crate::Encode;

        let mut writer = Writer::new();
        writer.begin_array();
        writer.integer_u64(1);
        writer.integer_u64(2);
        writer.end_array();
        let array = writer.save().as_array().unwrap();

        // Elements of a uniform array carry no type byte
        let first = array.iter().next().unwrap();
        assert!(!first.is_embedded());
        assert_eq!(first.as_bytes(), &[1]);
        assert_eq!(&first.encode()[..], &[FieldType::IntegerPositive as u8, 1]);
        assert_eq!(first, Field::new(first.encode().freeze()).unwrap());
    }
}
