//! Build a field tree depth-first.
//!
//! A [Writer] appends each field to one growing buffer. Containers reserve their type byte
//! when they begin and settle it when they end, once the writer knows whether every child
//! shared one tag (in which case the children are rewritten without their type bytes and the
//! container becomes uniform).
//!
//! Misusing the writer (ending the wrong container, naming a field twice, naming an array
//! element, leaving an object member unnamed, saving with open containers) is a bug in the
//! caller and panics.
//!
//! # Example
//!
//! ```
//! use compactbin_codec::{FieldType, Writer};
//!
//! let mut writer = Writer::new();
//! writer.begin_object();
//! writer.name("id").integer_u64(7);
//! writer.name("tags").begin_array();
//! writer.string("a").string("b");
//! writer.end_array();
//! writer.end_object();
//!
//! let object = writer.save().as_object().unwrap();
//! assert_eq!(object.find("id").unwrap().as_u64(), Ok(7));
//! let tags = object.find("tags").unwrap();
//! assert_eq!(tags.field_type(), FieldType::UniformArray);
//! ```

use crate::{
    field_type::HASH_SIZE, measure::measure_complete, value::Value, varint, Field, FieldType,
    Tag,
};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use compactbin_utils::{date_time_to_ticks, time_span_to_ticks};
use std::{collections::HashSet, io};
use uuid::Uuid;

/// The kind of an open container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Root,
    Object,
    Array,
}

/// The tag shared by the children written so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Uniform {
    Empty,
    Shared(Tag),
    Mixed,
}

impl Uniform {
    fn merge(self, tag: Tag) -> Self {
        match self {
            Self::Empty => Self::Shared(tag),
            Self::Shared(shared) if shared == tag => self,
            _ => Self::Mixed,
        }
    }
}

#[derive(Debug)]
struct Frame {
    kind: Kind,
    /// Offset of this container's reserved type byte.
    tag_offset: usize,
    /// Whether this container was named by its parent.
    named: bool,
    /// Offset of the first child.
    start: usize,
    count: u64,
    uniform: Uniform,
    /// Offset of the reserved type byte of a named child whose value is not yet written.
    pending: Option<usize>,
    /// Member names used so far (objects only).
    names: HashSet<String>,
}

impl Frame {
    fn root() -> Self {
        Self {
            kind: Kind::Root,
            tag_offset: 0,
            named: false,
            start: 0,
            count: 0,
            uniform: Uniform::Empty,
            pending: None,
            names: HashSet::new(),
        }
    }
}

/// Builds fields into an internal buffer.
#[derive(Debug)]
pub struct Writer {
    buffer: Vec<u8>,
    root: Frame,
    stack: Vec<Frame>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            root: Frame::root(),
            stack: Vec::new(),
        }
    }

    /// Discards everything written so far.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.root = Frame::root();
        self.stack.clear();
    }

    /// Names the next field.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty, if the next field is already named, if the open container
    /// is an array, or if the open object already has a member called `name`.
    pub fn name(&mut self, name: &str) -> &mut Self {
        let frame = self.stack.last_mut().unwrap_or(&mut self.root);
        assert!(frame.kind != Kind::Array, "array elements cannot be named");
        assert!(frame.pending.is_none(), "field is already named");
        assert!(!name.is_empty(), "field names must not be empty");
        if frame.kind == Kind::Object {
            assert!(
                frame.names.insert(name.to_string()),
                "duplicate field name: {name}"
            );
        }
        frame.pending = Some(self.buffer.len());
        self.buffer.push(0);
        varint::write(name.len() as u64, &mut self.buffer);
        self.buffer.extend_from_slice(name.as_bytes());
        self
    }

    pub fn null(&mut self) -> &mut Self {
        self.scalar(FieldType::Null, |_| {})
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        let field_type = if value {
            FieldType::BoolTrue
        } else {
            FieldType::BoolFalse
        };
        self.scalar(field_type, |_| {})
    }

    pub fn integer_i32(&mut self, value: i32) -> &mut Self {
        self.integer_i64(i64::from(value))
    }

    pub fn integer_u32(&mut self, value: u32) -> &mut Self {
        self.integer_u64(u64::from(value))
    }

    /// Writes a signed integer. Negative values store the ones' complement of the value.
    pub fn integer_i64(&mut self, value: i64) -> &mut Self {
        if value >= 0 {
            return self.integer_u64(value as u64);
        }
        self.scalar(FieldType::IntegerNegative, |buffer| {
            varint::write(!value as u64, buffer)
        })
    }

    pub fn integer_u64(&mut self, value: u64) -> &mut Self {
        self.scalar(FieldType::IntegerPositive, |buffer| {
            varint::write(value, buffer)
        })
    }

    pub fn float32(&mut self, value: f32) -> &mut Self {
        self.scalar(FieldType::Float32, |buffer| {
            buffer.extend_from_slice(&value.to_be_bytes())
        })
    }

    /// Writes a double, as a single-precision float when that loses nothing.
    pub fn float64(&mut self, value: f64) -> &mut Self {
        let narrow = value as f32;
        if f64::from(narrow) == value {
            return self.float32(narrow);
        }
        self.scalar(FieldType::Float64, |buffer| {
            buffer.extend_from_slice(&value.to_be_bytes())
        })
    }

    pub fn binary(&mut self, value: &[u8]) -> &mut Self {
        self.scalar(FieldType::Binary, |buffer| {
            varint::write(value.len() as u64, buffer);
            buffer.extend_from_slice(value);
        })
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.scalar(FieldType::String, |buffer| {
            varint::write(value.len() as u64, buffer);
            buffer.extend_from_slice(value.as_bytes());
        })
    }

    /// Writes UTF-16 text as a UTF-8 string. Unpaired surrogates become U+FFFD.
    pub fn string_utf16(&mut self, value: &[u16]) -> &mut Self {
        self.string(&String::from_utf16_lossy(value))
    }

    pub fn hash(&mut self, value: [u8; HASH_SIZE]) -> &mut Self {
        self.fixed(FieldType::Hash, &value)
    }

    /// Writes the hash of an object attachment.
    pub fn reference(&mut self, value: [u8; HASH_SIZE]) -> &mut Self {
        self.fixed(FieldType::Reference, &value)
    }

    /// Writes the hash of a binary attachment.
    pub fn binary_reference(&mut self, value: [u8; HASH_SIZE]) -> &mut Self {
        self.fixed(FieldType::BinaryReference, &value)
    }

    pub fn uuid(&mut self, value: Uuid) -> &mut Self {
        self.fixed(FieldType::Uuid, value.as_bytes())
    }

    pub fn date_time_ticks(&mut self, ticks: i64) -> &mut Self {
        self.fixed(FieldType::DateTime, &ticks.to_be_bytes())
    }

    /// # Panics
    ///
    /// Panics if `value` is not representable in ticks.
    pub fn date_time(&mut self, value: &DateTime<Utc>) -> &mut Self {
        let Some(ticks) = date_time_to_ticks(value) else {
            panic!("date-time {value} is not representable in ticks");
        };
        self.date_time_ticks(ticks)
    }

    pub fn time_span_ticks(&mut self, ticks: i64) -> &mut Self {
        self.fixed(FieldType::TimeSpan, &ticks.to_be_bytes())
    }

    /// # Panics
    ///
    /// Panics if `value` overflows the tick range.
    pub fn time_span(&mut self, value: &TimeDelta) -> &mut Self {
        let Some(ticks) = time_span_to_ticks(value) else {
            panic!("time span {value} is not representable in ticks");
        };
        self.time_span_ticks(ticks)
    }

    /// Copies an existing field.
    ///
    /// A pending name replaces the field's own name. Without one, the field keeps its name only
    /// when written into an object.
    pub fn field(&mut self, field: &Field) -> &mut Self {
        let frame = self.stack.last_mut().unwrap_or(&mut self.root);
        let inherit = frame.pending.is_none() && frame.kind == Kind::Object;
        if inherit && field.has_name() {
            self.name(field.name());
        }
        self.scalar(field.field_type(), |buffer| {
            buffer.extend_from_slice(field.payload())
        })
    }

    /// Writes an eager value tree.
    pub fn value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Null => self.null(),
            Value::Bool(value) => self.bool(*value),
            Value::Integer(value) => self.integer_i64(*value),
            Value::UnsignedInteger(value) => self.integer_u64(*value),
            Value::Float32(value) => self.float32(*value),
            Value::Float64(value) => self.float64(*value),
            Value::Binary(value) => self.binary(value),
            Value::String(value) => self.string(value),
            Value::Array(elements) => {
                self.begin_array();
                for element in elements {
                    self.value(element);
                }
                self.end_array()
            }
            Value::Object(members) => {
                self.begin_object();
                for (name, member) in members {
                    self.name(name).value(member);
                }
                self.end_object()
            }
            Value::Reference(value) => self.reference(*value),
            Value::BinaryReference(value) => self.binary_reference(*value),
            Value::Hash(value) => self.hash(*value),
            Value::Uuid(value) => self.uuid(*value),
            Value::DateTime(ticks) => self.date_time_ticks(*ticks),
            Value::TimeSpan(ticks) => self.time_span_ticks(*ticks),
        }
    }

    pub fn begin_object(&mut self) -> &mut Self {
        self.begin_container(Kind::Object)
    }

    /// # Panics
    ///
    /// Panics if the open container is not an object, or if its last member was named but
    /// never written.
    pub fn end_object(&mut self) -> &mut Self {
        self.end_container(Kind::Object)
    }

    pub fn begin_array(&mut self) -> &mut Self {
        self.begin_container(Kind::Array)
    }

    /// # Panics
    ///
    /// Panics if the open container is not an array.
    pub fn end_array(&mut self) -> &mut Self {
        self.end_container(Kind::Array)
    }

    /// Returns the size of everything written.
    ///
    /// # Panics
    ///
    /// Panics if a container is open or nothing was written.
    pub fn save_size(&self) -> usize {
        self.check_complete();
        self.buffer.len()
    }

    /// Returns the single field written at the top level.
    ///
    /// # Panics
    ///
    /// Panics if a container is open or the top level does not hold exactly one field.
    pub fn save(&self) -> Field {
        self.check_complete();
        assert_eq!(self.root.count, 1, "save requires exactly one top-level field");
        match Field::parse(Bytes::from(self.buffer.clone()), None) {
            Ok(field) => field,
            Err(err) => panic!("writer produced a malformed field: {err}"),
        }
    }

    /// Returns every top-level field written, back to back.
    ///
    /// # Panics
    ///
    /// Panics if a container is open or nothing was written.
    pub fn save_bytes(&self) -> Bytes {
        self.check_complete();
        Bytes::from(self.buffer.clone())
    }

    /// Copies every top-level field into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is not exactly [Writer::save_size] bytes long.
    pub fn save_to_slice(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.save_size(), "output must match the saved size");
        out.copy_from_slice(&self.buffer);
    }

    /// Writes every top-level field to `out`.
    ///
    /// # Panics
    ///
    /// Panics if a container is open or nothing was written.
    pub fn save_to(&self, out: &mut impl io::Write) -> io::Result<()> {
        self.check_complete();
        out.write_all(&self.buffer)
    }

    fn check_complete(&self) {
        assert!(
            self.stack.is_empty(),
            "cannot save with {} open container(s)",
            self.stack.len()
        );
        assert!(self.root.pending.is_none(), "field is named but has no value");
        assert!(self.root.count > 0, "nothing has been written");
    }

    /// Reserves the type byte of the next field (unless a name already did) and returns its
    /// offset and whether the field is named.
    fn begin_field(&mut self) -> (usize, bool) {
        let frame = self.stack.last_mut().unwrap_or(&mut self.root);
        if let Some(offset) = frame.pending.take() {
            return (offset, true);
        }
        assert!(frame.kind != Kind::Object, "object members must be named");
        let offset = self.buffer.len();
        self.buffer.push(0);
        (offset, false)
    }

    /// Settles the type byte of the field at `offset` and counts it in the open container.
    fn end_field(&mut self, offset: usize, tag: Tag) {
        self.buffer[offset] = tag.as_u8();
        let frame = self.stack.last_mut().unwrap_or(&mut self.root);
        frame.count += 1;
        frame.uniform = frame.uniform.merge(tag);
    }

    fn scalar(&mut self, field_type: FieldType, payload: impl FnOnce(&mut Vec<u8>)) -> &mut Self {
        let (offset, named) = self.begin_field();
        payload(&mut self.buffer);
        self.end_field(offset, Tag::new(field_type, named));
        self
    }

    fn fixed(&mut self, field_type: FieldType, payload: &[u8]) -> &mut Self {
        self.scalar(field_type, |buffer| buffer.extend_from_slice(payload))
    }

    fn begin_container(&mut self, kind: Kind) -> &mut Self {
        let (tag_offset, named) = self.begin_field();
        self.stack.push(Frame {
            kind,
            tag_offset,
            named,
            start: self.buffer.len(),
            count: 0,
            uniform: Uniform::Empty,
            pending: None,
            names: HashSet::new(),
        });
        self
    }

    fn end_container(&mut self, kind: Kind) -> &mut Self {
        let frame = match self.stack.pop() {
            Some(frame) if frame.kind == kind => frame,
            Some(frame) => panic!("cannot end {kind:?} while {:?} is open", frame.kind),
            None => panic!("cannot end {kind:?} with no open container"),
        };
        assert!(frame.pending.is_none(), "field is named but has no value");

        let children = self.buffer.split_off(frame.start);
        let uniform = match frame.uniform {
            Uniform::Shared(tag) if frame.count >= 2 && !tag.is_zero_size() => Some(tag),
            _ => None,
        };
        let children = match uniform {
            Some(_) => strip_tags(&children),
            None => children,
        };

        // Prefix the children with the payload size, the count, and the shared tag
        let mut size = children.len() + usize::from(uniform.is_some());
        if kind == Kind::Array {
            size += varint::size(frame.count);
        }
        varint::write(size as u64, &mut self.buffer);
        if kind == Kind::Array {
            varint::write(frame.count, &mut self.buffer);
        }
        if let Some(tag) = uniform {
            self.buffer.push(tag.as_u8());
        }
        self.buffer.extend_from_slice(&children);

        let field_type = match (kind, uniform.is_some()) {
            (Kind::Array, false) => FieldType::Array,
            (Kind::Array, true) => FieldType::UniformArray,
            (_, false) => FieldType::Object,
            (_, true) => FieldType::UniformObject,
        };
        self.end_field(frame.tag_offset, Tag::new(field_type, frame.named));
        self
    }
}

/// Rebuilds a run of embedded fields without their type bytes.
fn strip_tags(children: &[u8]) -> Vec<u8> {
    let mut stripped = Vec::with_capacity(children.len());
    let mut offset = 0;
    while offset < children.len() {
        let size = match measure_complete(&children[offset..], None) {
            Ok((_, size)) => size,
            Err(err) => panic!("writer produced a malformed child: {err}"),
        };
        stripped.extend_from_slice(&children[offset + 1..offset + size]);
        offset += size;
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{validate, Limits, ValidateMode, HAS_FIELD_NAME};

    const INT: u8 = FieldType::IntegerPositive as u8;

    fn saved(build: impl FnOnce(&mut Writer)) -> Field {
        let mut writer = Writer::new();
        build(&mut writer);
        let field = writer.save();
        validate(field.as_bytes(), None, ValidateMode::all(), &Limits::default()).unwrap();
        field
    }

    #[test]
    fn test_uniform_array() {
        let field = saved(|w| {
            w.begin_array();
            w.integer_u64(1).integer_u64(2).integer_u64(3);
            w.end_array();
        });
        assert_eq!(
            field.as_bytes(),
            &[FieldType::UniformArray as u8, 5, 3, INT, 1, 2, 3]
        );
        let values: Vec<_> = field.children().map(|child| child.as_u64()).collect();
        assert_eq!(values, vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[test]
    fn test_mixed_array() {
        let field = saved(|w| {
            w.begin_array();
            w.integer_u64(1).integer_i64(-1);
            w.end_array();
        });
        assert_eq!(
            field.as_bytes(),
            &[
                FieldType::Array as u8,
                5,
                2,
                INT,
                1,
                FieldType::IntegerNegative as u8,
                0
            ]
        );
    }

    #[test]
    fn test_single_child_is_not_uniform() {
        let field = saved(|w| {
            w.begin_array();
            w.integer_u64(9);
            w.end_array();
        });
        assert_eq!(field.as_bytes(), &[FieldType::Array as u8, 3, 1, INT, 9]);
    }

    #[test]
    fn test_zero_size_children_are_not_uniform() {
        let field = saved(|w| {
            w.begin_array();
            w.null().null();
            w.end_array();
        });
        assert_eq!(field.field_type(), FieldType::Array);
        assert_eq!(field.as_array().unwrap().len(), 2);

        // Named nulls carry their names, so they can share a tag
        let field = saved(|w| {
            w.begin_object();
            w.name("a").null();
            w.name("b").null();
            w.end_object();
        });
        assert_eq!(
            field.as_bytes(),
            &[
                FieldType::UniformObject as u8,
                5,
                FieldType::Null as u8 | HAS_FIELD_NAME,
                1,
                b'a',
                1,
                b'b'
            ]
        );
    }

    #[test]
    fn test_nested_containers() {
        let field = saved(|w| {
            w.begin_object();
            w.name("rows").begin_array();
            for row in 0..3u64 {
                w.begin_object();
                w.name("id").integer_u64(row);
                w.name("cells").begin_array();
                w.string("x").string("yy");
                w.end_array();
                w.end_object();
            }
            w.end_array();
            w.end_object();
        });

        let rows = field.as_object().unwrap().find("rows").unwrap();
        assert_eq!(rows.field_type(), FieldType::UniformArray);
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        for (index, row) in rows.iter().enumerate() {
            assert!(!row.is_embedded());
            let row = row.as_object().unwrap();
            assert_eq!(row.find("id").unwrap().as_u64(), Ok(index as u64));
            let cells: Vec<String> = row
                .find("cells")
                .unwrap()
                .children()
                .map(|cell| cell.as_str().unwrap().to_string())
                .collect();
            assert_eq!(cells, vec!["x", "yy"]);
        }
    }

    #[test]
    fn test_float_demotion() {
        let field = saved(|w| {
            w.float64(0.5);
        });
        assert_eq!(field.field_type(), FieldType::Float32);
        assert_eq!(field.as_f64(), Ok(0.5));

        let field = saved(|w| {
            w.float64(0.1);
        });
        assert_eq!(field.field_type(), FieldType::Float64);

        let field = saved(|w| {
            w.float64(f64::NAN);
        });
        assert_eq!(field.field_type(), FieldType::Float64);
        assert!(field.as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_strings() {
        let field = saved(|w| {
            w.string_utf16(&[0x0068, 0x00e9, 0xd83d, 0xde00]);
        });
        assert_eq!(field.as_str(), Ok("hé😀"));

        let field = saved(|w| {
            w.string_utf16(&[0xd800]);
        });
        assert_eq!(field.as_str(), Ok("\u{fffd}"));
    }

    #[test]
    fn test_named_root() {
        let field = saved(|w| {
            w.name("answer").integer_i32(-42);
        });
        assert_eq!(field.name(), "answer");
        assert_eq!(field.as_i32(), Ok(-42));
    }

    #[test]
    fn test_copy_field() {
        let source = saved(|w| {
            w.begin_object();
            w.name("kept").string("value");
            w.end_object();
        });
        let member = source.as_object().unwrap().find("kept").unwrap();

        // Inside an object, the field keeps its name
        let copied = saved(|w| {
            w.begin_object();
            w.field(&member);
            w.name("renamed").field(&member);
            w.end_object();
        });
        let object = copied.as_object().unwrap();
        assert_eq!(object.find("kept").unwrap().as_str(), Ok("value"));
        assert_eq!(object.find("renamed").unwrap().as_str(), Ok("value"));

        // At the top level it does not
        let copied = saved(|w| {
            w.field(&member);
        });
        assert!(!copied.has_name());
        assert_eq!(copied.as_str(), Ok("value"));
    }

    #[test]
    fn test_multiple_top_level_fields() {
        let mut writer = Writer::new();
        writer.integer_u64(1).null();
        assert_eq!(writer.save_size(), 3);
        assert_eq!(&writer.save_bytes()[..], &[INT, 1, FieldType::Null as u8]);

        let mut out = [0u8; 3];
        writer.save_to_slice(&mut out);
        assert_eq!(out, [INT, 1, FieldType::Null as u8]);

        let mut stream = Vec::new();
        writer.save_to(&mut stream).unwrap();
        assert_eq!(stream, out);

        writer.reset();
        writer.bool(true);
        assert_eq!(writer.save().as_bool(), Ok(true));
    }

    #[test]
    #[should_panic(expected = "open container")]
    fn test_save_with_open_container() {
        let mut writer = Writer::new();
        writer.begin_array();
        writer.save();
    }

    #[test]
    #[should_panic(expected = "exactly one top-level field")]
    fn test_save_with_two_fields() {
        let mut writer = Writer::new();
        writer.null().null();
        writer.save();
    }

    #[test]
    #[should_panic(expected = "nothing has been written")]
    fn test_save_empty() {
        Writer::new().save();
    }

    #[test]
    #[should_panic(expected = "cannot end Array")]
    fn test_mismatched_end() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.end_array();
    }

    #[test]
    #[should_panic(expected = "array elements cannot be named")]
    fn test_name_in_array() {
        let mut writer = Writer::new();
        writer.begin_array();
        writer.name("x");
    }

    #[test]
    #[should_panic(expected = "already named")]
    fn test_name_twice() {
        let mut writer = Writer::new();
        writer.name("a").name("b");
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_empty_name() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("");
    }

    #[test]
    #[should_panic(expected = "duplicate field name: a")]
    fn test_duplicate_name() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("a").integer_u64(1);
        writer.name("a").integer_u64(2);
    }

    #[test]
    fn test_same_name_in_sibling_objects() {
        let field = saved(|w| {
            w.begin_array();
            for value in 0..2u64 {
                w.begin_object();
                w.name("a").integer_u64(value);
                w.end_object();
            }
            w.end_array();
        });
        assert_eq!(field.as_array().unwrap().len(), 2);
    }

    #[test]
    #[should_panic(expected = "must be named")]
    fn test_unnamed_member() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.integer_u64(1);
    }

    #[test]
    #[should_panic(expected = "named but has no value")]
    fn test_dangling_name() {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("a");
        writer.end_object();
    }

    #[test]
    #[should_panic(expected = "must match the saved size")]
    fn test_save_to_wrong_slice() {
        let mut writer = Writer::new();
        writer.null();
        writer.save_to_slice(&mut [0u8; 2]);
    }
}
