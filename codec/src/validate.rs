//! Validate untrusted bytes before they are viewed as a [Field](crate::Field).

use crate::{measure::measure_complete, varint, Error, FieldType, Limits, Tag};
use bitflags::bitflags;
use std::collections::HashSet;

bitflags! {
    /// Checks [validate] applies on top of the structural ones.
    ///
    /// Bounds, type bytes, UTF-8, array counts, uniform element types, integer range and depth
    /// are always checked: without them a field cannot be read safely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidateMode: u8 {
        /// Object members are named and unique, array elements are unnamed.
        const NAMES = 0b0000_0001;
        /// Every encoding is the one [Writer](crate::Writer) produces: minimal VarUInts,
        /// doubles that do not fit a float, and uniform containers wherever children share a
        /// tag.
        const FORMAT = 0b0000_0010;
        /// Nothing follows the field.
        const PADDING = 0b0000_0100;
    }
}

impl Default for ValidateMode {
    fn default() -> Self {
        Self::all()
    }
}

/// What validation learned about one field.
struct Checked<'a> {
    tag: Tag,
    name: &'a str,
    size: usize,
}

/// Checks that `bytes` holds exactly one well-formed field.
///
/// When `external` is set, `bytes` omits the type byte (as an element of a uniform container
/// would) and `external` supplies it.
///
/// Validation is recursive. Every nested field is checked for bounds, legal type bytes, UTF-8
/// names and strings, matching array counts and non-empty uniform elements, plus whatever
/// `mode` selects.
pub fn validate(
    bytes: &[u8],
    external: Option<Tag>,
    mode: ValidateMode,
    limits: &Limits,
) -> Result<(), Error> {
    let validator = Validator { mode, limits };
    let checked = validator.field(bytes, external, 0)?;
    if mode.contains(ValidateMode::PADDING) && checked.size < bytes.len() {
        return Err(Error::Padding(bytes.len() - checked.size));
    }
    Ok(())
}

struct Validator<'l> {
    mode: ValidateMode,
    limits: &'l Limits,
}

impl Validator<'_> {
    fn field<'a>(
        &self,
        view: &'a [u8],
        external: Option<Tag>,
        depth: usize,
    ) -> Result<Checked<'a>, Error> {
        if external.is_some_and(Tag::is_zero_size) {
            return Err(Error::InvalidUniform);
        }
        let (tag, size) = measure_complete(view, external)?;
        if tag.field_type() == FieldType::None {
            return Err(Error::InvalidType(tag.as_u8()));
        }
        let field = &view[..size];

        // Check the name
        let mut offset = usize::from(external.is_none());
        let mut name = "";
        if tag.has_name() {
            let (len, len_size) = self.varint(&field[offset..])?;
            let start = offset + len_size;
            offset = start + len as usize;
            name = std::str::from_utf8(&field[start..offset]).map_err(|_| Error::InvalidString)?;
        }

        // Check the payload
        let payload = &field[offset..];
        match tag.field_type() {
            FieldType::IntegerPositive | FieldType::Binary => {
                self.varint(payload)?;
            }
            FieldType::IntegerNegative => {
                let (magnitude, _) = self.varint(payload)?;
                if magnitude > i64::MAX as u64 {
                    return Err(Error::InvalidInteger);
                }
            }
            FieldType::Float64 if self.mode.contains(ValidateMode::FORMAT) => {
                let bytes = payload.try_into().map_err(|_| Error::OutOfBounds)?;
                let value = f64::from_be_bytes(bytes);
                if f64::from(value as f32) == value {
                    return Err(Error::InvalidFloat);
                }
            }
            FieldType::String => {
                let (_, len_size) = self.varint(payload)?;
                std::str::from_utf8(&payload[len_size..]).map_err(|_| Error::InvalidString)?;
            }
            FieldType::Object | FieldType::UniformObject => {
                self.depth(depth)?;
                self.object(payload, tag.field_type(), depth + 1)?;
            }
            FieldType::Array | FieldType::UniformArray => {
                self.depth(depth)?;
                self.array(payload, tag.field_type(), depth + 1)?;
            }
            _ => {}
        }
        Ok(Checked { tag, name, size })
    }

    fn depth(&self, depth: usize) -> Result<(), Error> {
        if depth >= self.limits.max_depth {
            return Err(Error::TooDeep(depth));
        }
        Ok(())
    }

    fn object(&self, payload: &[u8], field_type: FieldType, depth: usize) -> Result<(), Error> {
        let (_, len_size) = self.varint(payload)?;
        let (mut children, uniform) = split_uniform(&payload[len_size..], field_type)?;
        let names = self.mode.contains(ValidateMode::NAMES);
        let mut seen = HashSet::new();
        let mut shared = Shared::default();
        while !children.is_empty() {
            let child = self.field(children, uniform, depth)?;
            if names && (!child.tag.has_name() || child.name.is_empty()) {
                return Err(Error::MissingName);
            }
            if names && !seen.insert(child.name) {
                return Err(Error::DuplicateName(child.name.to_string()));
            }
            shared.add(child.tag);
            children = &children[child.size..];
        }
        if uniform.is_none() && self.mode.contains(ValidateMode::FORMAT) && shared.is_uniform() {
            return Err(Error::NonUniformObject);
        }
        Ok(())
    }

    fn array(&self, payload: &[u8], field_type: FieldType, depth: usize) -> Result<(), Error> {
        let (_, len_size) = self.varint(payload)?;
        let (declared, count_size) = self.varint(&payload[len_size..])?;
        let (mut children, uniform) = split_uniform(&payload[len_size + count_size..], field_type)?;
        let mut shared = Shared::default();
        while !children.is_empty() {
            let child = self.field(children, uniform, depth)?;
            if child.tag.has_name() && self.mode.contains(ValidateMode::NAMES) {
                return Err(Error::UnexpectedName);
            }
            shared.add(child.tag);
            children = &children[child.size..];
        }
        if shared.count != declared {
            return Err(Error::InvalidCount(declared, shared.count));
        }
        if uniform.is_none() && self.mode.contains(ValidateMode::FORMAT) && shared.is_uniform() {
            return Err(Error::NonUniformArray);
        }
        Ok(())
    }

    /// Reads a VarUInt that must be present in full (and minimally encoded, under
    /// [ValidateMode::FORMAT]).
    fn varint(&self, bytes: &[u8]) -> Result<(u64, usize), Error> {
        let (value, len) = varint::read(bytes).map_err(|_| Error::OutOfBounds)?;
        if self.mode.contains(ValidateMode::FORMAT) && !varint::is_canonical(value, len) {
            return Err(Error::InvalidVarint);
        }
        Ok((value, len))
    }
}

/// Tracks whether the children of a container all share one tag.
#[derive(Default)]
struct Shared {
    count: u64,
    tag: Option<Tag>,
    mixed: bool,
}

impl Shared {
    fn add(&mut self, tag: Tag) {
        self.count += 1;
        match self.tag {
            None => self.tag = Some(tag),
            Some(shared) if shared != tag => self.mixed = true,
            Some(_) => {}
        }
    }

    /// Whether the children could have been written as a uniform container.
    fn is_uniform(&self) -> bool {
        !self.mixed && self.count >= 2 && self.tag.is_some_and(|tag| !tag.is_zero_size())
    }
}

/// Splits the shared child tag off the children of a uniform container.
fn split_uniform(children: &[u8], field_type: FieldType) -> Result<(&[u8], Option<Tag>), Error> {
    if !field_type.is_uniform() {
        return Ok((children, None));
    }
    let Some((&byte, rest)) = children.split_first() else {
        return Err(Error::OutOfBounds);
    };
    let tag = Tag::from_u8(byte)?;
    if tag.is_zero_size() {
        return Err(Error::InvalidUniform);
    }
    Ok((rest, Some(tag)))
}
