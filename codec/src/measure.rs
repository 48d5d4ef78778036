//! Determine the size of a field from a prefix of its bytes.
//!
//! [try_measure] never reads past what it needs to make progress. Called repeatedly with longer
//! prefixes of the same field, the `required` size it reports never decreases, so a reader can
//! request exactly `required - have` more bytes each round.

use crate::{varint, Error, Tag};

/// The outcome of measuring a (possibly incomplete) field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    /// The field's type and total size (including any type byte and name) are known.
    ///
    /// This does not imply the payload's contents are valid, only that its length is known.
    Complete { tag: Tag, size: usize },

    /// At least `required` bytes (counted from the start of the view) are needed to continue.
    Incomplete { required: usize },
}

/// Measures the field at the start of `view`.
///
/// When `external` is `None`, `view` starts with the field's type byte. Otherwise the field is
/// an element of a uniform container and `external` supplies its type.
///
/// Dynamic-size containers, binary, and string fields are only [Measure::Complete] once `view`
/// holds their entire payload. Fixed-size and integer fields are complete as soon as their
/// length is known.
pub fn try_measure(view: &[u8], external: Option<Tag>) -> Result<Measure, Error> {
    let mut offset = 0;
    let tag = match external {
        Some(tag) => tag,
        None => {
            let Some(&byte) = view.first() else {
                return Ok(Measure::Incomplete { required: 1 });
            };
            offset = 1;
            Tag::from_u8(byte)?
        }
    };

    // Skip the name
    if tag.has_name() {
        let Some(&first) = view.get(offset) else {
            return Ok(Measure::Incomplete {
                required: offset + 1,
            });
        };
        let len_size = varint::measure(first);
        if view.len() < offset + len_size {
            return Ok(Measure::Incomplete {
                required: offset + len_size,
            });
        }
        let (name_len, _) = varint::read(&view[offset..])?;
        offset = checked_end(offset + len_size, name_len)?;
        if view.len() < offset {
            return Ok(Measure::Incomplete { required: offset });
        }
    }

    // Size the payload
    let field_type = tag.field_type();
    if let Some(size) = field_type.fixed_size() {
        return Ok(Measure::Complete {
            tag,
            size: offset + size,
        });
    }
    let Some(&first) = view.get(offset) else {
        return Ok(Measure::Incomplete {
            required: offset + 1,
        });
    };
    let len_size = varint::measure(first);
    if field_type.is_integer() {
        return Ok(Measure::Complete {
            tag,
            size: offset + len_size,
        });
    }
    if view.len() < offset + len_size {
        return Ok(Measure::Incomplete {
            required: offset + len_size,
        });
    }
    let (payload_len, _) = varint::read(&view[offset..])?;
    let size = checked_end(offset + len_size, payload_len)?;
    if view.len() < size {
        return Ok(Measure::Incomplete { required: size });
    }
    Ok(Measure::Complete { tag, size })
}

/// Returns `start + len`, rejecting lengths that cannot be addressed.
fn checked_end(start: usize, len: u64) -> Result<usize, Error> {
    usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .ok_or(Error::LengthExceeded(len, usize::MAX - start))
}

/// Returns the size of the complete field at the start of `view`.
///
/// Unlike [try_measure], a short `view` is an error: [Error::OutOfBounds].
pub fn measure_complete(view: &[u8], external: Option<Tag>) -> Result<(Tag, usize), Error> {
    match try_measure(view, external)? {
        Measure::Complete { tag, size } if size <= view.len() => Ok((tag, size)),
        _ => Err(Error::OutOfBounds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;
    use test_case::test_case;

    const NULL_NAMED: u8 = FieldType::Null as u8 | crate::HAS_FIELD_NAME;

    fn complete(bytes: &[u8], external: Option<Tag>) -> (Tag, usize) {
        match try_measure(bytes, external).unwrap() {
            Measure::Complete { tag, size } => (tag, size),
            other => panic!("expected complete, got {other:?}"),
        }
    }

    fn required(bytes: &[u8], external: Option<Tag>) -> usize {
        match try_measure(bytes, external).unwrap() {
            Measure::Incomplete { required } => required,
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(required(&[], None), 1);
    }

    #[test]
    fn test_named_null_two_byte_name_length() {
        // A name length starting with 0x80 needs a second byte
        assert_eq!(required(&[NULL_NAMED], None), 2);
        assert_eq!(required(&[NULL_NAMED, 0x80], None), 3);

        // 0x80 0x80 announces a 128-byte name
        assert_eq!(required(&[NULL_NAMED, 0x80, 0x80], None), 3 + 128);
        let mut bytes = vec![NULL_NAMED, 0x80, 0x80];
        bytes.extend(std::iter::repeat(b'n').take(128));
        assert_eq!(complete(&bytes, None), (Tag::from_u8(NULL_NAMED).unwrap(), 131));
    }

    #[test]
    fn test_named_null_short_name() {
        assert_eq!(required(&[NULL_NAMED, 1], None), 3);
        let (tag, size) = complete(&[NULL_NAMED, 1, b'N'], None);
        assert_eq!(tag.field_type(), FieldType::Null);
        assert!(tag.has_name());
        assert_eq!(size, 3);
    }

    #[test_case(FieldType::Null, 1)]
    #[test_case(FieldType::BoolTrue, 1)]
    #[test_case(FieldType::Float32, 5)]
    #[test_case(FieldType::Float64, 9)]
    #[test_case(FieldType::DateTime, 9)]
    #[test_case(FieldType::Uuid, 17)]
    #[test_case(FieldType::Hash, 33)]
    #[test_case(FieldType::BinaryReference, 33)]
    fn test_fixed_complete_from_type_byte(field_type: FieldType, size: usize) {
        // Fixed-size kinds are complete before their payload arrives
        let (tag, measured) = complete(&[field_type as u8], None);
        assert_eq!(tag.field_type(), field_type);
        assert_eq!(measured, size);
    }

    #[test]
    fn test_integer() {
        let integer = FieldType::IntegerPositive as u8;
        assert_eq!(required(&[integer], None), 2);
        assert_eq!(complete(&[integer, 0x05], None).1, 2);

        // Complete from the first magnitude byte alone
        assert_eq!(complete(&[integer, 0xc0], None).1, 4);
        assert_eq!(complete(&[integer, 0xff], None).1, 10);
    }

    #[test]
    fn test_dynamic_requires_full_payload() {
        let binary = FieldType::Binary as u8;
        assert_eq!(required(&[binary], None), 2);
        assert_eq!(required(&[binary, 3], None), 5);
        assert_eq!(required(&[binary, 3, 0, 0], None), 5);
        assert_eq!(complete(&[binary, 3, 0, 0, 0], None).1, 5);

        // Two-byte payload size
        assert_eq!(required(&[binary, 0x80], None), 3);
        assert_eq!(required(&[binary, 0x80, 0x80], None), 3 + 128);
    }

    #[test]
    fn test_external_type() {
        let external = Some(Tag::from(FieldType::String));
        assert_eq!(required(&[], external), 1);
        assert_eq!(required(&[2, b'a'], external), 3);
        assert_eq!(complete(&[2, b'a', b'b'], external).1, 3);

        let external = Some(Tag::from(FieldType::Float32));
        assert_eq!(complete(&[], external).1, 4);
    }

    #[test]
    fn test_array_count_inside_payload() {
        // [Array][size=3][count=1][Null tag]... the count is part of the payload
        let array = FieldType::Array as u8;
        assert_eq!(required(&[array, 3, 1], None), 5);
        assert_eq!(complete(&[array, 3, 1, 1, 1], None).1, 5);
    }

    #[test]
    fn test_trailing_bytes() {
        let (_, size) = complete(&[FieldType::Null as u8, 0xaa, 0xbb], None);
        assert_eq!(size, 1);
    }

    #[test]
    fn test_invalid_type() {
        assert!(matches!(
            try_measure(&[0x14], None),
            Err(Error::InvalidType(0x14))
        ));
        assert!(matches!(
            try_measure(&[0x41], None),
            Err(Error::InvalidType(0x41))
        ));
    }

    #[test]
    fn test_monotonic() {
        let mut bytes = vec![FieldType::String as u8 | crate::HAS_FIELD_NAME, 0x80, 0x81];
        bytes.extend(std::iter::repeat(b'n').take(0x81));
        bytes.extend([0x80, 0x90]);
        bytes.extend(std::iter::repeat(b's').take(0x90));

        let mut last = 0;
        for len in 0..bytes.len() {
            let required = required(&bytes[..len], None);
            assert!(required > len);
            assert!(required >= last);
            last = required;
        }
        assert_eq!(complete(&bytes, None).1, bytes.len());
    }

    #[test]
    fn test_measure_complete() {
        let binary = FieldType::Binary as u8;
        assert!(matches!(
            measure_complete(&[binary, 3, 0], None),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            measure_complete(&[FieldType::Float32 as u8, 0, 0], None),
            Err(Error::OutOfBounds)
        ));
        assert_eq!(measure_complete(&[binary, 1, 0, 9], None).unwrap().1, 3);
    }
}
