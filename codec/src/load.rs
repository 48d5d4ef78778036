//! Load fields of unknown size from a stream or buffer.
//!
//! [load] alternates between reading exactly the bytes the measurer asks for and measuring
//! again, so it never reads past the end of the field. Small headers stay in an inline buffer;
//! the field itself is allocated once, at its exact size.

use crate::{
    codec::Read,
    measure::{try_measure, Measure},
    validate::{validate, ValidateMode},
    Error, Field, Limits,
};
use bytes::{Buf, Bytes};
use std::io;
use tracing::trace;

/// Bytes of header kept inline before spilling to the heap.
const INLINE_HEADER: usize = 64;

/// The bytes read so far while measuring a field.
enum Header {
    Inline([u8; INLINE_HEADER], usize),
    Heap(Vec<u8>),
}

impl Header {
    fn len(&self) -> usize {
        match self {
            Self::Inline(_, len) => *len,
            Self::Heap(buffer) => buffer.len(),
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Inline(buffer, len) => &buffer[..*len],
            Self::Heap(buffer) => buffer,
        }
    }

    /// Reads from `reader` until the header holds `required` bytes.
    fn fill(&mut self, reader: &mut impl io::Read, required: usize) -> io::Result<()> {
        let have = self.len();
        match self {
            Self::Inline(buffer, len) if required <= INLINE_HEADER => {
                reader.read_exact(&mut buffer[have..required])?;
                *len = required;
            }
            Self::Inline(buffer, _) => {
                let mut heap = Vec::with_capacity(required);
                heap.extend_from_slice(&buffer[..have]);
                heap.resize(required, 0);
                reader.read_exact(&mut heap[have..])?;
                *self = Self::Heap(heap);
            }
            Self::Heap(heap) => {
                heap.reserve_exact(required - have);
                heap.resize(required, 0);
                reader.read_exact(&mut heap[have..])?;
            }
        }
        Ok(())
    }

    /// Completes the field by reading the rest of its `size` bytes.
    fn finish(self, reader: &mut impl io::Read, size: usize) -> io::Result<Vec<u8>> {
        let mut buffer = match self {
            Self::Heap(heap) if heap.len() == size => return Ok(heap),
            Self::Heap(mut heap) => {
                heap.reserve_exact(size - heap.len());
                heap
            }
            Self::Inline(header, len) => {
                let mut buffer = Vec::with_capacity(size);
                buffer.extend_from_slice(&header[..len]);
                buffer
            }
        };
        let have = buffer.len();
        buffer.resize(size, 0);
        reader.read_exact(&mut buffer[have..])?;
        Ok(buffer)
    }
}

/// Reads exactly one field from `reader`.
///
/// The field is validated before it is returned. Any I/O error (including a truncated stream,
/// reported as [io::ErrorKind::UnexpectedEof]), a size over [Limits::max_size], or malformed
/// content fails the load.
pub fn load(reader: &mut impl io::Read, limits: &Limits) -> Result<Field, Error> {
    let mut header = Header::Inline([0; INLINE_HEADER], 0);
    let mut required = 1;
    let size = loop {
        if !limits.allows(required) {
            return Err(Error::LengthExceeded(required as u64, limits.max_size));
        }
        header.fill(reader, required)?;
        match try_measure(header.as_slice(), None)? {
            Measure::Complete { size, .. } => break size,
            Measure::Incomplete { required: next } => {
                trace!(have = header.len(), required = next, "measuring field");
                required = next;
            }
        }
    };
    if !limits.allows(size) {
        return Err(Error::LengthExceeded(size as u64, limits.max_size));
    }
    let buffer = header.finish(reader, size)?;
    trace!(size, "loaded field");
    validate(&buffer, None, ValidateMode::all(), limits)?;
    Field::parse(Bytes::from(buffer), None)
}

/// Splits exactly one field off the front of `buffer` without copying.
///
/// Returns [Error::EndOfBuffer] (leaving `buffer` untouched) if it holds only part of a field.
pub fn load_bytes(buffer: &mut Bytes, limits: &Limits) -> Result<Field, Error> {
    let size = match try_measure(buffer, None)? {
        Measure::Complete { size, .. } if size <= buffer.len() => size,
        _ => return Err(Error::EndOfBuffer),
    };
    if !limits.allows(size) {
        return Err(Error::LengthExceeded(size as u64, limits.max_size));
    }
    validate(&buffer[..size], None, ValidateMode::all(), limits)?;
    let field = Field::parse(buffer.split_to(size), None)?;
    Ok(field)
}

impl Read<Limits> for Field {
    fn read_cfg(buf: &mut impl Buf, limits: &Limits) -> Result<Self, Error> {
        let mut reader = Buf::reader(&mut *buf);
        load(&mut reader, limits).map_err(|err| match err {
            Error::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => Error::EndOfBuffer,
            err => err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::Decode, FieldType, Writer};
    use std::io::Cursor;

    fn sample() -> Field {
        let mut writer = Writer::new();
        writer.begin_object();
        writer.name("name").string("value");
        writer.name("list").begin_array();
        writer.integer_u64(1);
        writer.integer_i64(-1);
        writer.end_array();
        writer.end_object();
        writer.save()
    }

    #[test]
    fn test_load_stops_at_field_end() {
        let field = sample();
        let mut bytes = field.as_bytes().to_vec();
        bytes.extend_from_slice(&[FieldType::Null as u8, 0xaa]);

        let mut reader = Cursor::new(bytes);
        let loaded = load(&mut reader, &Limits::default()).unwrap();
        assert_eq!(loaded, field);
        assert_eq!(reader.position() as usize, field.as_bytes().len());

        let next = load(&mut reader, &Limits::default()).unwrap();
        assert_eq!(next.field_type(), FieldType::Null);
    }

    #[test]
    fn test_load_truncated() {
        let field = sample();
        let bytes = field.as_bytes();
        for len in 0..bytes.len() {
            let mut reader = Cursor::new(&bytes[..len]);
            match load(&mut reader, &Limits::default()) {
                Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
                other => panic!("unexpected result for {len} bytes: {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_long_name_spills_to_heap() {
        let name = "n".repeat(300);
        let mut writer = Writer::new();
        writer.name(&name).integer_u64(7);
        let field = writer.save();

        let mut reader = Cursor::new(field.as_bytes().to_vec());
        let loaded = load(&mut reader, &Limits::default()).unwrap();
        assert_eq!(loaded.name(), name);
        assert_eq!(loaded.as_u64(), Ok(7));
    }

    #[test]
    fn test_load_max_size() {
        let mut writer = Writer::new();
        writer.binary(&[0u8; 100]);
        let field = writer.save();
        let limits = Limits {
            max_size: 50,
            ..Limits::default()
        };

        let mut reader = Cursor::new(field.as_bytes().to_vec());
        assert!(matches!(
            load(&mut reader, &limits),
            Err(Error::LengthExceeded(_, 50))
        ));

        let mut bytes = field.buffer().clone();
        assert!(matches!(
            load_bytes(&mut bytes, &limits),
            Err(Error::LengthExceeded(102, 50))
        ));
    }

    #[test]
    fn test_load_rejects_malformed() {
        // Valid size, duplicate member names
        let bytes = [
            FieldType::UniformObject as u8,
            5,
            FieldType::Null as u8 | crate::HAS_FIELD_NAME,
            1,
            b'A',
            1,
            b'A',
        ];
        let mut reader = Cursor::new(&bytes[..]);
        assert!(matches!(
            load(&mut reader, &Limits::default()),
            Err(Error::DuplicateName(_))
        ));
    }

    #[test]
    fn test_load_bytes() {
        let field = sample();
        let mut bytes = field.buffer().clone();
        let total = bytes.len();

        // Partial field leaves the buffer untouched
        let mut partial = bytes.slice(..total - 1);
        assert!(matches!(
            load_bytes(&mut partial, &Limits::default()),
            Err(Error::EndOfBuffer)
        ));
        assert_eq!(partial.len(), total - 1);

        let loaded = load_bytes(&mut bytes, &Limits::default()).unwrap();
        assert_eq!(loaded, field);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_read_cfg() {
        let field = sample();
        let limits = Limits::default();
        let decoded = Field::decode_cfg(field.buffer().clone(), &limits).unwrap();
        assert_eq!(decoded, field);

        // The same limits bound every read
        let truncated = field.buffer().slice(..4);
        assert!(matches!(
            Field::decode_cfg(truncated, &limits),
            Err(Error::EndOfBuffer)
        ));
        let tight = Limits {
            max_size: 4,
            ..limits
        };
        assert!(matches!(
            Field::decode_cfg(field.buffer().clone(), &tight),
            Err(Error::LengthExceeded(_, 4))
        ));
    }
}
