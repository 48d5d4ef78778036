//! Build, measure, stream, and validate self-describing compact binary fields.
//!
//! # Overview
//!
//! A compact binary value is a tree of typed, optionally named fields, each serialized as a
//! type byte, an optional name, and a payload. Objects and arrays prefix their children with
//! their payload size, so the size of any field can be determined from a short prefix of its
//! bytes. This crate provides:
//!
//! - [Writer]: builds a tree depth-first, compacting homogeneous containers into uniform ones.
//! - [try_measure]: sizes a (possibly incomplete) field from a prefix of its bytes.
//! - [load] and [load_bytes]: read exactly one field from a stream or buffer.
//! - [validate]: checks untrusted bytes before any accessor touches them.
//! - [Field], [Array], and [Object]: zero-copy views over a shared [bytes::Bytes] buffer.
//! - [Value]: an owned, eagerly decoded tree.
//!
//! # Example
//!
//! ```
//! use compactbin_codec::{load, Limits, Writer};
//!
//! let mut writer = Writer::new();
//! writer.begin_object();
//! writer.name("name").string("crate");
//! writer.name("versions").begin_array();
//! writer.integer_u64(1).integer_u64(2);
//! writer.end_array();
//! writer.end_object();
//!
//! let mut stream = Vec::new();
//! writer.save_to(&mut stream).unwrap();
//!
//! let field = load(&mut stream.as_slice(), &Limits::default()).unwrap();
//! let object = field.as_object().unwrap();
//! assert_eq!(object.find("name").unwrap().as_str(), Ok("crate"));
//! assert_eq!(object.find("versions").unwrap().as_array().unwrap().len(), 2);
//! ```
//!
//! # Safety
//!
//! Any [Field] obtained from this crate has been validated (or produced by a [Writer]), so its
//! accessors never read out of bounds. Use [Limits] to bound the size and nesting depth
//! accepted from untrusted input.

pub mod codec;
pub mod config;
pub mod error;
pub mod varint;

mod array;
mod field;
mod field_type;
mod iter;
mod json;
mod load;
mod measure;
mod object;
mod validate;
mod value;
mod writer;

// Re-export main types and traits
pub use array::Array;
pub use codec::{Decode, DecodeExt, Encode, EncodeSize, FixedSize, Read, ReadExt, Write};
pub use config::Limits;
pub use error::{AccessError, Error};
pub use field::{Field, FieldValue};
pub use field_type::{FieldType, Tag, HASH_SIZE, HAS_FIELD_NAME};
pub use iter::FieldIter;
pub use load::{load, load_bytes};
pub use measure::{try_measure, Measure};
pub use object::Object;
pub use validate::{validate, ValidateMode};
pub use value::Value;
pub use writer::Writer;
