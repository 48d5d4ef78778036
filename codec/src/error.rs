//! Error types for codec operations

use thiserror::Error;

/// Error type for measuring, loading, and validating fields.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("field extends past the end of its buffer")]
    OutOfBounds,
    #[error("invalid field type: {0:#04x}")]
    InvalidType(u8),
    #[error("invalid varint")]
    InvalidVarint,
    #[error("negative integer out of range")]
    InvalidInteger,
    #[error("double is exactly representable as a float")]
    InvalidFloat,
    #[error("invalid utf-8 string")]
    InvalidString,
    #[error("object member is missing a name")]
    MissingName,
    #[error("duplicate object member name: {0}")]
    DuplicateName(String),
    #[error("array element has a name")]
    UnexpectedName,
    #[error("invalid array count: declared {0}, found {1}")]
    InvalidCount(u64, u64),
    #[error("uniform container holds zero-sized elements")]
    InvalidUniform,
    #[error("array elements share a type but the array is not uniform")]
    NonUniformArray,
    #[error("object members share a type but the object is not uniform")]
    NonUniformObject,
    #[error("nesting too deep: {0}")]
    TooDeep(usize),
    #[error("trailing padding: {0} bytes")]
    Padding(usize),
    #[error("length exceeded: {0} > {1}")]
    LengthExceeded(u64, usize), // found, max
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for typed field accessors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("field has the wrong type")]
    Type,
    #[error("value is out of range for the requested type")]
    Range,
}
