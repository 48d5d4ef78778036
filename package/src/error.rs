use compactbin_codec::FieldType;
use thiserror::Error;

/// Errors that reject a package.
#[derive(Error, Debug)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] compactbin_codec::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected field: {0:?}")]
    UnexpectedField(FieldType),
    #[error("unexpected field name: {0}")]
    UnexpectedName(String),
    #[error("{0:?} is not followed by its hash")]
    MissingHash(FieldType),
    #[error("hash mismatch: declared {declared}, computed {computed}")]
    HashMismatch { declared: String, computed: String },
    #[error("duplicate attachment: {0}")]
    DuplicateAttachment(String),
}
