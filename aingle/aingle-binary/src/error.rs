//! Error types for binary decoding and schema-driven datum reading/writing.

use aingle_core::DefaultValueError;

/// Error raised by the leaf [`Decoder`](crate::Decoder) and the stream helpers.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes remain than the value being decoded requires.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEndOfInput { needed: usize, remaining: usize },

    /// A variable-length integer continues past ten bytes.
    #[error("variable-length integer exceeds 64 bits")]
    VarintOverflow,

    /// A decoded `long` does not fit the 32-bit `int` being read.
    #[error("value {value} is out of range for int")]
    IntOutOfRange { value: i64 },

    /// A byte count or block size is negative where it may not be.
    #[error("negative length {length}")]
    NegativeLength { length: i64 },

    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEndOfInput {
                needed: 1,
                remaining: 0,
            }
        } else {
            DecodeError::Io(e)
        }
    }
}

impl From<bytes::TryGetError> for DecodeError {
    fn from(e: bytes::TryGetError) -> Self {
        DecodeError::UnexpectedEndOfInput {
            needed: e.requested,
            remaining: e.available,
        }
    }
}

/// Error raised while writing or reading a datum against a schema.
///
/// `path` locates the offending node in the datum, e.g. `$.items[3].name`.
#[derive(Debug, thiserror::Error)]
pub enum DatumError {
    /// The writer and reader schemas are incompatible at `path`.
    #[error("schema resolution failed at {path}: {detail}")]
    SchemaResolution { path: String, detail: String },

    /// The value does not conform to the schema (writing), or the encoded
    /// data is inconsistent with the writer schema (reading).
    #[error("invalid datum at {path}: {detail}")]
    InvalidDatum { path: String, detail: String },

    #[error("decode failed at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    /// A schema references a named type missing from its symbol table.
    #[error("unknown named type '{name}' at {path}")]
    UnknownName { path: String, name: String },

    /// A field default could not be materialized.
    #[error("invalid default for field at {path}: {source}")]
    Default {
        path: String,
        #[source]
        source: DefaultValueError,
    },
}

impl DatumError {
    /// Whether the decoder ran out of bytes.
    pub fn is_unexpected_end(&self) -> bool {
        matches!(
            self,
            DatumError::Decode {
                source: DecodeError::UnexpectedEndOfInput { .. },
                ..
            }
        )
    }

    pub(crate) fn resolution(path: &str, detail: impl Into<String>) -> Self {
        DatumError::SchemaResolution {
            path: path.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(path: &str, detail: impl Into<String>) -> Self {
        DatumError::InvalidDatum {
            path: path.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn decode(path: &str) -> impl FnOnce(DecodeError) -> Self + '_ {
        move |source| DatumError::Decode {
            path: path.to_string(),
            source,
        }
    }
}
