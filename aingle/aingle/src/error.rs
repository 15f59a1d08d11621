//! Error types for container files.

use aingle_binary::{DatumError, DecodeError};
use aingle_core::SchemaParseError;

/// Errors produced by [`FileWriter`](crate::FileWriter) and
/// [`FileReader`](crate::FileReader).
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The source does not start with the container magic bytes.
    #[error("not a container file: header starts with {found:02x?}")]
    NotAContainerFile { found: Vec<u8> },

    /// No codec is registered under the name found in the header.
    #[error("unsupported codec '{name}'")]
    UnsupportedCodec { name: String },

    /// A required header metadata entry is absent.
    #[error("missing metadata key '{key}'")]
    MissingMetadata { key: String },

    /// User metadata may not use the reserved key prefix.
    #[error("metadata key '{key}' is reserved")]
    ReservedMetadataKey { key: String },

    /// The marker after a block differs from the file's sync marker.
    #[error("sync marker mismatch after block at offset {offset}")]
    SyncMarkerMismatch { offset: u64 },

    /// A block header is malformed or its payload is truncated.
    #[error("invalid block at offset {offset}: {detail}")]
    InvalidBlock { offset: u64, detail: String },

    /// Compressing or decompressing a block failed.
    #[error("{codec} codec failed: {source}")]
    Codec {
        codec: String,
        #[source]
        source: std::io::Error,
    },

    /// The writer schema stored in the header does not parse.
    #[error("invalid writer schema in header: {0}")]
    Schema(#[from] SchemaParseError),

    #[error(transparent)]
    Datum(#[from] DatumError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
