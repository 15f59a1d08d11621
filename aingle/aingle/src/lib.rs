//! Object container files for the AIngle binary format.
//!
//! A container file stores a header (magic, metadata including the writer
//! schema and codec name, a random sync marker) followed by blocks of
//! compressed, binary-encoded datums, each block terminated by the sync
//! marker. [`FileWriter`] produces such files and [`FileReader`] reads them
//! back, optionally resolving the data into a different reader schema.

mod codec;
mod error;
mod header;
mod reader;
mod writer;

pub use aingle_binary as binary;
pub use aingle_core as core;
#[cfg(feature = "deflate")]
pub use codec::DeflateCodec;
#[cfg(feature = "snappy")]
pub use codec::SnappyCodec;
#[cfg(feature = "zstandard")]
pub use codec::ZstandardCodec;
pub use codec::{Codec, CodecRegistry, NullCodec};
pub use error::FileError;
pub use header::{
    CODEC_KEY, DEFAULT_SYNC_INTERVAL, Header, MAGIC, RESERVED_PREFIX, SCHEMA_KEY, SYNC_SIZE,
};
pub use reader::{FileReader, FileReaderBuilder};
pub use writer::{FileWriter, FileWriterBuilder};
