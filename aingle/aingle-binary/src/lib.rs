//! Binary encoding for the AIngle format.
//!
//! The [`Encoder`] and [`Decoder`] handle leaf values (zig-zag varints,
//! little-endian floats, length-prefixed byte strings, block framing).
//! [`DatumWriter`] and [`DatumReader`] walk a schema on top of them, the
//! latter resolving data written under one schema into the shape of another.
//!
//! ```ignore
//! let schema = aingle_core::parse_schema(r#"["null", "long"]"#)?;
//! let bytes = aingle_binary::to_binary(&schema, &Value::Long(42))?;
//! assert_eq!(aingle_binary::from_binary(&schema, &bytes)?, Value::union(1, Value::Long(42)));
//! ```

mod decoder;
mod encoder;
mod error;
pub mod io;
mod reader;
mod resolve;
mod skip;
mod writer;

pub use decoder::{BlockHeader, Decoder};
pub use encoder::{Encoder, MAX_VARINT_LEN, zigzag_decode, zigzag_encode};
pub use error::{DatumError, DecodeError};
pub use reader::{DatumReader, from_binary};
pub use resolve::{is_promotable, names_match, select_union_branch};
pub use skip::{MAX_ZERO_SIZE_ITEMS, min_encoded_size};
pub use writer::{DatumWriter, WriteOptions, to_binary};
