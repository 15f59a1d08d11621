//! Schema model, parser, canonical form and fingerprints.

mod canonical;
mod format;
mod logical;
mod name;
mod parser;
mod types;

pub use canonical::{RABIN_EMPTY, rabin_fingerprint};
pub use logical::{LogicalType, max_fixed_precision};
pub use name::{Name, is_valid_fullname, is_valid_identifier, is_valid_namespace};
pub use parser::{SchemaParser, parse_schema};
pub use types::{
    ArraySchema, EnumSchema, Field, FieldOrder, FixedSchema, LogicalSchema, MapSchema, Names,
    ParsedSchema, Properties, RecordSchema, Schema, UnionSchema,
};
