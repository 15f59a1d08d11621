//! Schema model and value types for the AIngle binary format.
//!
//! This crate parses JSON schema text into a [`ParsedSchema`] (a schema tree
//! plus its table of named types), renders canonical forms and fingerprints,
//! and defines the generic [`Value`] that datum writers and readers exchange.
//! It knows nothing about the binary encoding itself.

mod error;
mod json;
pub mod schema;
mod value;

pub use error::{DefaultValueError, LogicalValueError, SchemaParseError, ValueTypeError};
pub use json::{default_to_value, json_to_value, value_to_json};
pub use schema::{
    ArraySchema, EnumSchema, Field, FieldOrder, FixedSchema, LogicalSchema, LogicalType,
    MapSchema, Name, Names, ParsedSchema, Properties, RecordSchema, Schema, SchemaParser,
    UnionSchema, parse_schema, rabin_fingerprint,
};
pub use uuid;
pub use value::{Decimal, Value};
