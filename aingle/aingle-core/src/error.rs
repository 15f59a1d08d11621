//! Error types for schema parsing and value conversion.

/// Error returned when schema text cannot be turned into a [`ParsedSchema`](crate::ParsedSchema).
///
/// Every variant carries a JSON-path-like `path` (e.g. `$.fields[2].type.items`)
/// pointing at the offending node of the schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaParseError {
    /// The schema text is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required attribute (`type`, `name`, `fields`, `items`, ...) is absent.
    #[error("missing required attribute '{attribute}' at {path}")]
    MissingAttribute { path: String, attribute: String },

    /// An attribute is present but has the wrong shape or value.
    #[error("invalid attribute '{attribute}' at {path}: {detail}")]
    InvalidAttribute {
        path: String,
        attribute: String,
        detail: String,
    },

    /// A name, namespace, alias or symbol does not match `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid name '{name}' at {path}: {detail}")]
    InvalidName {
        path: String,
        name: String,
        detail: String,
    },

    /// A named type or field was declared twice.
    #[error("duplicate definition of '{name}' at {path}")]
    DuplicateName { path: String, name: String },

    /// A type reference names no type declared so far.
    #[error("unknown type '{name}' at {path}")]
    UnresolvedReference { path: String, name: String },

    /// A logical type is declared on an incompatible base or with bad parameters.
    #[error("invalid logical type '{logical_type}' at {path}: {detail}")]
    InvalidLogicalType {
        path: String,
        logical_type: String,
        detail: String,
    },

    /// A field default does not conform to the field schema.
    #[error("invalid default value at {path}: {source}")]
    InvalidDefault {
        path: String,
        #[source]
        source: DefaultValueError,
    },

    /// A union is nested or repeats a branch.
    #[error("invalid union at {path}: {detail}")]
    InvalidUnion { path: String, detail: String },
}

/// Error returned when a JSON value cannot be converted to a [`Value`](crate::Value)
/// under a given schema.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{detail} at {path}")]
pub struct DefaultValueError {
    pub path: String,
    pub detail: String,
}

impl DefaultValueError {
    pub fn new(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Error returned by [`Value`](crate::Value) typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, got {actual}")]
pub struct ValueTypeError {
    pub expected: String,
    pub actual: &'static str,
}

impl ValueTypeError {
    pub fn new(expected: impl Into<String>, actual: &'static str) -> Self {
        Self {
            expected: expected.into(),
            actual,
        }
    }
}

/// Error returned when a base value cannot be converted to a logical value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert to logical type '{logical_type}': {detail}")]
pub struct LogicalValueError {
    pub logical_type: &'static str,
    pub detail: String,
}
