use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use super::{LogicalType, Name};

/// Custom (non-reserved) attributes of a schema node or field.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Symbol table of named types, keyed by full name.
///
/// Each entry is the definition of a record, enum or fixed schema (possibly
/// wrapped in a [`LogicalSchema`] for fixed-backed decimals). [`Schema::Ref`]
/// nodes point into this table, which breaks ownership cycles for recursive
/// records.
pub type Names = HashMap<Name, Schema>;

/// One node of a schema tree.
///
/// The first occurrence of a named type carries its definition; later
/// occurrences (and self references) are [`Schema::Ref`] nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(Arc<RecordSchema>),
    Enum(Arc<EnumSchema>),
    Array(Box<ArraySchema>),
    Map(Box<MapSchema>),
    Fixed(Arc<FixedSchema>),
    Union(UnionSchema),
    Logical(Box<LogicalSchema>),
    /// Reference to a named type defined elsewhere in the same parse session.
    Ref(Name),
}

impl Schema {
    /// Map a primitive type name to its schema.
    pub fn primitive(name: &str) -> Option<Schema> {
        Some(match name {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "bytes" => Schema::Bytes,
            "string" => Schema::String,
            _ => return None,
        })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Schema::Null
                | Schema::Boolean
                | Schema::Int
                | Schema::Long
                | Schema::Float
                | Schema::Double
                | Schema::Bytes
                | Schema::String
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Fixed(_) => "fixed",
            Schema::Union(_) => "union",
            Schema::Logical(l) => l.base.type_name(),
            Schema::Ref(_) => "reference",
        }
    }

    /// Full name of a named type (or of a reference to one).
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            Schema::Logical(l) => l.base.name(),
            Schema::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Alternate full names of a named type definition.
    pub fn aliases(&self) -> &[Name] {
        match self {
            Schema::Record(r) => &r.aliases,
            Schema::Enum(e) => &e.aliases,
            Schema::Fixed(f) => &f.aliases,
            Schema::Logical(l) => l.base.aliases(),
            _ => &[],
        }
    }

    /// Follow a [`Schema::Ref`] through `names`; other nodes are returned as is.
    pub fn deref<'a>(&'a self, names: &'a Names) -> Option<&'a Schema> {
        match self {
            Schema::Ref(name) => names.get(name),
            other => Some(other),
        }
    }
}

/// Sort order of a record field (affects comparison only, not encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }
}

/// Member of a record schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Default value as written in the schema text; validated at parse time.
    pub default: Option<serde_json::Value>,
    pub order: FieldOrder,
    pub aliases: Vec<String>,
    pub doc: Option<String>,
    pub properties: Properties,
    /// Zero-based position in the record.
    pub position: usize,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.schema == other.schema
            && self.default == other.default
            && self.order == other.order
            && self.aliases == other.aliases
            && self.properties == other.properties
    }
}

#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    pub properties: Properties,
    pub(crate) lookup: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new(
        name: Name,
        aliases: Vec<Name>,
        doc: Option<String>,
        fields: Vec<Field>,
        properties: Properties,
    ) -> Self {
        let lookup = fields
            .iter()
            .map(|f| (f.name.clone(), f.position))
            .collect();
        Self {
            name,
            aliases,
            doc,
            fields,
            properties,
            lookup,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.lookup.get(name).map(|&i| &self.fields[i])
    }

    /// Find the field named `name`, or failing that the field listing `name`
    /// among its aliases.
    pub fn field_or_alias(&self, name: &str) -> Option<&Field> {
        self.field(name).or_else(|| {
            self.fields
                .iter()
                .find(|f| f.aliases.iter().any(|a| a == name))
        })
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.aliases == other.aliases
            && self.fields == other.fields
            && self.properties == other.properties
    }
}

#[derive(Debug, Clone)]
pub struct EnumSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
    pub default: Option<String>,
    pub properties: Properties,
}

impl EnumSchema {
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

impl PartialEq for EnumSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.aliases == other.aliases
            && self.symbols == other.symbols
            && self.default == other.default
            && self.properties == other.properties
    }
}

#[derive(Debug, Clone)]
pub struct FixedSchema {
    pub name: Name,
    pub aliases: Vec<Name>,
    pub doc: Option<String>,
    pub size: usize,
    pub properties: Properties,
}

impl PartialEq for FixedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.aliases == other.aliases
            && self.size == other.size
            && self.properties == other.properties
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Schema,
    pub properties: Properties,
}

/// Map schema; keys are always strings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSchema {
    pub values: Schema,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    pub variants: Vec<Schema>,
}

impl UnionSchema {
    pub fn variants(&self) -> &[Schema] {
        &self.variants
    }

    /// Index of the first `null` branch, if any.
    pub fn null_index(&self) -> Option<usize> {
        self.variants.iter().position(|s| matches!(s, Schema::Null))
    }
}

/// A base schema refined by a logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSchema {
    pub logical: LogicalType,
    pub base: Schema,
}

/// Root of a parsed schema together with the named types it may reference.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub(crate) root: Schema,
    pub(crate) names: Arc<Names>,
}

impl ParsedSchema {
    pub fn new(root: Schema, names: Names) -> Self {
        Self {
            root,
            names: Arc::new(names),
        }
    }

    /// Parse a standalone schema document.
    pub fn parse_str(text: &str) -> Result<Self, crate::SchemaParseError> {
        super::SchemaParser::new().parse(text)
    }

    pub fn root(&self) -> &Schema {
        &self.root
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    pub fn lookup(&self, name: &Name) -> Option<&Schema> {
        self.names.get(name)
    }

    /// Build a schema sharing this schema's named types but rooted at `root`.
    pub fn with_root(&self, root: Schema) -> Self {
        Self {
            root,
            names: Arc::clone(&self.names),
        }
    }
}

/// Structural equality of the root trees; documentation and property order
/// are ignored.
impl PartialEq for ParsedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}
