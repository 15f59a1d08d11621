//! Single-pass JSON schema parser with a namespace-aware symbol table.
//!
//! Named types must be declared before they are referenced (in document
//! order); a record may refer to itself from inside its own fields.
//!
//! # Reference lookup
//!
//! 1. A dotted reference (`org.example.Point`) is used verbatim.
//! 2. A bare reference (`Point`) is tried in the enclosing namespace,
//!    then in the parser's default namespace, then in the null namespace.

use std::{collections::HashMap, sync::Arc};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::{
    ArraySchema, EnumSchema, Field, FieldOrder, FixedSchema, LogicalSchema, LogicalType,
    MapSchema, Name, Names, ParsedSchema, Properties, RecordSchema, Schema, UnionSchema,
    name::{is_valid_fullname, is_valid_identifier, is_valid_namespace},
};
use crate::{error::SchemaParseError, json::default_to_value};

const NAMED_RESERVED: &[&str] = &[
    "type", "name", "namespace", "aliases", "doc", "fields", "symbols", "size", "default",
];
const FIELD_RESERVED: &[&str] = &["name", "type", "default", "order", "aliases", "doc"];
const ARRAY_RESERVED: &[&str] = &["type", "items"];
const MAP_RESERVED: &[&str] = &["type", "values"];
const LOGICAL_ATTRIBUTES: &[&str] = &["logicalType", "precision", "scale"];

type Result<T> = std::result::Result<T, SchemaParseError>;

/// Parse session: owns the named-type symbol table.
///
/// Several documents parsed with the same parser share named types, so a
/// later document may reference types declared by an earlier one.
#[derive(Debug, Default, Clone)]
pub struct SchemaParser {
    names: Names,
    default_namespace: Option<String>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace used for bare names that are not found in the enclosing namespace.
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.default_namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Named types declared so far in this session.
    pub fn names(&self) -> &Names {
        &self.names
    }

    pub fn parse(&mut self, text: &str) -> Result<ParsedSchema> {
        let json: JsonValue = serde_json::from_str(text)?;
        self.parse_json(&json)
    }

    /// Parse an already-decoded JSON document.
    ///
    /// On failure the session's symbol table is left as it was before the call.
    pub fn parse_json(&mut self, json: &JsonValue) -> Result<ParsedSchema> {
        let mut session = Session {
            names: self.names.clone(),
            default_namespace: self.default_namespace.as_deref(),
        };
        let enclosing = self.default_namespace.clone();
        let root = session.parse(json, enclosing.as_deref(), "$")?;
        self.names = session.names;
        Ok(ParsedSchema::new(root, self.names.clone()))
    }
}

/// Parse a standalone schema document.
pub fn parse_schema(text: &str) -> Result<ParsedSchema> {
    SchemaParser::new().parse(text)
}

struct Session<'p> {
    names: Names,
    default_namespace: Option<&'p str>,
}

impl Session<'_> {
    fn parse(&mut self, json: &JsonValue, enclosing: Option<&str>, path: &str) -> Result<Schema> {
        match json {
            JsonValue::String(name) => self.parse_reference(name, enclosing, path),
            JsonValue::Array(branches) => self.parse_union(branches, enclosing, path),
            JsonValue::Object(map) => self.parse_object(map, enclosing, path),
            other => Err(SchemaParseError::InvalidAttribute {
                path: path.to_string(),
                attribute: "type".to_string(),
                detail: format!("expected a type name, union or object, found {other}"),
            }),
        }
    }

    fn parse_reference(&self, raw: &str, enclosing: Option<&str>, path: &str) -> Result<Schema> {
        if let Some(primitive) = Schema::primitive(raw) {
            return Ok(primitive);
        }
        self.lookup(raw, enclosing)
            .map(Schema::Ref)
            .ok_or_else(|| SchemaParseError::UnresolvedReference {
                path: path.to_string(),
                name: raw.to_string(),
            })
    }

    fn lookup(&self, raw: &str, enclosing: Option<&str>) -> Option<Name> {
        if raw.contains('.') {
            let name = Name::qualify(raw, None);
            return self.names.contains_key(&name).then_some(name);
        }
        [enclosing, self.default_namespace, None]
            .into_iter()
            .map(|ns| Name::qualify(raw, ns))
            .find(|name| self.names.contains_key(name))
    }

    fn parse_object(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        match map.get("logicalType") {
            Some(JsonValue::String(logical)) if LogicalType::is_known(logical) => {
                let mut base_map = map.clone();
                for key in LOGICAL_ATTRIBUTES {
                    base_map.remove(*key);
                }
                let base = self.parse_plain_object(&base_map, enclosing, path)?;
                let logical_type = LogicalType::from_attributes(logical, map, &base, &self.names)
                    .map_err(|detail| SchemaParseError::InvalidLogicalType {
                        path: path.to_string(),
                        logical_type: logical.clone(),
                        detail,
                    })?;
                let is_inline_fixed = matches!(base, Schema::Fixed(_));
                let schema = Schema::Logical(Box::new(LogicalSchema {
                    logical: logical_type,
                    base,
                }));
                // References to a fixed-backed decimal keep the logical type.
                if is_inline_fixed && let Some(name) = schema.name() {
                    self.names.insert(name.clone(), schema.clone());
                }
                Ok(schema)
            }
            Some(other) => {
                debug!(path, logical_type = %other, "ignoring unknown logical type");
                self.parse_plain_object(map, enclosing, path)
            }
            None => self.parse_plain_object(map, enclosing, path),
        }
    }

    fn parse_plain_object(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let type_attr = map
            .get("type")
            .ok_or_else(|| missing(path, "type"))?;
        match type_attr {
            JsonValue::String(ty) => match ty.as_str() {
                "record" | "error" => self.parse_record(map, enclosing, path),
                "enum" => self.parse_enum(map, enclosing, path),
                "fixed" => self.parse_fixed(map, enclosing, path),
                "array" => self.parse_array(map, enclosing, path),
                "map" => self.parse_map(map, enclosing, path),
                other => self.parse_reference(other, enclosing, &format!("{path}.type")),
            },
            nested => self.parse(nested, enclosing, &format!("{path}.type")),
        }
    }

    fn parse_record(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let name = self.declared_name(map, enclosing, path)?;
        let aliases = parse_type_aliases(map, name.namespace(), path)?;
        let fields_json = match map.get("fields") {
            Some(JsonValue::Array(fields)) => fields,
            Some(other) => {
                return Err(invalid(path, "fields", format!("expected an array, found {other}")));
            }
            None => return Err(missing(path, "fields")),
        };

        // Placeholder so fields can refer to the record being defined.
        self.names.insert(name.clone(), Schema::Ref(name.clone()));

        let namespace = name.namespace.clone();
        let mut fields = Vec::with_capacity(fields_json.len());
        for (position, field_json) in fields_json.iter().enumerate() {
            let field_path = format!("{path}.fields[{position}]");
            fields.push(self.parse_field(
                field_json,
                namespace.as_deref(),
                position,
                &field_path,
            )?);
        }
        check_field_names(&fields, path)?;

        let record = Schema::Record(Arc::new(RecordSchema::new(
            name.clone(),
            aliases,
            doc(map),
            fields,
            properties(map, NAMED_RESERVED),
        )));
        self.names.insert(name.clone(), record.clone());
        if !has_finite_value(&record, &self.names, &mut Vec::new()) {
            return Err(invalid(
                path,
                "fields",
                format!("record {name} contains itself on every path and has no finite value"),
            ));
        }

        if let Schema::Record(r) = &record {
            for field in &r.fields {
                if let Some(default) = &field.default {
                    default_to_value(default, &field.schema, &self.names).map_err(|source| {
                        SchemaParseError::InvalidDefault {
                            path: format!("{path}.fields[{}].default", field.position),
                            source,
                        }
                    })?;
                }
            }
        }
        Ok(record)
    }

    fn parse_field(
        &mut self,
        json: &JsonValue,
        enclosing: Option<&str>,
        position: usize,
        path: &str,
    ) -> Result<Field> {
        let map = json
            .as_object()
            .ok_or_else(|| {
                invalid(path, "fields", format!("field must be an object, found {json}"))
            })?;
        let name = required_str(map, "name", path)?;
        if !is_valid_identifier(name) {
            return Err(invalid_name(path, name, "field names must match [A-Za-z_][A-Za-z0-9_]*"));
        }
        let type_json = map.get("type").ok_or_else(|| missing(path, "type"))?;
        let schema = self.parse(type_json, enclosing, &format!("{path}.type"))?;

        let order = match map.get("order") {
            None => FieldOrder::Ascending,
            Some(JsonValue::String(order)) => match order.as_str() {
                "ascending" => FieldOrder::Ascending,
                "descending" => FieldOrder::Descending,
                "ignore" => FieldOrder::Ignore,
                other => return Err(invalid(path, "order", format!("unknown order '{other}'"))),
            },
            Some(other) => {
                return Err(invalid(
                    path,
                    "order",
                    format!("expected a string, found {other}"),
                ));
            }
        };

        let aliases = string_list(map, "aliases", path)?;
        for alias in &aliases {
            if !is_valid_identifier(alias) {
                return Err(invalid_name(path, alias, "field aliases must be simple names"));
            }
        }

        Ok(Field {
            name: name.to_string(),
            schema,
            default: map.get("default").cloned(),
            order,
            aliases,
            doc: doc(map),
            properties: properties(map, FIELD_RESERVED),
            position,
        })
    }

    fn parse_enum(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let name = self.declared_name(map, enclosing, path)?;
        let aliases = parse_type_aliases(map, name.namespace(), path)?;
        if !map.contains_key("symbols") {
            return Err(missing(path, "symbols"));
        }
        let symbols = string_list(map, "symbols", path)?;
        let mut seen = HashMap::new();
        for (i, symbol) in symbols.iter().enumerate() {
            if !is_valid_identifier(symbol) {
                return Err(invalid_name(
                    &format!("{path}.symbols[{i}]"),
                    symbol,
                    "enum symbols must be simple names",
                ));
            }
            if seen.insert(symbol.as_str(), i).is_some() {
                return Err(SchemaParseError::DuplicateName {
                    path: format!("{path}.symbols[{i}]"),
                    name: symbol.clone(),
                });
            }
        }
        let default = match map.get("default") {
            None => None,
            Some(JsonValue::String(symbol)) if seen.contains_key(symbol.as_str()) => {
                Some(symbol.clone())
            }
            Some(other) => {
                return Err(invalid(
                    path,
                    "default",
                    format!("{other} is not one of the enum symbols"),
                ));
            }
        };

        let schema = Schema::Enum(Arc::new(EnumSchema {
            name: name.clone(),
            aliases,
            doc: doc(map),
            symbols,
            default,
            properties: properties(map, NAMED_RESERVED),
        }));
        self.names.insert(name, schema.clone());
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let name = self.declared_name(map, enclosing, path)?;
        let aliases = parse_type_aliases(map, name.namespace(), path)?;
        let size = match map.get("size") {
            Some(size) => size
                .as_u64()
                .and_then(|s| usize::try_from(s).ok())
                .ok_or_else(|| {
                    invalid(
                        path,
                        "size",
                        format!("expected a non-negative integer, found {size}"),
                    )
                })?,
            None => return Err(missing(path, "size")),
        };

        let schema = Schema::Fixed(Arc::new(FixedSchema {
            name: name.clone(),
            aliases,
            doc: doc(map),
            size,
            properties: properties(map, NAMED_RESERVED),
        }));
        self.names.insert(name, schema.clone());
        Ok(schema)
    }

    fn parse_array(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let items = map.get("items").ok_or_else(|| missing(path, "items"))?;
        let items = self.parse(items, enclosing, &format!("{path}.items"))?;
        Ok(Schema::Array(Box::new(ArraySchema {
            items,
            properties: properties(map, ARRAY_RESERVED),
        })))
    }

    fn parse_map(
        &mut self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let values = map.get("values").ok_or_else(|| missing(path, "values"))?;
        let values = self.parse(values, enclosing, &format!("{path}.values"))?;
        Ok(Schema::Map(Box::new(MapSchema {
            values,
            properties: properties(map, MAP_RESERVED),
        })))
    }

    fn parse_union(
        &mut self,
        branches: &[JsonValue],
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Schema> {
        let mut variants = Vec::with_capacity(branches.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (i, branch) in branches.iter().enumerate() {
            let branch_path = format!("{path}[{i}]");
            let schema = self.parse(branch, enclosing, &branch_path)?;
            if matches!(schema, Schema::Union(_)) {
                return Err(SchemaParseError::InvalidUnion {
                    path: branch_path,
                    detail: "unions may not immediately contain other unions".to_string(),
                });
            }
            let key = union_branch_key(&schema);
            if let Some(first) = seen.insert(key.clone(), i) {
                return Err(SchemaParseError::InvalidUnion {
                    path: branch_path,
                    detail: format!("branch {i} duplicates branch {first} ({key})"),
                });
            }
            variants.push(schema);
        }
        Ok(Schema::Union(UnionSchema { variants }))
    }

    /// Read, validate and reserve the full name of a named type declaration.
    fn declared_name(
        &self,
        map: &Map<String, JsonValue>,
        enclosing: Option<&str>,
        path: &str,
    ) -> Result<Name> {
        let raw = required_str(map, "name", path)?;
        if !is_valid_fullname(raw) {
            return Err(invalid_name(
                path,
                raw,
                "names must be dot-separated [A-Za-z_][A-Za-z0-9_]* identifiers",
            ));
        }
        let namespace = match map.get("namespace") {
            None => enclosing,
            Some(JsonValue::Null) => None,
            Some(JsonValue::String(ns)) => {
                if !is_valid_namespace(ns) {
                    return Err(invalid_name(path, ns, "invalid namespace"));
                }
                Some(ns.as_str())
            }
            Some(other) => {
                return Err(invalid(path, "namespace", format!("expected a string, found {other}")));
            }
        };
        let name = Name::qualify(raw, namespace);
        if name.namespace.is_none() && Schema::primitive(&name.name).is_some() {
            return Err(invalid_name(path, raw, "primitive type names cannot be redefined"));
        }
        if self.names.contains_key(&name) {
            return Err(SchemaParseError::DuplicateName {
                path: path.to_string(),
                name: name.fullname(),
            });
        }
        Ok(name)
    }
}

/// Key identifying a union branch for duplicate detection: named types by
/// full name, everything else by kind (logical types count as their base).
fn union_branch_key(schema: &Schema) -> String {
    match schema {
        Schema::Logical(logical) => union_branch_key(&logical.base),
        other => match other.name() {
            Some(name) => format!("named type {name}"),
            None => other.type_name().to_string(),
        },
    }
}

/// Field names are unique, and no alias collides with another field's name or alias.
fn check_field_names(fields: &[Field], path: &str) -> Result<()> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    for field in fields {
        if owners.insert(field.name.as_str(), field.position).is_some() {
            return Err(SchemaParseError::DuplicateName {
                path: format!("{path}.fields[{}]", field.position),
                name: field.name.clone(),
            });
        }
    }
    for field in fields {
        for alias in &field.aliases {
            match owners.insert(alias.as_str(), field.position) {
                Some(owner) if owner != field.position => {
                    return Err(SchemaParseError::DuplicateName {
                        path: format!("{path}.fields[{}].aliases", field.position),
                        name: alias.clone(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn parse_type_aliases(
    map: &Map<String, JsonValue>,
    namespace: Option<&str>,
    path: &str,
) -> Result<Vec<Name>> {
    string_list(map, "aliases", path)?
        .into_iter()
        .map(|alias| {
            if is_valid_fullname(&alias) {
                Ok(Name::qualify(&alias, namespace))
            } else {
                Err(invalid_name(path, &alias, "invalid alias"))
            }
        })
        .collect()
}

fn required_str<'a>(
    map: &'a Map<String, JsonValue>,
    attribute: &str,
    path: &str,
) -> Result<&'a str> {
    match map.get(attribute) {
        Some(JsonValue::String(s)) => Ok(s.as_str()),
        Some(other) => Err(invalid(
            path,
            attribute,
            format!("expected a string, found {other}"),
        )),
        None => Err(missing(path, attribute)),
    }
}

fn string_list(map: &Map<String, JsonValue>, attribute: &str, path: &str) -> Result<Vec<String>> {
    match map.get(attribute) {
        None => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        invalid(path, attribute, format!("expected strings, found {item}"))
                    })
            })
            .collect(),
        Some(other) => Err(invalid(path, attribute, format!("expected an array, found {other}"))),
    }
}

fn doc(map: &Map<String, JsonValue>) -> Option<String> {
    map.get("doc").and_then(JsonValue::as_str).map(str::to_string)
}

fn properties(map: &Map<String, JsonValue>, reserved: &[&str]) -> Properties {
    map.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn missing(path: &str, attribute: &str) -> SchemaParseError {
    SchemaParseError::MissingAttribute {
        path: path.to_string(),
        attribute: attribute.to_string(),
    }
}

fn invalid(path: &str, attribute: &str, detail: String) -> SchemaParseError {
    SchemaParseError::InvalidAttribute {
        path: path.to_string(),
        attribute: attribute.to_string(),
        detail,
    }
}

fn invalid_name(path: &str, name: &str, detail: &str) -> SchemaParseError {
    SchemaParseError::InvalidName {
        path: path.to_string(),
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

/// Whether some datum of `schema` is finite. Records on `visiting` are
/// being expanded, so reaching one again is a cycle with no way out.
fn has_finite_value<'a>(
    schema: &'a Schema,
    names: &'a Names,
    visiting: &mut Vec<&'a Name>,
) -> bool {
    match schema {
        Schema::Record(record) => {
            if visiting.contains(&&record.name) {
                return false;
            }
            visiting.push(&record.name);
            let finite = record
                .fields
                .iter()
                .all(|field| has_finite_value(&field.schema, names, visiting));
            visiting.pop();
            finite
        }
        Schema::Union(union) => union
            .variants()
            .iter()
            .any(|branch| has_finite_value(branch, names, visiting)),
        Schema::Logical(logical) => has_finite_value(&logical.base, names, visiting),
        // A placeholder is an enclosing record still being parsed.
        Schema::Ref(name) => match names.get(name) {
            Some(Schema::Ref(_)) | None => !visiting.contains(&name),
            Some(definition) => has_finite_value(definition, names, visiting),
        },
        _ => true,
    }
}
