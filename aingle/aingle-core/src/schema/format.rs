use std::{collections::HashSet, fmt};

use serde_json::{Map, Value as JsonValue, json};

use super::{FieldOrder, LogicalType, Name, Names, ParsedSchema, Properties, Schema};

impl ParsedSchema {
    /// Full JSON rendering, including documentation, aliases, defaults,
    /// logical types and custom properties.
    ///
    /// Parsing the result yields a schema equal to `self`.
    pub fn to_json(&self) -> JsonValue {
        let mut seen = HashSet::new();
        schema_to_json(&self.root, &self.names, None, &mut seen)
    }
}

impl fmt::Display for ParsedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json().to_string())
    }
}

fn schema_to_json(
    schema: &Schema,
    names: &Names,
    enclosing: Option<&str>,
    seen: &mut HashSet<Name>,
) -> JsonValue {
    match schema {
        Schema::Record(record) => {
            if !seen.insert(record.name.clone()) {
                return JsonValue::String(record.name.fullname());
            }
            let mut out = named_header(
                "record",
                &record.name,
                &record.aliases,
                &record.doc,
                enclosing,
            );
            let namespace = record.name.namespace();
            let fields = record
                .fields
                .iter()
                .map(|field| {
                    let mut f = Map::new();
                    f.insert("name".to_string(), json!(field.name));
                    f.insert(
                        "type".to_string(),
                        schema_to_json(&field.schema, names, namespace, seen),
                    );
                    if let Some(default) = &field.default {
                        f.insert("default".to_string(), default.clone());
                    }
                    if field.order != FieldOrder::Ascending {
                        f.insert("order".to_string(), json!(field.order.as_str()));
                    }
                    if !field.aliases.is_empty() {
                        f.insert("aliases".to_string(), json!(field.aliases));
                    }
                    if let Some(doc) = &field.doc {
                        f.insert("doc".to_string(), json!(doc));
                    }
                    extend_properties(&mut f, &field.properties);
                    JsonValue::Object(f)
                })
                .collect();
            out.insert("fields".to_string(), JsonValue::Array(fields));
            extend_properties(&mut out, &record.properties);
            JsonValue::Object(out)
        }
        Schema::Enum(enum_schema) => {
            if !seen.insert(enum_schema.name.clone()) {
                return JsonValue::String(enum_schema.name.fullname());
            }
            let mut out = named_header(
                "enum",
                &enum_schema.name,
                &enum_schema.aliases,
                &enum_schema.doc,
                enclosing,
            );
            out.insert("symbols".to_string(), json!(enum_schema.symbols));
            if let Some(default) = &enum_schema.default {
                out.insert("default".to_string(), json!(default));
            }
            extend_properties(&mut out, &enum_schema.properties);
            JsonValue::Object(out)
        }
        Schema::Fixed(fixed) => {
            if !seen.insert(fixed.name.clone()) {
                return JsonValue::String(fixed.name.fullname());
            }
            let mut out = named_header("fixed", &fixed.name, &fixed.aliases, &fixed.doc, enclosing);
            out.insert("size".to_string(), json!(fixed.size));
            extend_properties(&mut out, &fixed.properties);
            JsonValue::Object(out)
        }
        Schema::Array(array) => {
            let mut out = Map::new();
            out.insert("type".to_string(), json!("array"));
            out.insert(
                "items".to_string(),
                schema_to_json(&array.items, names, enclosing, seen),
            );
            extend_properties(&mut out, &array.properties);
            JsonValue::Object(out)
        }
        Schema::Map(map) => {
            let mut out = Map::new();
            out.insert("type".to_string(), json!("map"));
            out.insert(
                "values".to_string(),
                schema_to_json(&map.values, names, enclosing, seen),
            );
            extend_properties(&mut out, &map.properties);
            JsonValue::Object(out)
        }
        Schema::Union(union) => JsonValue::Array(
            union
                .variants
                .iter()
                .map(|variant| schema_to_json(variant, names, enclosing, seen))
                .collect(),
        ),
        Schema::Logical(logical) => {
            let mut out = match schema_to_json(&logical.base, names, enclosing, seen) {
                JsonValue::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("type".to_string(), other);
                    map
                }
            };
            out.insert("logicalType".to_string(), json!(logical.logical.name()));
            if let LogicalType::Decimal { precision, scale } = logical.logical {
                out.insert("precision".to_string(), json!(precision));
                out.insert("scale".to_string(), json!(scale));
            }
            JsonValue::Object(out)
        }
        Schema::Ref(name) => match names.get(name) {
            Some(definition) if !seen.contains(name) && !matches!(definition, Schema::Ref(_)) => {
                schema_to_json(definition, names, enclosing, seen)
            }
            _ => JsonValue::String(name.fullname()),
        },
        primitive => JsonValue::String(primitive.type_name().to_string()),
    }
}

/// `type`, `name`, `namespace` (when it differs from the enclosing one),
/// `aliases` and `doc` of a named type.
fn named_header(
    ty: &str,
    name: &Name,
    aliases: &[Name],
    doc: &Option<String>,
    enclosing: Option<&str>,
) -> Map<String, JsonValue> {
    let mut out = Map::new();
    out.insert("type".to_string(), json!(ty));
    out.insert("name".to_string(), json!(name.name));
    if name.namespace() != enclosing {
        out.insert(
            "namespace".to_string(),
            json!(name.namespace().unwrap_or_default()),
        );
    }
    if !aliases.is_empty() {
        let aliases: Vec<String> = aliases.iter().map(Name::fullname).collect();
        out.insert("aliases".to_string(), json!(aliases));
    }
    if let Some(doc) = doc {
        out.insert("doc".to_string(), json!(doc));
    }
    out
}

fn extend_properties(out: &mut Map<String, JsonValue>, properties: &Properties) {
    for (key, value) in properties {
        out.insert(key.clone(), value.clone());
    }
}
