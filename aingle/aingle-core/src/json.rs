//! Conversions between JSON values and [`Value`]s.
//!
//! The JSON side uses the notation of schema default values: `bytes` and
//! `fixed` are strings whose characters are code points 0-255, enums are
//! symbol strings, records and maps are objects. This is not a data
//! encoding; it exists for defaults and for tools.

use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    error::DefaultValueError,
    schema::{Names, Schema},
    value::Value,
};

type Result<T> = std::result::Result<T, DefaultValueError>;

#[derive(Clone, Copy)]
enum UnionRule {
    /// Field defaults for unions always use the first branch.
    FirstBranch,
    /// Use the first branch the JSON value converts under.
    AnyBranch,
}

/// Convert a field default to a [`Value`] shaped by `schema`.
///
/// A default for a union-typed field must match the union's first branch.
pub fn default_to_value(json: &JsonValue, schema: &Schema, names: &Names) -> Result<Value> {
    convert(json, schema, names, UnionRule::FirstBranch, "$")
}

/// Convert a JSON value in default-value notation to a [`Value`] shaped by
/// `schema`, trying union branches in order.
///
/// Record fields absent from the JSON object take their declared default.
pub fn json_to_value(json: &JsonValue, schema: &Schema, names: &Names) -> Result<Value> {
    convert(json, schema, names, UnionRule::AnyBranch, "$")
}

fn convert(
    json: &JsonValue,
    schema: &Schema,
    names: &Names,
    rule: UnionRule,
    path: &str,
) -> Result<Value> {
    let mismatch = || {
        DefaultValueError::new(path, format!("expected {}, found {json}", schema.type_name()))
    };
    match schema {
        Schema::Null => json.is_null().then_some(Value::Null).ok_or_else(mismatch),
        Schema::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
        Schema::Int => json
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        Schema::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
        Schema::Float => json_to_f64(json).map(|v| Value::Float(v as f32)).ok_or_else(mismatch),
        Schema::Double => json_to_f64(json).map(Value::Double).ok_or_else(mismatch),
        Schema::Bytes => json_to_bytes(json).map(Value::Bytes).ok_or_else(mismatch),
        Schema::String => json.as_str().map(Value::string).ok_or_else(mismatch),
        Schema::Fixed(fixed) => {
            let bytes = json_to_bytes(json).ok_or_else(mismatch)?;
            if bytes.len() != fixed.size {
                return Err(DefaultValueError::new(
                    path,
                    format!(
                        "expected {} bytes for fixed {}, found {}",
                        fixed.size,
                        fixed.name,
                        bytes.len()
                    ),
                ));
            }
            Ok(Value::Fixed(bytes))
        }
        Schema::Enum(enum_schema) => {
            let symbol = json.as_str().ok_or_else(mismatch)?;
            let index = enum_schema.index_of(symbol).ok_or_else(|| {
                DefaultValueError::new(
                    path,
                    format!("'{symbol}' is not a symbol of enum {}", enum_schema.name),
                )
            })?;
            Ok(Value::Enum(index as u32, symbol.to_string()))
        }
        Schema::Array(array) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| convert(item, &array.items, names, rule, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Schema::Map(map) => {
            let entries = json.as_object().ok_or_else(mismatch)?;
            entries
                .iter()
                .map(|(key, value)| {
                    let value = convert(value, &map.values, names, rule, &format!("{path}.{key}"))?;
                    Ok((key.clone(), value))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Map)
        }
        Schema::Record(record) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let field_path = format!("{path}.{}", field.name);
                let value = match (object.get(&field.name), &field.default) {
                    (Some(value), _) => convert(value, &field.schema, names, rule, &field_path)?,
                    (None, Some(default)) => convert(
                        default,
                        &field.schema,
                        names,
                        UnionRule::FirstBranch,
                        &field_path,
                    )?,
                    (None, None) => {
                        return Err(DefaultValueError::new(
                            field_path,
                            format!("missing field of record {} without a default", record.name),
                        ));
                    }
                };
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(fields))
        }
        Schema::Union(union) => match rule {
            UnionRule::FirstBranch => {
                let first = union.variants.first().ok_or_else(|| {
                    DefaultValueError::new(path, "an empty union has no default")
                })?;
                let value = convert(json, first, names, rule, &format!("{path}[0]"))?;
                Ok(Value::union(0, value))
            }
            UnionRule::AnyBranch => union
                .variants
                .iter()
                .enumerate()
                .find_map(|(i, branch)| {
                    convert(json, branch, names, rule, path)
                        .ok()
                        .map(|v| Value::union(i as u32, v))
                })
                .ok_or_else(|| {
                    DefaultValueError::new(path, format!("{json} matches no branch of the union"))
                }),
        },
        Schema::Logical(logical) => {
            let base = convert(json, &logical.base, names, rule, path)?;
            base.to_logical(&logical.logical)
                .map_err(|e| DefaultValueError::new(path, e.to_string()))
        }
        Schema::Ref(name) => match names.get(name) {
            Some(Schema::Ref(_)) | None => Err(DefaultValueError::new(
                path,
                format!("type {name} is not defined"),
            )),
            Some(definition) => convert(json, definition, names, rule, path),
        },
    }
}

fn json_to_f64(json: &JsonValue) -> Option<f64> {
    match json {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn json_to_bytes(json: &JsonValue) -> Option<Vec<u8>> {
    json.as_str()?
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

fn bytes_to_json(bytes: &[u8]) -> JsonValue {
    JsonValue::String(bytes.iter().map(|&b| char::from(b)).collect())
}

fn f64_to_json(v: f64) -> JsonValue {
    match Number::from_f64(v) {
        Some(n) => JsonValue::Number(n),
        None if v.is_nan() => JsonValue::String("NaN".to_string()),
        None if v > 0.0 => JsonValue::String("Infinity".to_string()),
        None => JsonValue::String("-Infinity".to_string()),
    }
}

/// Render a [`Value`] as JSON for display.
///
/// Union wrappers are dropped, logical values render as their natural text
/// (decimals and UUIDs as strings, dates and times as numbers).
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(v) => JsonValue::Bool(*v),
        Value::Int(v) | Value::Date(v) | Value::TimeMillis(v) => JsonValue::from(*v),
        Value::Long(v)
        | Value::TimeMicros(v)
        | Value::TimestampMillis(v)
        | Value::TimestampMicros(v) => JsonValue::from(*v),
        Value::Float(v) => f64_to_json(f64::from(*v)),
        Value::Double(v) => f64_to_json(*v),
        Value::Bytes(b) | Value::Fixed(b) => bytes_to_json(b),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Enum(_, symbol) => JsonValue::String(symbol.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) | Value::Record(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Union(_, inner) => value_to_json(inner),
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::Uuid(u) => JsonValue::String(u.hyphenated().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bytes_use_latin1_code_points() {
        assert_eq!(json_to_bytes(&json!("\u{00ff}a")), Some(vec![0xff, b'a']));
        assert_eq!(json_to_bytes(&json!("\u{0100}")), None);
        assert_eq!(bytes_to_json(&[0xff, b'a']), json!("\u{00ff}a"));
    }

    #[test]
    fn non_finite_doubles_render_as_strings() {
        assert_eq!(f64_to_json(f64::NAN), json!("NaN"));
        assert_eq!(json_to_f64(&json!("-Infinity")), Some(f64::NEG_INFINITY));
    }
}
