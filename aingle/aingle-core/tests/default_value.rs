use aingle_core::{
    Decimal, ParsedSchema, Value, default_to_value, json_to_value, parse_schema, value_to_json,
};
use serde_json::json;

fn schema(text: &str) -> ParsedSchema {
    parse_schema(text).unwrap()
}

fn convert(schema: &ParsedSchema, json: serde_json::Value) -> Value {
    json_to_value(&json, schema.root(), schema.names()).unwrap()
}

#[test]
fn primitives_follow_default_notation() {
    assert_eq!(convert(&schema(r#""int""#), json!(-3)), Value::Int(-3));
    assert_eq!(convert(&schema(r#""long""#), json!(1i64 << 40)), Value::Long(1 << 40));
    assert_eq!(convert(&schema(r#""float""#), json!(1.5)), Value::Float(1.5));
    assert_eq!(convert(&schema(r#""double""#), json!(2)), Value::Double(2.0));
    assert_eq!(
        convert(&schema(r#""bytes""#), json!("\u{0000}\u{00ff}")),
        Value::Bytes(vec![0, 255])
    );
    assert_eq!(convert(&schema(r#""null""#), json!(null)), Value::Null);
    assert_eq!(convert(&schema(r#""boolean""#), json!(true)), Value::Boolean(true));
}

#[test]
fn mismatched_json_reports_path() {
    let s = schema(r#"{"type": "array", "items": "int"}"#);
    let err = json_to_value(&json!([1, "two"]), s.root(), s.names()).unwrap_err();
    assert_eq!(err.path, "$[1]");

    let s = schema(r#"{"type": "fixed", "name": "F", "size": 2}"#);
    assert!(json_to_value(&json!("abc"), s.root(), s.names()).is_err());
}

#[test]
fn record_fields_fall_back_to_defaults() {
    let s = schema(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "string", "default": "x"},
            {"name": "c", "type": {"type": "enum", "name": "E", "symbols": ["P", "Q"]},
             "default": "Q"}
        ]}"#,
    );
    let value = convert(&s, json!({"a": 1}));
    assert_eq!(
        value,
        Value::record([
            ("a", Value::Int(1)),
            ("b", Value::string("x")),
            ("c", Value::Enum(1, "Q".to_string())),
        ])
    );

    let err = json_to_value(&json!({"b": "y"}), s.root(), s.names()).unwrap_err();
    assert_eq!(err.path, "$.a");
}

#[test]
fn union_defaults_use_first_branch_only() {
    let s = schema(r#"["null", "int"]"#);
    assert_eq!(
        default_to_value(&json!(null), s.root(), s.names()).unwrap(),
        Value::union(0, Value::Null)
    );
    assert!(default_to_value(&json!(4), s.root(), s.names()).is_err());
    assert_eq!(convert(&s, json!(4)), Value::union(1, Value::Int(4)));
}

#[test]
fn logical_values_are_converted() {
    let s = schema(r#"{"type": "bytes", "logicalType": "decimal", "precision": 6, "scale": 2}"#);
    assert_eq!(
        convert(&s, json!("\u{0004}\u{00d2}")),
        Value::Decimal(Decimal::from_i128(1234, 2))
    );

    let s = schema(r#"{"type": "string", "logicalType": "uuid"}"#);
    let value = convert(&s, json!("67e55044-10b1-426f-9247-bb680e5fe0c8"));
    assert_eq!(
        value_to_json(&value),
        json!("67e55044-10b1-426f-9247-bb680e5fe0c8")
    );
}

#[test]
fn display_rendering_drops_union_wrappers() {
    let value = Value::record([
        ("id", Value::Long(7)),
        ("tag", Value::union(1, Value::string("t"))),
        ("raw", Value::Fixed(vec![0x41, 0xe9])),
        ("ratio", Value::Double(f64::INFINITY)),
        ("price", Value::Decimal(Decimal::from_i128(-1050, 2))),
        ("m", Value::Map(vec![("k".to_string(), Value::Null)])),
    ]);
    assert_eq!(
        value_to_json(&value),
        json!({
            "id": 7,
            "tag": "t",
            "raw": "A\u{00e9}",
            "ratio": "Infinity",
            "price": "-10.50",
            "m": {"k": null}
        })
    );
}
