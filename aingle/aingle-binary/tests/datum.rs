use aingle_binary::{
    DatumError, DatumReader, DatumWriter, Decoder, Encoder, WriteOptions, from_binary, to_binary,
};
use aingle_core::{Decimal, ParsedSchema, Value, parse_schema, uuid::Uuid};

fn schema(text: &str) -> ParsedSchema {
    parse_schema(text).unwrap()
}

fn round_trip(schema: &ParsedSchema, value: &Value) -> Value {
    let bytes = to_binary(schema, value).unwrap();
    from_binary(schema, &bytes).unwrap()
}

const PERSON: &str = r#"{
    "type": "record", "name": "Person", "namespace": "test",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "age", "type": "int"},
        {"name": "email", "type": ["null", "string"], "default": null},
        {"name": "tags", "type": {"type": "array", "items": "string"}, "default": []}
    ]
}"#;

#[test]
fn record_encoding_is_fields_in_order() {
    let s = schema(PERSON);
    let value = Value::record([
        ("name", Value::string("Ann")),
        ("age", Value::Int(30)),
        ("email", Value::union(1, Value::string("a@b"))),
        ("tags", Value::Array(vec![])),
    ]);
    let bytes = to_binary(&s, &value).unwrap();
    assert_eq!(&bytes[..], b"\x06Ann\x3c\x02\x06a@b\x00");
    assert_eq!(from_binary(&s, &bytes).unwrap(), value);
}

#[test]
fn missing_fields_are_written_from_defaults() {
    let s = schema(PERSON);
    let partial = Value::record([("name", Value::string("Bo")), ("age", Value::Int(7))]);
    let read = round_trip(&s, &partial);
    assert_eq!(read.field("email"), Some(&Value::union(0, Value::Null)));
    assert_eq!(read.field("tags"), Some(&Value::Array(vec![])));

    let err = to_binary(&s, &Value::record([("name", Value::string("Bo"))])).unwrap_err();
    let DatumError::InvalidDatum { path, .. } = err else {
        panic!("expected invalid datum");
    };
    assert_eq!(path, "$.age");
}

#[test]
fn unknown_record_fields_are_rejected() {
    let s = schema(PERSON);
    let value = Value::record([
        ("name", Value::string("Ann")),
        ("age", Value::Int(1)),
        ("nickname", Value::string("A")),
    ]);
    assert!(matches!(
        to_binary(&s, &value),
        Err(DatumError::InvalidDatum { .. })
    ));
}

#[test]
fn failed_write_leaves_output_untouched() {
    let s = schema(r#"{"type": "array", "items": "int"}"#);
    let mut writer = DatumWriter::new(s);
    let mut out = Encoder::new();
    writer
        .write(&Value::Array(vec![Value::Int(1)]), &mut out)
        .unwrap();
    let before = out.as_slice().to_vec();

    let bad = Value::Array(vec![Value::Int(2), Value::string("three")]);
    let err = writer.write(&bad, &mut out).unwrap_err();
    let DatumError::InvalidDatum { path, .. } = err else {
        panic!("expected invalid datum");
    };
    assert_eq!(path, "$[1]");
    assert_eq!(out.as_slice(), before.as_slice());
}

#[test]
fn large_arrays_are_split_into_blocks() {
    let s = schema(r#"{"type": "array", "items": "long"}"#);
    let items: Vec<Value> = (0..10_000).map(Value::Long).collect();
    let value = Value::Array(items);

    let mut writer = DatumWriter::new(s.clone());
    let bytes = writer.encode(&value).unwrap();
    let mut d = Decoder::new(bytes.clone());
    let mut counts = Vec::new();
    loop {
        let header = d.read_block_header().unwrap();
        if header.count == 0 {
            break;
        }
        counts.push(header.count);
        for _ in 0..header.count {
            d.skip_long().unwrap();
        }
    }
    assert_eq!(counts, vec![1000; 10]);
    assert_eq!(from_binary(&s, &bytes).unwrap(), value);
}

#[test]
fn sized_blocks_can_be_skipped_wholesale() {
    let s = schema(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "m", "type": {"type": "map", "values": "string"}},
            {"name": "n", "type": "int"}
        ]}"#,
    );
    let value = Value::record([
        (
            "m",
            Value::Map(vec![
                ("a".to_string(), Value::string("x")),
                ("b".to_string(), Value::string("yy")),
                ("c".to_string(), Value::string("zzz")),
            ]),
        ),
        ("n", Value::Int(-5)),
    ]);
    let options = WriteOptions::default()
        .with_max_block_items(2)
        .with_byte_length_prefix(true);
    let bytes = DatumWriter::new(s.clone())
        .with_options(options)
        .encode(&value)
        .unwrap();

    let mut d = Decoder::new(bytes.clone());
    let first = d.read_block_header().unwrap();
    assert_eq!(first.count, 2);
    assert_eq!(first.byte_len, Some(9));

    assert_eq!(from_binary(&s, &bytes).unwrap(), value);

    let reader = DatumReader::from_schema(s);
    let mut d = Decoder::new(bytes);
    reader.skip(&mut d).unwrap();
    assert!(d.is_empty());
}

#[test]
fn bare_values_pick_a_union_branch() {
    let s = schema(r#"["null", "int", "double", "string"]"#);
    let encode = |v: Value| to_binary(&s, &v).unwrap().to_vec();
    assert_eq!(encode(Value::Null), [0x00]);
    assert_eq!(encode(Value::Int(1)), [0x02, 0x02]);
    assert_eq!(encode(Value::string("")), [0x06, 0x00]);
    // No long branch: widened to double.
    assert_eq!(encode(Value::Long(1))[0], 0x04);
    assert!(to_binary(&s, &Value::Boolean(true)).is_err());

    assert_eq!(
        round_trip(&s, &Value::Int(9)),
        Value::union(1, Value::Int(9))
    );
    assert!(matches!(
        to_binary(&s, &Value::union(4, Value::Null)),
        Err(DatumError::InvalidDatum { .. })
    ));
}

#[test]
fn enums_and_fixed_are_checked() {
    let s = schema(r#"{"type": "enum", "name": "Suit", "symbols": ["SPADES", "HEARTS"]}"#);
    assert_eq!(to_binary(&s, &Value::string("HEARTS")).unwrap()[..], [0x02]);
    assert_eq!(
        round_trip(&s, &Value::Enum(0, "SPADES".to_string())),
        Value::Enum(0, "SPADES".to_string())
    );
    assert!(to_binary(&s, &Value::string("CLUBS")).is_err());

    let s = schema(r#"{"type": "fixed", "name": "Md5", "size": 4}"#);
    assert_eq!(
        round_trip(&s, &Value::Bytes(vec![1, 2, 3, 4])),
        Value::Fixed(vec![1, 2, 3, 4])
    );
    assert!(to_binary(&s, &Value::Fixed(vec![1, 2, 3])).is_err());
}

#[test]
fn recursive_records_round_trip() {
    let s = schema(
        r#"{"type": "record", "name": "Node", "fields": [
            {"name": "value", "type": "int"},
            {"name": "next", "type": ["null", "Node"]}
        ]}"#,
    );
    let list = Value::record([
        ("value", Value::Int(1)),
        (
            "next",
            Value::union(
                1,
                Value::record([
                    ("value", Value::Int(2)),
                    ("next", Value::union(0, Value::Null)),
                ]),
            ),
        ),
    ]);
    assert_eq!(round_trip(&s, &list), list);
}

#[test]
fn logical_values_use_their_base_encoding() {
    let s = schema(r#"{"type": "int", "logicalType": "date"}"#);
    assert_eq!(to_binary(&s, &Value::Date(1)).unwrap()[..], [0x02]);
    assert_eq!(round_trip(&s, &Value::Int(3)), Value::Date(3));

    let s = schema(r#"{"type": "bytes", "logicalType": "decimal", "precision": 5, "scale": 2}"#);
    let price = Value::Decimal(Decimal::from_i128(-12345, 2));
    assert_eq!(round_trip(&s, &price), price);
    let too_precise = Value::Decimal(Decimal::from_i128(123456, 2));
    assert!(to_binary(&s, &too_precise).is_err());
    let wrong_scale = Value::Decimal(Decimal::from_i128(1, 3));
    assert!(to_binary(&s, &wrong_scale).is_err());

    let s = schema(
        r#"{"type": "fixed", "name": "D", "size": 4,
            "logicalType": "decimal", "precision": 9, "scale": 0}"#,
    );
    let bytes = to_binary(&s, &Value::Decimal(Decimal::from_i128(-2, 0))).unwrap();
    assert_eq!(bytes[..], [0xff, 0xff, 0xff, 0xfe]);

    let s = schema(r#"{"type": "string", "logicalType": "uuid"}"#);
    let id = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
    let bytes = to_binary(&s, &Value::Uuid(id)).unwrap();
    assert_eq!(&bytes[1..], b"01234567-89ab-cdef-0123-456789abcdef");
    assert_eq!(from_binary(&s, &bytes).unwrap(), Value::Uuid(id));
}

#[test]
fn truncated_data_is_a_decode_error() {
    let s = schema(PERSON);
    let err = from_binary(&s, b"\x06An").unwrap_err();
    assert!(err.is_unexpected_end());
    let DatumError::Decode { path, .. } = err else {
        panic!("expected decode error");
    };
    assert_eq!(path, "$.name");
}

#[test]
fn block_counts_must_fit_the_input() {
    let mut huge = Encoder::new();
    huge.write_long(1 << 33);
    huge.write_long(0);

    let nulls = schema(r#"{"type": "array", "items": "null"}"#);
    assert!(matches!(
        from_binary(&nulls, huge.as_slice()),
        Err(DatumError::InvalidDatum { .. })
    ));
    let reader = DatumReader::from_schema(nulls);
    assert!(matches!(
        reader.skip(&mut Decoder::from_slice(huge.as_slice())),
        Err(DatumError::InvalidDatum { .. })
    ));

    // Map entries cost at least their key's length prefix.
    let empty_records = schema(
        r#"{"type": "map", "values": {"type": "record", "name": "E", "fields": []}}"#,
    );
    assert!(matches!(
        from_binary(&empty_records, huge.as_slice()),
        Err(DatumError::InvalidDatum { .. })
    ));

    let mut short = Encoder::new();
    short.write_long(1000);
    short.write_long(1);
    short.write_long(0);
    let longs = schema(r#"{"type": "array", "items": "long"}"#);
    let err = from_binary(&longs, short.as_slice()).unwrap_err();
    let DatumError::InvalidDatum { path, .. } = err else {
        panic!("expected InvalidDatum");
    };
    assert_eq!(path, "$");
}

#[test]
fn many_null_items_still_read_back() {
    let nulls = schema(r#"{"type": "array", "items": "null"}"#);
    let value = Value::Array(vec![Value::Null; 5000]);
    assert_eq!(round_trip(&nulls, &value), value);
}

#[test]
fn union_branches_accept_symbol_and_bytes_shorthands() {
    let suits = schema(
        r#"["null", {"type": "enum", "name": "Suit", "symbols": ["HEARTS", "SPADES"]}]"#,
    );
    let bytes = to_binary(&suits, &Value::string("SPADES")).unwrap();
    assert_eq!(&bytes[..], b"\x02\x02");
    assert_eq!(
        from_binary(&suits, &bytes).unwrap(),
        Value::union(1, Value::Enum(1, "SPADES".to_string()))
    );

    // A string branch still takes a plain string first.
    let text_or_suit = schema(
        r#"["string", {"type": "enum", "name": "Suit", "symbols": ["HEARTS", "SPADES"]}]"#,
    );
    let bytes = to_binary(&text_or_suit, &Value::string("SPADES")).unwrap();
    assert_eq!(&bytes[..], b"\x00\x0cSPADES");

    let ids = schema(r#"["null", {"type": "fixed", "name": "Id", "size": 2}]"#);
    let bytes = to_binary(&ids, &Value::Bytes(vec![1, 2])).unwrap();
    assert_eq!(&bytes[..], b"\x02\x01\x02");
    assert!(matches!(
        to_binary(&ids, &Value::Bytes(vec![1, 2, 3])),
        Err(DatumError::InvalidDatum { .. })
    ));
}
