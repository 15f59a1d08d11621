use std::{
    fs::OpenOptions,
    io::{self, Cursor},
};

use aingle::{
    CODEC_KEY, Codec, CodecRegistry, DeflateCodec, FileError, FileReader, FileReaderBuilder,
    FileWriter, FileWriterBuilder, MAGIC, SCHEMA_KEY,
    binary::WriteOptions,
    core::{ParsedSchema, Value, parse_schema},
};

const EVENT: &str = r#"{
    "type": "record", "name": "Event", "namespace": "test",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "label", "type": "string"}
    ]
}"#;

fn schema(text: &str) -> ParsedSchema {
    parse_schema(text).unwrap()
}

fn event(id: i64) -> Value {
    Value::record([
        ("id", Value::Long(id)),
        ("label", Value::string(format!("event-{id}"))),
    ])
}

fn write_events(builder: FileWriterBuilder, ids: impl IntoIterator<Item = i64>) -> Vec<u8> {
    let mut writer = builder.build(Vec::new()).unwrap();
    for id in ids {
        writer.append(&event(id)).unwrap();
    }
    writer.close().unwrap()
}

fn read_all(bytes: &[u8]) -> Vec<Value> {
    FileReader::open(Cursor::new(bytes))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn records_survive_many_blocks() {
    let builder = FileWriterBuilder::new(schema(EVENT))
        .with_codec(Box::new(DeflateCodec::default()))
        .with_sync_interval(256)
        .with_metadata("origin", "unit-test");
    let bytes = write_events(builder, 0..500);
    assert_eq!(bytes[..4], MAGIC);

    let reader = FileReader::open(Cursor::new(&bytes)).unwrap();
    assert_eq!(reader.codec_name(), "deflate");
    assert_eq!(reader.meta_string(CODEC_KEY), Some("deflate"));
    assert_eq!(reader.meta_string("origin"), Some("unit-test"));
    assert_eq!(
        reader.metadata_keys().collect::<Vec<_>>(),
        [SCHEMA_KEY, CODEC_KEY, "origin"]
    );
    assert_eq!(reader.writer_schema(), &schema(EVENT));

    let values: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(values.len(), 500);
    assert!(values.iter().zip(0..).all(|(v, id)| *v == event(id)));
}

#[test]
fn empty_file_has_no_records() {
    let bytes = write_events(FileWriterBuilder::new(schema(EVENT)), []);
    assert!(read_all(&bytes).is_empty());
}

#[test]
fn reader_schema_reshapes_records() {
    let bytes = write_events(FileWriterBuilder::new(schema(EVENT)), 0..3);
    let reader_schema = schema(
        r#"{"type": "record", "name": "Event", "namespace": "test", "fields": [
            {"name": "id", "type": "double"},
            {"name": "source", "type": "string", "default": "unknown"}
        ]}"#,
    );
    let values: Vec<Value> = FileReaderBuilder::new()
        .with_reader_schema(reader_schema)
        .build(Cursor::new(bytes))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        values[2],
        Value::record([
            ("id", Value::Double(2.0)),
            ("source", Value::string("unknown")),
        ])
    );
}

#[test]
fn bad_magic_is_rejected() {
    let err = FileReader::open(Cursor::new(b"Nope, just text".to_vec()))
        .err()
        .unwrap();
    let FileError::NotAContainerFile { found } = err else {
        panic!("expected NotAContainerFile");
    };
    assert_eq!(found, b"Nope");

    assert!(matches!(
        FileReader::open(Cursor::new(b"Ob".to_vec())),
        Err(FileError::NotAContainerFile { .. })
    ));
}

#[test]
fn reserved_metadata_keys_are_rejected() {
    let result = FileWriterBuilder::new(schema(EVENT))
        .with_metadata("aingle.custom", "x")
        .build(Vec::new());
    assert!(matches!(
        result,
        Err(FileError::ReservedMetadataKey { key }) if key == "aingle.custom"
    ));
}

/// Reverses every block; enough to prove the payload went through the codec.
struct ReverseCodec;

impl Codec for ReverseCodec {
    fn name(&self) -> &str {
        "reverse"
    }

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.iter().rev().copied().collect())
    }

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.compress(data)
    }
}

#[test]
fn unknown_codec_needs_registration() {
    let builder = FileWriterBuilder::new(schema(EVENT)).with_codec(Box::new(ReverseCodec));
    let bytes = write_events(builder, 0..10);

    let err = FileReader::open(Cursor::new(bytes.clone())).err().unwrap();
    assert!(matches!(err, FileError::UnsupportedCodec { name } if name == "reverse"));

    let codecs = CodecRegistry::default().with_codec("reverse", || Box::new(ReverseCodec));
    let values: Vec<Value> = FileReaderBuilder::new()
        .with_codecs(codecs)
        .build(Cursor::new(bytes))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(values.len(), 10);
}

#[test]
fn seek_to_a_synced_position() {
    let mut writer = FileWriterBuilder::new(schema(EVENT))
        .build(Vec::new())
        .unwrap();
    for id in 0..10 {
        writer.append(&event(id)).unwrap();
    }
    let position = writer.sync().unwrap();
    for id in 10..15 {
        writer.append(&event(id)).unwrap();
    }
    let bytes = writer.close().unwrap();

    let mut reader = FileReader::open(Cursor::new(bytes)).unwrap();
    reader.seek(position).unwrap();
    let rest: Vec<Value> = reader.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(rest, (10..15).map(event).collect::<Vec<_>>());
    assert_eq!(reader.previous_sync(), position);
}

#[test]
fn corrupt_block_is_contained() {
    let strings = schema(r#""string""#);
    let mut writer = FileWriterBuilder::new(strings)
        .with_sync_marker([0xa5; 16])
        .build(Vec::new())
        .unwrap();
    let mut block_starts = Vec::new();
    for block in 0..3 {
        for _ in 0..3 {
            writer.append(&Value::string(format!("b{block}x"))).unwrap();
        }
        block_starts.push(writer.sync().unwrap());
    }
    let mut bytes = writer.close().unwrap();

    // Second block: count (1 byte), size (1 byte), then the first string's
    // length prefix, replaced by a negative length.
    let second = block_starts[0] as usize;
    bytes[second + 2] = 0x7f;

    let results: Vec<Result<Value, FileError>> =
        FileReader::open(Cursor::new(&bytes)).unwrap().collect();
    assert_eq!(results.len(), 7);
    assert!(results[..3].iter().all(Result::is_ok));
    assert!(matches!(results[3], Err(FileError::Datum(_))));
    assert_eq!(
        results[4..]
            .iter()
            .map(|r| r.as_ref().unwrap().clone())
            .collect::<Vec<_>>(),
        vec![Value::string("b2x"); 3]
    );

    // Scanning from just before the third block's leading marker finds it.
    let third = block_starts[1];
    let mut reader = FileReader::open(Cursor::new(&bytes)).unwrap();
    reader.sync(third - 20).unwrap();
    assert_eq!(reader.previous_sync(), third);
    assert_eq!(
        reader.next().unwrap().unwrap(),
        Value::string("b2x")
    );
}

#[test]
fn sync_marker_mismatch_is_detected() {
    let mut bytes = write_events(
        FileWriterBuilder::new(schema(EVENT)).with_sync_marker([7; 16]),
        0..3,
    );
    let last = bytes.len() - 1;
    bytes[last] = 8;
    let results: Vec<_> = FileReader::open(Cursor::new(bytes)).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(FileError::SyncMarkerMismatch { .. })
    ));
}

#[test]
fn truncated_block_is_an_error() {
    let mut bytes = write_events(FileWriterBuilder::new(schema(EVENT)), 0..3);
    bytes.truncate(bytes.len() - 20);
    let results: Vec<_> = FileReader::open(Cursor::new(bytes)).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn splits_partition_the_records() {
    let builder = FileWriterBuilder::new(schema(EVENT)).with_sync_interval(200);
    let bytes = write_events(builder, 0..1000);
    let len = bytes.len() as u64;
    let splits = 4;
    let split_len = len.div_ceil(splits);

    let mut seen = Vec::new();
    for split in 0..splits {
        let start = split * split_len;
        let end = (start + split_len).min(len);
        let mut reader = FileReader::open(Cursor::new(&bytes)).unwrap();
        reader.sync(start).unwrap();
        while reader.has_next().unwrap() && !reader.past_sync(end) {
            seen.push(reader.next_value().unwrap().unwrap());
        }
    }
    assert_eq!(seen, (0..1000).map(event).collect::<Vec<_>>());
}

#[test]
fn append_to_existing_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let builder = FileWriterBuilder::new(schema(EVENT))
        .with_codec(Box::new(DeflateCodec::new(6)));
    let mut writer = builder.build(file.reopen().unwrap()).unwrap();
    for id in 0..5 {
        writer.append(&event(id)).unwrap();
    }
    writer.close().unwrap();

    let handle = OpenOptions::new()
        .read(true)
        .write(true)
        .open(file.path())
        .unwrap();
    let mut writer =
        FileWriter::append_to(handle, &CodecRegistry::default()).unwrap();
    for id in 5..8 {
        writer.append(&event(id)).unwrap();
    }
    writer.close().unwrap();

    let reader = FileReader::open_path(file.path()).unwrap();
    assert_eq!(reader.codec_name(), "deflate");
    let values: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(values, (0..8).map(event).collect::<Vec<_>>());
}

#[test]
fn invalid_datum_leaves_block_untouched() {
    let mut writer = FileWriterBuilder::new(schema(EVENT))
        .build(Vec::new())
        .unwrap();
    writer.append(&event(1)).unwrap();
    let err = writer
        .append(&Value::record([("id", Value::string("one"))]))
        .unwrap_err();
    assert!(matches!(err, FileError::Datum(_)));
    writer.append(&event(2)).unwrap();
    let bytes = writer.close().unwrap();
    assert_eq!(read_all(&bytes), vec![event(1), event(2)]);
}

#[test]
fn negative_block_count_is_read_by_magnitude() {
    let longs = schema(r#""long""#);
    let mut writer = FileWriterBuilder::new(longs).build(Vec::new()).unwrap();
    writer.append(&Value::Long(5)).unwrap();
    let mut bytes = writer.close().unwrap();

    let data_start = FileReader::open(Cursor::new(&bytes)).unwrap().data_start() as usize;
    assert_eq!(bytes[data_start], 0x02);
    bytes[data_start] = 0x01;

    let results: Vec<Result<Value, FileError>> =
        FileReader::open(Cursor::new(&bytes)).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap(), &Value::Long(5));
}

#[cfg(all(feature = "snappy", feature = "zstandard"))]
#[test]
fn snappy_and_zstandard_files_read_back() {
    for codec in ["snappy", "zstandard"] {
        let builder = FileWriterBuilder::new(schema(EVENT))
            .with_codec(CodecRegistry::default().create(codec).unwrap())
            .with_sync_interval(512);
        let bytes = write_events(builder, 0..300);

        let reader = FileReader::open(Cursor::new(&bytes)).unwrap();
        assert_eq!(reader.codec_name(), codec);
        let values: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(values, (0..300).map(event).collect::<Vec<_>>());
    }
}

#[test]
fn appending_writer_takes_block_settings() {
    let tags = schema(r#"{"type": "array", "items": "string"}"#);
    let mut writer = FileWriterBuilder::new(tags.clone()).build(Vec::new()).unwrap();
    writer.append(&Value::Array(vec![])).unwrap();
    let bytes = writer.close().unwrap();

    let mut writer = FileWriter::append_to(Cursor::new(bytes), &CodecRegistry::default())
        .unwrap()
        .with_sync_interval(32)
        .with_write_options(WriteOptions::default().with_byte_length_prefix(true));
    assert_eq!(writer.sync_interval(), 32);
    let value = Value::Array(vec![Value::string("abcdefghij"); 4]);
    for _ in 0..3 {
        writer.append(&value).unwrap();
    }
    let bytes = writer.close().unwrap().into_inner();

    let mut reader = FileReader::open(Cursor::new(&bytes)).unwrap();
    let mut block_starts = Vec::new();
    let mut values = Vec::new();
    while let Some(v) = reader.next_value().unwrap() {
        block_starts.push(reader.previous_sync());
        values.push(v);
    }
    assert_eq!(values[0], Value::Array(vec![]));
    assert_eq!(values[1..], [value.clone(), value.clone(), value]);
    block_starts.dedup();
    // One block from the first session, then one per datum, each over 32 bytes.
    assert_eq!(block_starts.len(), 4);
}
