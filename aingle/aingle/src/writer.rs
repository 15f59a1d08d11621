//! Container file writer.

use std::io::{Read, Seek, SeekFrom, Write};

use aingle_binary::{DatumWriter, Encoder, WriteOptions, io::write_long};
use aingle_core::{ParsedSchema, Value, parse_schema};
use tracing::{debug, info};

use crate::{
    codec::{Codec, CodecRegistry, NullCodec},
    error::FileError,
    header::{
        CODEC_KEY, DEFAULT_SYNC_INTERVAL, Header, MAGIC, RESERVED_PREFIX, SCHEMA_KEY, SYNC_SIZE,
    },
};

const MIN_SYNC_INTERVAL: usize = 32;
const MAX_SYNC_INTERVAL: usize = 1 << 30;

/// Appends datums to a container file, grouping them into compressed blocks.
///
/// The writer must be finished with [`close`](Self::close) (or at least
/// [`flush`](Self::flush)); buffered items are not written on drop.
pub struct FileWriter<W: Write> {
    sink: W,
    datum_writer: DatumWriter,
    codec: Box<dyn Codec>,
    sync_marker: [u8; SYNC_SIZE],
    sync_interval: usize,
    block: Encoder,
    block_count: usize,
    position: u64,
}

/// Builder for configuring [`FileWriter`].
pub struct FileWriterBuilder {
    schema: ParsedSchema,
    codec: Box<dyn Codec>,
    sync_interval: usize,
    metadata: Vec<(String, Vec<u8>)>,
    write_options: WriteOptions,
    sync_marker: Option<[u8; SYNC_SIZE]>,
}

impl<W: Write> FileWriter<W> {
    pub fn schema(&self) -> &ParsedSchema {
        self.datum_writer.schema()
    }

    pub fn sync_marker(&self) -> &[u8; SYNC_SIZE] {
        &self.sync_marker
    }

    /// Change the approximate uncompressed block size, clamped like
    /// [`FileWriterBuilder::with_sync_interval`]. Useful after
    /// [`append_to`](Self::append_to).
    pub fn with_sync_interval(mut self, bytes: usize) -> Self {
        self.sync_interval = bytes.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL);
        self
    }

    /// Change the array/map block options for datums appended from now on.
    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.datum_writer = self.datum_writer.with_options(options);
        self
    }

    pub fn sync_interval(&self) -> usize {
        self.sync_interval
    }

    /// Bytes written to the sink so far, not counting the pending block.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append one datum to the pending block.
    ///
    /// A datum that does not conform to the schema is rejected without
    /// touching the pending block.
    pub fn append(&mut self, value: &Value) -> Result<(), FileError> {
        self.datum_writer.write(value, &mut self.block)?;
        self.block_count += 1;
        self.flush_if_full()
    }

    /// Append a datum that is already binary-encoded under the file schema.
    pub fn append_encoded(&mut self, datum: &[u8]) -> Result<(), FileError> {
        self.block.write_fixed(datum);
        self.block_count += 1;
        self.flush_if_full()
    }

    /// Write out the pending block and return the offset of the next block,
    /// a position [`FileReader::seek`](crate::FileReader::seek) accepts.
    pub fn sync(&mut self) -> Result<u64, FileError> {
        self.write_block()?;
        Ok(self.position)
    }

    /// Write out the pending block and flush the sink.
    pub fn flush(&mut self) -> Result<(), FileError> {
        self.write_block()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Flush everything and hand back the sink.
    pub fn close(mut self) -> Result<W, FileError> {
        self.flush()?;
        info!(
            codec = self.codec.name(),
            bytes = self.position,
            "closed container file"
        );
        Ok(self.sink)
    }

    fn flush_if_full(&mut self) -> Result<(), FileError> {
        if self.block.len() >= self.sync_interval {
            self.write_block()?;
        }
        Ok(())
    }

    fn write_block(&mut self) -> Result<(), FileError> {
        if self.block_count == 0 {
            return Ok(());
        }
        let payload = self
            .codec
            .compress(self.block.as_slice())
            .map_err(|source| FileError::Codec {
                codec: self.codec.name().to_string(),
                source,
            })?;

        let offset = self.position;
        let mut written = write_long(&mut self.sink, self.block_count as i64)?;
        written += write_long(&mut self.sink, payload.len() as i64)?;
        self.sink.write_all(&payload)?;
        self.sink.write_all(&self.sync_marker)?;
        written += payload.len() + SYNC_SIZE;
        self.position += written as u64;

        debug!(
            offset,
            items = self.block_count,
            raw = self.block.len(),
            compressed = payload.len(),
            "wrote block"
        );
        self.block.clear();
        self.block_count = 0;
        Ok(())
    }
}

impl<W: Read + Write + Seek> FileWriter<W> {
    /// Reopen an existing container file for appending.
    ///
    /// Schema, codec and sync marker are taken from the file's header; new
    /// blocks are written at the end of the file. Block size and datum
    /// options start at their defaults; chain
    /// [`with_sync_interval`](Self::with_sync_interval) and
    /// [`with_write_options`](Self::with_write_options) to change them.
    pub fn append_to(mut file: W, codecs: &CodecRegistry) -> Result<Self, FileError> {
        file.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(&mut file)?;
        let schema = header.schema()?;
        let codec_name = header.codec_name();
        let codec = codecs
            .create(codec_name)
            .ok_or_else(|| FileError::UnsupportedCodec {
                name: codec_name.to_string(),
            })?;
        let position = file.seek(SeekFrom::End(0))?;
        info!(codec = codec_name, offset = position, "appending to container file");

        Ok(Self {
            sink: file,
            datum_writer: DatumWriter::new(schema),
            codec,
            sync_marker: *header.sync_marker(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            block: Encoder::new(),
            block_count: 0,
            position,
        })
    }
}

impl FileWriterBuilder {
    /// Start configuring a file of datums conforming to `schema`.
    pub fn new(schema: ParsedSchema) -> Self {
        Self {
            schema,
            codec: Box::new(NullCodec),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            metadata: Vec::new(),
            write_options: WriteOptions::default(),
            sync_marker: None,
        }
    }

    /// Block compression codec (default: `null`).
    pub fn with_codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Approximate uncompressed block size in bytes, clamped to
    /// `32..=2^30` (default: 64 000).
    pub fn with_sync_interval(mut self, bytes: usize) -> Self {
        self.sync_interval = bytes.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL);
        self
    }

    /// Add a user metadata entry to the header.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Array/map block options for the datums themselves.
    pub fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    /// Use a fixed sync marker instead of a random one.
    pub fn with_sync_marker(mut self, marker: [u8; SYNC_SIZE]) -> Self {
        self.sync_marker = Some(marker);
        self
    }

    /// Write the header to `sink` and return the writer.
    pub fn build<W: Write>(self, mut sink: W) -> Result<FileWriter<W>, FileError> {
        if let Some((key, _)) = self
            .metadata
            .iter()
            .find(|(key, _)| key.starts_with(RESERVED_PREFIX))
        {
            return Err(FileError::ReservedMetadataKey { key: key.clone() });
        }

        let sync_marker = self.sync_marker.unwrap_or_else(rand::random);
        let mut entries = vec![
            (
                SCHEMA_KEY.to_string(),
                Value::Bytes(self.schema.to_string().into_bytes()),
            ),
            (
                CODEC_KEY.to_string(),
                Value::Bytes(self.codec.name().as_bytes().to_vec()),
            ),
        ];
        entries.extend(
            self.metadata
                .into_iter()
                .map(|(key, value)| (key, Value::Bytes(value))),
        );

        let mut header = Encoder::new();
        header.write_fixed(&MAGIC);
        DatumWriter::new(metadata_schema()?).write(&Value::Map(entries), &mut header)?;
        header.write_fixed(&sync_marker);
        sink.write_all(header.as_slice())?;

        info!(
            codec = self.codec.name(),
            sync_interval = self.sync_interval,
            "created container file"
        );
        Ok(FileWriter {
            sink,
            datum_writer: DatumWriter::new(self.schema).with_options(self.write_options),
            codec: self.codec,
            sync_marker,
            sync_interval: self.sync_interval,
            block: Encoder::new(),
            block_count: 0,
            position: header.len() as u64,
        })
    }
}

fn metadata_schema() -> Result<ParsedSchema, FileError> {
    Ok(parse_schema(r#"{"type": "map", "values": "bytes"}"#)?)
}
