//! Container file reader.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use aingle_binary::{
    DatumReader, Decoder,
    io::{read_exact_vec, read_long, read_long_or_eof},
};
use aingle_core::{ParsedSchema, Value};
use tracing::{debug, warn};

use crate::{
    codec::{Codec, CodecRegistry},
    error::FileError,
    header::{Header, SYNC_SIZE},
};

const SCAN_CHUNK: usize = 8 * 1024;

/// Reads datums from a container file, block by block.
///
/// Besides sequential iteration the reader supports the split-reading
/// protocol: [`sync`](Self::sync) to the first block boundary at or after a
/// byte offset, then read while [`past_sync`](Self::past_sync) is false for
/// the end of the split.
pub struct FileReader<R> {
    source: R,
    header: Header,
    datum_reader: DatumReader,
    codec: Box<dyn Codec>,
    data_start: u64,
    file_len: u64,
    block: Option<Decoder>,
    block_remaining: usize,
    block_start: u64,
    exhausted: bool,
}

/// Builder for configuring [`FileReader`].
#[derive(Debug, Default)]
pub struct FileReaderBuilder {
    reader_schema: Option<ParsedSchema>,
    codecs: CodecRegistry,
}

impl FileReader<BufReader<File>> {
    /// Open the container file at `path` with default settings.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, FileError> {
        Self::open(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> FileReader<R> {
    /// Open `source`, reading data as the writer schema.
    pub fn open(source: R) -> Result<Self, FileError> {
        FileReaderBuilder::new().build(source)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn metadata_keys(&self) -> impl Iterator<Item = &str> {
        self.header.keys()
    }

    pub fn meta(&self, key: &str) -> Option<&[u8]> {
        self.header.get(key)
    }

    pub fn meta_string(&self, key: &str) -> Option<&str> {
        self.header.get_string(key)
    }

    pub fn meta_long(&self, key: &str) -> Option<i64> {
        self.header.get_long(key)
    }

    pub fn writer_schema(&self) -> &ParsedSchema {
        self.datum_reader.writer_schema()
    }

    pub fn reader_schema(&self) -> &ParsedSchema {
        self.datum_reader.reader_schema()
    }

    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    /// Offset of the first block.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Current offset in the source. A loaded block is buffered whole, so
    /// while its items are being read this is the offset just past it.
    pub fn tell(&mut self) -> Result<u64, FileError> {
        Ok(self.source.stream_position()?)
    }

    /// Offset of the block currently being read (just after the sync marker
    /// preceding it).
    pub fn previous_sync(&self) -> u64 {
        self.block_start
    }

    /// Whether the current block starts after the sync marker that begins
    /// at or after `position`, or the end of the file has been reached.
    pub fn past_sync(&self, position: u64) -> bool {
        self.block_start >= position + SYNC_SIZE as u64 || self.block_start >= self.file_len
    }

    /// Move to a block boundary, e.g. one returned by
    /// [`FileWriter::sync`](crate::FileWriter::sync) or
    /// [`previous_sync`](Self::previous_sync).
    pub fn seek(&mut self, position: u64) -> Result<(), FileError> {
        self.source.seek(SeekFrom::Start(position))?;
        self.reset_block(position);
        Ok(())
    }

    /// Move to the first block that starts after a sync marker beginning at
    /// or after `position`. Position 0 means the first block of the file.
    pub fn sync(&mut self, position: u64) -> Result<(), FileError> {
        if position == 0 {
            return self.seek(self.data_start);
        }
        self.source.seek(SeekFrom::Start(position))?;
        match self.scan_for_marker(position)? {
            Some(marker_at) => {
                let block_start = marker_at + SYNC_SIZE as u64;
                self.source.seek(SeekFrom::Start(block_start))?;
                self.reset_block(block_start);
            }
            None => {
                warn!(from = position, "no sync marker before end of file");
                self.source.seek(SeekFrom::Start(self.file_len))?;
                self.reset_block(self.file_len);
            }
        }
        Ok(())
    }

    /// Whether another datum is available, loading the next block if needed.
    pub fn has_next(&mut self) -> Result<bool, FileError> {
        while self.block_remaining == 0 {
            if self.exhausted || !self.load_block()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Read the next datum, or `None` at the end of the file.
    pub fn next_value(&mut self) -> Result<Option<Value>, FileError> {
        if !self.has_next()? {
            return Ok(None);
        }
        let Some(block) = self.block.as_mut() else {
            return Ok(None);
        };
        match self.datum_reader.read(block) {
            Ok(value) => {
                self.block_remaining -= 1;
                Ok(Some(value))
            }
            Err(e) => {
                // The rest of this block cannot be located; move on to the next.
                self.block = None;
                self.block_remaining = 0;
                Err(e.into())
            }
        }
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn reset_block(&mut self, block_start: u64) {
        self.block = None;
        self.block_remaining = 0;
        self.block_start = block_start;
        self.exhausted = false;
    }

    /// Read, verify and decompress the next block. Returns `false` at a clean
    /// end of file.
    fn load_block(&mut self) -> Result<bool, FileError> {
        let offset = self.source.stream_position()?;
        self.block = None;

        let Some(count) = read_long_or_eof(&mut self.source)? else {
            self.exhausted = true;
            return Ok(false);
        };
        self.block_start = offset;
        let (count, payload) = match self.read_block_frame(offset, count) {
            Ok(frame) => frame,
            Err(e) => {
                // Framing is lost; stop until the caller seeks or syncs.
                self.exhausted = true;
                return Err(e);
            }
        };

        let data = self
            .codec
            .decompress(&payload)
            .map_err(|source| FileError::Codec {
                codec: self.codec.name().to_string(),
                source,
            })?;
        debug!(
            offset,
            items = count,
            compressed = payload.len(),
            raw = data.len(),
            "loaded block"
        );
        self.block = Some(Decoder::new(data));
        self.block_remaining = count;
        Ok(true)
    }

    /// Rest of a block after its item count: size, payload and sync marker.
    fn read_block_frame(&mut self, offset: u64, count: i64) -> Result<(usize, Vec<u8>), FileError> {
        let invalid = |detail: String| FileError::InvalidBlock { offset, detail };
        // A negative count carries the same magnitude; the size follows either way.
        let count = usize::try_from(count.unsigned_abs())
            .map_err(|_| invalid(format!("item count {count} out of range")))?;
        let size = read_long(&mut self.source)?;
        let size =
            usize::try_from(size).map_err(|_| invalid(format!("negative block size {size}")))?;
        let payload = read_exact_vec(&mut self.source, size)?;
        let marker = read_exact_vec(&mut self.source, SYNC_SIZE)?;
        if marker != self.header.sync_marker() {
            return Err(FileError::SyncMarkerMismatch { offset });
        }
        Ok((count, payload))
    }

    /// Find the first sync marker starting at or after `from`, reading
    /// forward from the current source position (which must be `from`).
    fn scan_for_marker(&mut self, from: u64) -> Result<Option<u64>, FileError> {
        let marker = *self.header.sync_marker();
        let mut window: Vec<u8> = Vec::with_capacity(SCAN_CHUNK + SYNC_SIZE);
        let mut window_start = from;
        let mut chunk = vec![0u8; SCAN_CHUNK];
        loop {
            let n = self.source.read(&mut chunk)?;
            if n == 0 {
                return Ok(None);
            }
            window.extend_from_slice(&chunk[..n]);
            if let Some(i) = window.windows(SYNC_SIZE).position(|w| w == marker) {
                return Ok(Some(window_start + i as u64));
            }
            let keep = window.len().min(SYNC_SIZE - 1);
            let consumed = window.len() - keep;
            window.drain(..consumed);
            window_start += consumed as u64;
        }
    }
}

impl<R: Read + Seek> Iterator for FileReader<R> {
    type Item = Result<Value, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}

impl FileReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape datums with `schema` instead of the writer schema.
    pub fn with_reader_schema(mut self, schema: ParsedSchema) -> Self {
        self.reader_schema = Some(schema);
        self
    }

    /// Codecs available for decompression (default: built-in codecs).
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Read the header of `source` and return the reader.
    pub fn build<R: Read + Seek>(self, mut source: R) -> Result<FileReader<R>, FileError> {
        let start = source.stream_position()?;
        let file_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(start))?;

        let header = Header::read_from(&mut source)?;
        let writer_schema = header.schema()?;
        let codec_name = header.codec_name();
        let codec = self
            .codecs
            .create(codec_name)
            .ok_or_else(|| FileError::UnsupportedCodec {
                name: codec_name.to_string(),
            })?;
        let data_start = source.stream_position()?;
        debug!(codec = codec_name, data_start, file_len, "opened container file");

        let reader_schema = self
            .reader_schema
            .unwrap_or_else(|| writer_schema.clone());
        Ok(FileReader {
            source,
            datum_reader: DatumReader::new(writer_schema, reader_schema),
            codec,
            data_start,
            file_len,
            block: None,
            block_remaining: 0,
            block_start: data_start,
            exhausted: false,
            header,
        })
    }
}
