//! Container file layout constants and the decoded file header.

use std::io::Read;

use aingle_binary::io::{read_bytes, read_exact_vec, read_long, read_string};
use aingle_core::ParsedSchema;

use crate::error::FileError;

/// Magic bytes opening every container file: `"Obj"` and format version 1.
pub const MAGIC: [u8; 4] = [b'O', b'b', b'j', 1];

pub const SYNC_SIZE: usize = 16;

/// Default number of buffered bytes that triggers a block flush.
pub const DEFAULT_SYNC_INTERVAL: usize = 4000 * SYNC_SIZE;

/// Prefix of metadata keys reserved for the format itself.
pub const RESERVED_PREFIX: &str = "aingle.";

pub const SCHEMA_KEY: &str = "aingle.schema";

pub const CODEC_KEY: &str = "aingle.codec";

/// Header of a container file: metadata entries in file order and the sync
/// marker delimiting blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    metadata: Vec<(String, Vec<u8>)>,
    sync_marker: [u8; SYNC_SIZE],
}

impl Header {
    pub(crate) fn new(metadata: Vec<(String, Vec<u8>)>, sync_marker: [u8; SYNC_SIZE]) -> Self {
        Self {
            metadata,
            sync_marker,
        }
    }

    pub fn metadata(&self) -> &[(String, Vec<u8>)] {
        &self.metadata
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_slice())
    }

    /// Metadata value as UTF-8 text.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Metadata value holding a decimal integer.
    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get_string(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn sync_marker(&self) -> &[u8; SYNC_SIZE] {
        &self.sync_marker
    }

    /// Name of the block codec; files without the entry use `null`.
    pub fn codec_name(&self) -> &str {
        self.get_string(CODEC_KEY).unwrap_or("null")
    }

    /// Parse the writer schema stored in the header.
    pub fn schema(&self) -> Result<ParsedSchema, FileError> {
        let text = self
            .get_string(SCHEMA_KEY)
            .ok_or_else(|| FileError::MissingMetadata {
                key: SCHEMA_KEY.to_string(),
            })?;
        Ok(ParsedSchema::parse_str(text)?)
    }

    /// Read magic, metadata map and sync marker from the start of `r`.
    pub(crate) fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self, FileError> {
        let mut magic = Vec::with_capacity(MAGIC.len());
        (&mut *r).take(MAGIC.len() as u64).read_to_end(&mut magic)?;
        if magic != MAGIC {
            return Err(FileError::NotAContainerFile { found: magic });
        }

        let mut metadata = Vec::new();
        loop {
            let count = read_long(r)?;
            if count == 0 {
                break;
            }
            if count < 0 {
                // Block byte size; entries are read one by one anyway.
                read_long(r)?;
            }
            for _ in 0..count.unsigned_abs() {
                let key = read_string(r)?;
                let value = read_bytes(r)?;
                metadata.push((key, value));
            }
        }

        let marker = read_exact_vec(r, SYNC_SIZE)?;
        let mut sync_marker = [0u8; SYNC_SIZE];
        sync_marker.copy_from_slice(&marker);
        Ok(Self::new(metadata, sync_marker))
    }
}
