//! Block compression codecs.

use std::{collections::HashMap, fmt, io, sync::Arc};

/// Compresses and decompresses whole container blocks.
///
/// A codec may keep scratch state between calls, so one instance serves a
/// single reader or writer at a time.
pub trait Codec: Send {
    /// Name stored under the codec metadata key.
    fn name(&self) -> &str;

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>>;

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// Identity codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCodec;

impl Codec for NullCodec {
    fn name(&self) -> &str {
        "null"
    }

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Raw DEFLATE stream (no zlib or gzip framing).
#[cfg(feature = "deflate")]
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: flate2::Compression,
}

#[cfg(feature = "deflate")]
impl DeflateCodec {
    /// Codec compressing at `level` (0 = store, 9 = best).
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
        }
    }
}

#[cfg(feature = "deflate")]
impl Default for DeflateCodec {
    fn default() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

#[cfg(feature = "deflate")]
impl Codec for DeflateCodec {
    fn name(&self) -> &str {
        "deflate"
    }

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        use std::io::Write;

        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        use std::io::Read;

        let mut out = Vec::with_capacity(data.len() * 2);
        flate2::read::DeflateDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Raw Snappy block followed by the big-endian CRC-32 of the uncompressed
/// data.
#[cfg(feature = "snappy")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCodec;

#[cfg(feature = "snappy")]
impl Codec for SnappyCodec {
    fn name(&self) -> &str {
        "snappy"
    }

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(io::Error::other)?;
        out.extend_from_slice(&crc32fast::hash(data).to_be_bytes());
        Ok(out)
    }

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let Some(split) = data.len().checked_sub(4) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "snappy block shorter than its checksum",
            ));
        };
        let (body, trailer) = data.split_at(split);
        let out = snap::raw::Decoder::new()
            .decompress_vec(body)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if crc32fast::hash(&out) != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "snappy checksum mismatch",
            ));
        }
        Ok(out)
    }
}

/// Zstandard frames.
#[cfg(feature = "zstandard")]
#[derive(Debug, Clone, Copy)]
pub struct ZstandardCodec {
    level: i32,
}

#[cfg(feature = "zstandard")]
impl ZstandardCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

#[cfg(feature = "zstandard")]
impl Default for ZstandardCodec {
    fn default() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

#[cfg(feature = "zstandard")]
impl Codec for ZstandardCodec {
    fn name(&self) -> &str {
        "zstandard"
    }

    fn compress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        zstd::encode_all(data, self.level)
    }

    fn decompress(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        zstd::decode_all(data)
    }
}

type CodecFactory = Arc<dyn Fn() -> Box<dyn Codec> + Send + Sync>;

/// Maps codec names to factories producing fresh codec instances.
///
/// [`CodecRegistry::default`] knows `null` plus `deflate`, `snappy` and
/// `zstandard` when their features are enabled. Other codecs are registered
/// explicitly.
#[derive(Clone)]
pub struct CodecRegistry {
    factories: HashMap<String, CodecFactory>,
}

impl CodecRegistry {
    /// Registry with no codecs at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a codec factory under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Codec> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn with_codec(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Codec> + Send + Sync + 'static,
    ) -> Self {
        self.register(name, factory);
        self
    }

    /// Register all built-in codecs.
    pub fn with_default_codecs(self) -> Self {
        let s = self.with_codec("null", || Box::new(NullCodec));
        #[cfg(feature = "deflate")]
        let s = s.with_codec("deflate", || Box::new(DeflateCodec::default()));
        #[cfg(feature = "snappy")]
        let s = s.with_codec("snappy", || Box::new(SnappyCodec));
        #[cfg(feature = "zstandard")]
        let s = s.with_codec("zstandard", || Box::new(ZstandardCodec::default()));
        s
    }

    /// A fresh instance of the codec registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Codec>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::empty().with_default_codecs()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_builtin_codecs() {
        let registry = CodecRegistry::default();
        assert!(registry.create("null").is_some());
        assert!(registry.create("bzip2").is_none());
        #[cfg(all(feature = "deflate", feature = "snappy", feature = "zstandard"))]
        assert_eq!(registry.names(), ["deflate", "null", "snappy", "zstandard"]);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn deflate_is_raw_and_reversible() {
        let mut codec = DeflateCodec::default();
        let data = b"abcabcabcabcabcabcabcabcabcabc".repeat(20);
        let compressed = codec.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        // zlib streams start with 0x78; raw deflate has no such header.
        assert_ne!(compressed[0], 0x78);
        assert_eq!(codec.decompress(&compressed).unwrap(), data);
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn snappy_carries_crc_of_uncompressed_data() {
        let mut codec = SnappyCodec;
        let data = b"0123456789".repeat(50);
        let compressed = codec.compress(&data).unwrap();
        let trailer = &compressed[compressed.len() - 4..];
        assert_eq!(trailer, crc32fast::hash(&data).to_be_bytes());
        assert_eq!(codec.decompress(&compressed).unwrap(), data);

        let mut corrupt = compressed.clone();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xff;
        assert!(codec.decompress(&corrupt).is_err());
        assert!(codec.decompress(&[0, 1]).is_err());
    }

    #[cfg(feature = "zstandard")]
    #[test]
    fn zstandard_round_trips_a_block() {
        let mut codec = ZstandardCodec::new(3);
        let data = b"block of repeated text ".repeat(40);
        let compressed = codec.compress(&data).unwrap();
        // Zstandard frame magic, little-endian 0xFD2FB528.
        assert_eq!(compressed[..4], [0x28, 0xb5, 0x2f, 0xfd]);
        assert!(compressed.len() < data.len());
        assert_eq!(codec.decompress(&compressed).unwrap(), data);
    }
}
