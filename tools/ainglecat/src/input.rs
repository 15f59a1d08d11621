use std::{fs, io::Cursor, path::Path};

use aingle::{FileReader, FileReaderBuilder, core::ParsedSchema};
use anyhow::{Context, Result};
use memmap2::Mmap;

pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(unsafe { Mmap::map(&file) }?)
}

/// Reader over a mapped container file.
pub fn open_reader<'a>(
    data: &'a [u8],
    reader_schema: Option<ParsedSchema>,
) -> Result<FileReader<Cursor<&'a [u8]>>> {
    let mut builder = FileReaderBuilder::new();
    if let Some(schema) = reader_schema {
        builder = builder.with_reader_schema(schema);
    }
    Ok(builder.build(Cursor::new(data))?)
}

pub fn read_schema(path: &Path) -> Result<ParsedSchema> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    ParsedSchema::parse_str(&text).with_context(|| format!("invalid schema {}", path.display()))
}
