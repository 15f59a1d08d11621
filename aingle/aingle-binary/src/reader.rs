//! Schema-driven datum reader with writer/reader schema resolution.

use aingle_core::{EnumSchema, Names, ParsedSchema, RecordSchema, Schema, Value, default_to_value};
use tracing::trace;

use crate::{
    Decoder,
    error::{DatumError, DecodeError},
    resolve::{is_promotable, names_match, select_union_branch},
    skip::{check_block, item_size, skip_value},
};

type Result<T> = std::result::Result<T, DatumError>;

/// Reads data written under one schema as values shaped by another.
///
/// Resolution happens while decoding: every writer node is paired with the
/// reader node it maps to, writer-only record fields are skipped, and
/// reader-only fields are filled from their defaults.
#[derive(Debug, Clone)]
pub struct DatumReader {
    writer: ParsedSchema,
    reader: ParsedSchema,
}

impl DatumReader {
    pub fn new(writer: ParsedSchema, reader: ParsedSchema) -> Self {
        Self { writer, reader }
    }

    /// Read data with the schema it was written with.
    pub fn from_schema(schema: ParsedSchema) -> Self {
        Self {
            writer: schema.clone(),
            reader: schema,
        }
    }

    pub fn writer_schema(&self) -> &ParsedSchema {
        &self.writer
    }

    pub fn reader_schema(&self) -> &ParsedSchema {
        &self.reader
    }

    pub fn read(&self, d: &mut Decoder) -> Result<Value> {
        self.resolver()
            .read(self.writer.root(), self.reader.root(), d, "$")
    }

    /// Consume one datum without materializing it.
    pub fn skip(&self, d: &mut Decoder) -> Result<()> {
        skip_value(self.writer.root(), self.writer.names(), d, "$")
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            writer_names: self.writer.names(),
            reader_names: self.reader.names(),
        }
    }
}

/// Decode a single datum written under `schema`.
pub fn from_binary(schema: &ParsedSchema, bytes: &[u8]) -> Result<Value> {
    let mut d = Decoder::from_slice(bytes);
    DatumReader::from_schema(schema.clone()).read(&mut d)
}

struct Resolver<'a> {
    writer_names: &'a Names,
    reader_names: &'a Names,
}

fn lookup<'s>(schema: &'s Schema, names: &'s Names, path: &str) -> Result<&'s Schema> {
    match schema {
        Schema::Ref(name) => match names.get(name) {
            Some(Schema::Ref(_)) | None => Err(DatumError::UnknownName {
                path: path.to_string(),
                name: name.fullname(),
            }),
            Some(definition) => Ok(definition),
        },
        other => Ok(other),
    }
}

impl Resolver<'_> {
    fn read(&self, w: &Schema, r: &Schema, d: &mut Decoder, path: &str) -> Result<Value> {
        let w = lookup(w, self.writer_names, path)?;
        let r = lookup(r, self.reader_names, path)?;
        let at = || DatumError::decode(path);

        if let Schema::Union(union) = w {
            let index = d.read_union_index().map_err(at())?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| union.variants().get(i))
                .ok_or_else(|| {
                    DatumError::invalid(
                        path,
                        format!(
                            "union index {index} out of range for {} branches",
                            union.variants().len()
                        ),
                    )
                })?;
            return self.read(branch, r, d, path);
        }

        let w = match (w, r) {
            (_, Schema::Union(union)) => {
                let branch = select_union_branch(w, union, self.reader_names).ok_or_else(|| {
                    DatumError::resolution(
                        path,
                        format!("no branch of the reader union accepts {}", describe(w)),
                    )
                })?;
                let value = self.read(w, &union.variants()[branch], d, path)?;
                return Ok(Value::Union(branch as u32, Box::new(value)));
            }
            (_, Schema::Logical(logical)) => {
                let base = self.read(w, &logical.base, d, path)?;
                return base
                    .to_logical(&logical.logical)
                    .map_err(|e| DatumError::invalid(path, e.to_string()));
            }
            (Schema::Logical(logical), _) => lookup(&logical.base, self.writer_names, path)?,
            _ => w,
        };

        match (w, r) {
            (Schema::Null, Schema::Null) => d.read_null().map(|()| Value::Null).map_err(at()),
            (Schema::Boolean, Schema::Boolean) => {
                d.read_boolean().map(Value::Boolean).map_err(at())
            }
            (Schema::Int, Schema::Int) => d.read_int().map(Value::Int).map_err(at()),
            (Schema::Long, Schema::Long) => d.read_long().map(Value::Long).map_err(at()),
            (Schema::Float, Schema::Float) => d.read_float().map(Value::Float).map_err(at()),
            (Schema::Double, Schema::Double) => d.read_double().map(Value::Double).map_err(at()),
            (Schema::Bytes, Schema::Bytes) => {
                d.read_bytes().map(|b| Value::Bytes(b.to_vec())).map_err(at())
            }
            (Schema::String, Schema::String) => d.read_string().map(Value::String).map_err(at()),
            (w, r) if is_promotable(w, r) => promote(w, r, d).map_err(at()),
            (Schema::Fixed(wf), Schema::Fixed(rf)) => {
                if !names_match(w, r) {
                    return Err(name_mismatch(w, r, path));
                }
                if wf.size != rf.size {
                    return Err(DatumError::resolution(
                        path,
                        format!(
                            "fixed {} has size {}, reader {} expects {}",
                            wf.name, wf.size, rf.name, rf.size
                        ),
                    ));
                }
                d.read_fixed(wf.size)
                    .map(|b| Value::Fixed(b.to_vec()))
                    .map_err(at())
            }
            (Schema::Enum(we), Schema::Enum(re)) => {
                if !names_match(w, r) {
                    return Err(name_mismatch(w, r, path));
                }
                self.read_enum(we, re, d, path)
            }
            (Schema::Array(wa), Schema::Array(ra)) => {
                let mut items = Vec::new();
                let min_item = item_size(&wa.items, self.writer_names, 0);
                read_blocks(d, path, min_item, |d, i| {
                    items.push(self.read(&wa.items, &ra.items, d, &format!("{path}[{i}]"))?);
                    Ok(())
                })?;
                Ok(Value::Array(items))
            }
            (Schema::Map(wm), Schema::Map(rm)) => {
                let mut entries = Vec::new();
                let min_item = item_size(&wm.values, self.writer_names, 1);
                read_blocks(d, path, min_item, |d, _| {
                    let key = d.read_string().map_err(at())?;
                    let value = self.read(&wm.values, &rm.values, d, &format!("{path}[{key}]"))?;
                    entries.push((key, value));
                    Ok(())
                })?;
                Ok(Value::Map(entries))
            }
            (Schema::Record(wr), Schema::Record(rr)) => {
                if !names_match(w, r) {
                    return Err(name_mismatch(w, r, path));
                }
                self.read_record(wr, rr, d, path)
            }
            _ => Err(DatumError::resolution(
                path,
                format!("{} cannot be read as {}", describe(w), describe(r)),
            )),
        }
    }

    fn read_enum(
        &self,
        writer: &EnumSchema,
        reader: &EnumSchema,
        d: &mut Decoder,
        path: &str,
    ) -> Result<Value> {
        let ordinal = d.read_enum().map_err(DatumError::decode(path))?;
        let symbol = usize::try_from(ordinal)
            .ok()
            .and_then(|i| writer.symbols.get(i))
            .ok_or_else(|| {
                DatumError::invalid(
                    path,
                    format!("ordinal {ordinal} out of range for enum {}", writer.name),
                )
            })?;
        if let Some(index) = reader.index_of(symbol) {
            return Ok(Value::Enum(index as u32, symbol.clone()));
        }
        let fallback = reader
            .default
            .as_ref()
            .and_then(|default| Some((reader.index_of(default)?, default)))
            .ok_or_else(|| {
                DatumError::resolution(
                    path,
                    format!(
                        "symbol '{symbol}' is unknown to enum {} and it has no default",
                        reader.name
                    ),
                )
            })?;
        Ok(Value::Enum(fallback.0 as u32, fallback.1.clone()))
    }

    fn read_record(
        &self,
        writer: &RecordSchema,
        reader: &RecordSchema,
        d: &mut Decoder,
        path: &str,
    ) -> Result<Value> {
        let mut slots: Vec<Option<Value>> = vec![None; reader.fields.len()];
        for wf in &writer.fields {
            let field_path = format!("{path}.{}", wf.name);
            match reader.field_or_alias(&wf.name) {
                Some(rf) => {
                    slots[rf.position] = Some(self.read(&wf.schema, &rf.schema, d, &field_path)?);
                }
                None => {
                    trace!(record = %writer.name, field = %wf.name, "skipping writer-only field");
                    skip_value(&wf.schema, self.writer_names, d, &field_path)?;
                }
            }
        }

        let mut fields = Vec::with_capacity(reader.fields.len());
        for (rf, slot) in reader.fields.iter().zip(slots) {
            let value = match (slot, &rf.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default_to_value(default, &rf.schema, self.reader_names)
                    .map_err(|source| DatumError::Default {
                        path: format!("{path}.{}", rf.name),
                        source,
                    })?,
                // Neither written nor defaulted: left out of the result.
                (None, None) => continue,
            };
            fields.push((rf.name.clone(), value));
        }
        Ok(Value::Record(fields))
    }
}

fn promote(w: &Schema, r: &Schema, d: &mut Decoder) -> std::result::Result<Value, DecodeError> {
    Ok(match (w, r) {
        (Schema::Int, Schema::Long) => Value::Long(i64::from(d.read_int()?)),
        (Schema::Int, Schema::Float) => Value::Float(d.read_int()? as f32),
        (Schema::Int, _) => Value::Double(f64::from(d.read_int()?)),
        (Schema::Long, Schema::Float) => Value::Float(d.read_long()? as f32),
        (Schema::Long, _) => Value::Double(d.read_long()? as f64),
        _ => Value::Double(f64::from(d.read_float()?)),
    })
}

fn read_blocks(
    d: &mut Decoder,
    path: &str,
    min_item: usize,
    mut read_item: impl FnMut(&mut Decoder, usize) -> Result<()>,
) -> Result<()> {
    let mut index = 0;
    loop {
        let header = d.read_block_header().map_err(DatumError::decode(path))?;
        if header.count == 0 {
            return Ok(());
        }
        check_block(&header, index, min_item, d, path)?;
        for _ in 0..header.count {
            read_item(d, index)?;
            index += 1;
        }
    }
}

fn describe(schema: &Schema) -> String {
    match schema.name() {
        Some(name) => format!("{} {name}", schema.type_name()),
        None => schema.type_name().to_string(),
    }
}

fn name_mismatch(w: &Schema, r: &Schema, path: &str) -> DatumError {
    DatumError::resolution(
        path,
        format!("writer {} does not match reader {}", describe(w), describe(r)),
    )
}
