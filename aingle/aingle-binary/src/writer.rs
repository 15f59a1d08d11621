//! Schema-driven datum writer.

use std::borrow::Cow;

use aingle_core::{
    LogicalSchema, LogicalType, Name, Names, ParsedSchema, RecordSchema, Schema, UnionSchema,
    Value, default_to_value,
};
use bytes::Bytes;

use crate::{Encoder, error::DatumError};

type Result<T> = std::result::Result<T, DatumError>;

/// How arrays and maps are split into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Maximum number of items per array/map block.
    pub max_block_items: usize,
    /// Write blocks in the negative-count form followed by the block's byte
    /// size, so readers can skip them without decoding.
    pub byte_length_prefix: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            max_block_items: 1000,
            byte_length_prefix: false,
        }
    }
}

impl WriteOptions {
    pub fn with_max_block_items(mut self, n: usize) -> Self {
        self.max_block_items = n.max(1);
        self
    }

    pub fn with_byte_length_prefix(mut self, enabled: bool) -> Self {
        self.byte_length_prefix = enabled;
        self
    }
}

/// Writes [`Value`]s in the binary encoding of a schema.
///
/// Each call to [`write`](Self::write) is atomic: the datum is encoded into
/// an internal scratch buffer and appended to the output only if the whole
/// value conforms to the schema.
#[derive(Debug, Clone)]
pub struct DatumWriter {
    schema: ParsedSchema,
    options: WriteOptions,
    scratch: Encoder,
}

impl DatumWriter {
    pub fn new(schema: ParsedSchema) -> Self {
        Self {
            schema,
            options: WriteOptions::default(),
            scratch: Encoder::new(),
        }
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> &ParsedSchema {
        &self.schema
    }

    pub fn options(&self) -> WriteOptions {
        self.options
    }

    pub fn write(&mut self, value: &Value, out: &mut Encoder) -> Result<()> {
        self.scratch.clear();
        let ctx = WriteContext {
            names: self.schema.names(),
            options: self.options,
        };
        ctx.write(self.schema.root(), value, &mut self.scratch, "$")?;
        out.append(&self.scratch);
        Ok(())
    }

    /// Encode a single datum into a fresh buffer.
    pub fn encode(&mut self, value: &Value) -> Result<Bytes> {
        let mut out = Encoder::new();
        self.write(value, &mut out)?;
        Ok(out.into_bytes())
    }
}

/// Encode `value` under `schema` with default options.
pub fn to_binary(schema: &ParsedSchema, value: &Value) -> Result<Bytes> {
    DatumWriter::new(schema.clone()).encode(value)
}

struct WriteContext<'a> {
    names: &'a Names,
    options: WriteOptions,
}

impl WriteContext<'_> {
    fn write(&self, schema: &Schema, value: &Value, enc: &mut Encoder, path: &str) -> Result<()> {
        let value = match (schema, value) {
            (Schema::Union(_) | Schema::Ref(_), _) => value,
            (_, Value::Union(_, inner)) => inner.as_ref(),
            _ => value,
        };
        let mismatch = || {
            DatumError::invalid(
                path,
                format!(
                    "{} value does not conform to {}",
                    value.variant_name(),
                    schema.type_name()
                ),
            )
        };
        match (schema, value) {
            (Schema::Ref(name), _) => {
                let definition = self.lookup(name, path)?;
                self.write(definition, value, enc, path)
            }
            (Schema::Null, Value::Null) => {
                enc.write_null();
                Ok(())
            }
            (Schema::Boolean, Value::Boolean(v)) => {
                enc.write_boolean(*v);
                Ok(())
            }
            (Schema::Int, Value::Int(v)) => {
                enc.write_int(*v);
                Ok(())
            }
            (Schema::Long, Value::Int(v)) => {
                enc.write_long(i64::from(*v));
                Ok(())
            }
            (Schema::Long, Value::Long(v)) => {
                enc.write_long(*v);
                Ok(())
            }
            (Schema::Float, Value::Int(v)) => {
                enc.write_float(*v as f32);
                Ok(())
            }
            (Schema::Float, Value::Long(v)) => {
                enc.write_float(*v as f32);
                Ok(())
            }
            (Schema::Float, Value::Float(v)) => {
                enc.write_float(*v);
                Ok(())
            }
            (Schema::Double, Value::Int(v)) => {
                enc.write_double(f64::from(*v));
                Ok(())
            }
            (Schema::Double, Value::Long(v)) => {
                enc.write_double(*v as f64);
                Ok(())
            }
            (Schema::Double, Value::Float(v)) => {
                enc.write_double(f64::from(*v));
                Ok(())
            }
            (Schema::Double, Value::Double(v)) => {
                enc.write_double(*v);
                Ok(())
            }
            (Schema::Bytes, Value::Bytes(v)) => {
                enc.write_bytes(v);
                Ok(())
            }
            (Schema::String, Value::String(v)) => {
                enc.write_string(v);
                Ok(())
            }
            (Schema::Fixed(fixed), Value::Fixed(v) | Value::Bytes(v)) => {
                if v.len() != fixed.size {
                    return Err(DatumError::invalid(
                        path,
                        format!(
                            "fixed {} holds {} bytes, value has {}",
                            fixed.name,
                            fixed.size,
                            v.len()
                        ),
                    ));
                }
                enc.write_fixed(v);
                Ok(())
            }
            (Schema::Enum(enum_schema), Value::Enum(_, symbol) | Value::String(symbol)) => {
                let ordinal = enum_schema.index_of(symbol).ok_or_else(|| {
                    DatumError::invalid(
                        path,
                        format!("'{symbol}' is not a symbol of enum {}", enum_schema.name),
                    )
                })?;
                enc.write_enum(ordinal as u32);
                Ok(())
            }
            (Schema::Array(array), Value::Array(items)) => {
                self.write_blocks(items, enc, |enc, i, item| {
                    self.write(&array.items, item, enc, &format!("{path}[{i}]"))
                })
            }
            (Schema::Map(map), Value::Map(entries)) => {
                self.write_blocks(entries, enc, |enc, _, (key, item)| {
                    enc.write_string(key);
                    self.write(&map.values, item, enc, &format!("{path}[{key}]"))
                })
            }
            (Schema::Record(record), Value::Record(fields)) => {
                self.write_record(record, fields, enc, path)
            }
            (Schema::Union(union), value) => self.write_union(union, value, enc, path),
            (Schema::Logical(logical), value) => {
                let base = self.logical_to_base(logical, value, path)?;
                self.write(&logical.base, &base, enc, path)
            }
            _ => Err(mismatch()),
        }
    }

    fn lookup(&self, name: &Name, path: &str) -> Result<&Schema> {
        match self.names.get(name) {
            Some(Schema::Ref(_)) | None => Err(DatumError::UnknownName {
                path: path.to_string(),
                name: name.fullname(),
            }),
            Some(definition) => Ok(definition),
        }
    }

    fn write_blocks<T>(
        &self,
        items: &[T],
        enc: &mut Encoder,
        mut write_item: impl FnMut(&mut Encoder, usize, &T) -> Result<()>,
    ) -> Result<()> {
        let chunk_size = self.options.max_block_items.max(1);
        for (chunk_index, chunk) in items.chunks(chunk_size).enumerate() {
            let first = chunk_index * chunk_size;
            if self.options.byte_length_prefix {
                let mut block = Encoder::new();
                for (i, item) in chunk.iter().enumerate() {
                    write_item(&mut block, first + i, item)?;
                }
                enc.write_sized_block_header(chunk.len(), block.len());
                enc.append(&block);
            } else {
                enc.write_block_count(chunk.len());
                for (i, item) in chunk.iter().enumerate() {
                    write_item(enc, first + i, item)?;
                }
            }
        }
        enc.write_block_count(0);
        Ok(())
    }

    fn write_record(
        &self,
        record: &RecordSchema,
        fields: &[(String, Value)],
        enc: &mut Encoder,
        path: &str,
    ) -> Result<()> {
        if let Some((unknown, _)) = fields.iter().find(|(name, _)| record.field(name).is_none()) {
            return Err(DatumError::invalid(
                path,
                format!("record {} has no field '{unknown}'", record.name),
            ));
        }
        for field in &record.fields {
            let field_path = format!("{path}.{}", field.name);
            match fields.iter().find(|(name, _)| *name == field.name) {
                Some((_, value)) => self.write(&field.schema, value, enc, &field_path)?,
                None => {
                    let default = field.default.as_ref().ok_or_else(|| {
                        DatumError::invalid(&field_path, "missing field without a default")
                    })?;
                    let value = default_to_value(default, &field.schema, self.names).map_err(
                        |source| DatumError::Default {
                            path: field_path.clone(),
                            source,
                        },
                    )?;
                    self.write(&field.schema, &value, enc, &field_path)?;
                }
            }
        }
        Ok(())
    }

    fn write_union(
        &self,
        union: &UnionSchema,
        value: &Value,
        enc: &mut Encoder,
        path: &str,
    ) -> Result<()> {
        let (index, value) = match value {
            Value::Union(index, inner) => {
                if *index as usize >= union.variants().len() {
                    return Err(DatumError::invalid(
                        path,
                        format!(
                            "union index {index} out of range for {} branches",
                            union.variants().len()
                        ),
                    ));
                }
                (*index as usize, inner.as_ref())
            }
            bare => {
                let index = self.select_branch(union, bare).ok_or_else(|| {
                    DatumError::invalid(
                        path,
                        format!(
                            "{} value matches none of the union branches",
                            bare.variant_name()
                        ),
                    )
                })?;
                (index, bare)
            }
        };
        enc.write_union_index(index as u32);
        self.write(&union.variants()[index], value, enc, path)
    }

    /// First branch the value conforms to exactly, else the first branch
    /// reachable by numeric widening or a symbol/bytes shorthand.
    fn select_branch(&self, union: &UnionSchema, value: &Value) -> Option<usize> {
        let branches = union.variants();
        branches
            .iter()
            .position(|branch| self.conforms(branch, value, false))
            .or_else(|| {
                branches
                    .iter()
                    .position(|branch| self.conforms(branch, value, true))
            })
    }

    fn conforms(&self, schema: &Schema, value: &Value, widen: bool) -> bool {
        let Some(schema) = schema.deref(self.names) else {
            return false;
        };
        match (schema, value) {
            (Schema::Null, Value::Null)
            | (Schema::Boolean, Value::Boolean(_))
            | (Schema::Int, Value::Int(_))
            | (Schema::Long, Value::Long(_))
            | (Schema::Float, Value::Float(_))
            | (Schema::Double, Value::Double(_))
            | (Schema::Bytes, Value::Bytes(_))
            | (Schema::String, Value::String(_))
            | (Schema::Array(_), Value::Array(_))
            | (Schema::Map(_), Value::Map(_)) => true,
            (Schema::Long, Value::Int(_))
            | (Schema::Float, Value::Int(_) | Value::Long(_))
            | (Schema::Double, Value::Int(_) | Value::Long(_) | Value::Float(_)) => widen,
            (Schema::Fixed(fixed), Value::Fixed(v)) => v.len() == fixed.size,
            (Schema::Enum(e), Value::Enum(_, symbol)) => e.index_of(symbol).is_some(),
            // Shorthands `write` accepts; an exact bytes/string branch wins first.
            (Schema::Fixed(fixed), Value::Bytes(v)) => widen && v.len() == fixed.size,
            (Schema::Enum(e), Value::String(symbol)) => widen && e.index_of(symbol).is_some(),
            (Schema::Record(record), Value::Record(fields)) => {
                fields.iter().all(|(name, _)| record.field(name).is_some())
                    && record.fields.iter().all(|field| {
                        field.default.is_some()
                            || fields.iter().any(|(name, _)| *name == field.name)
                    })
            }
            (Schema::Logical(logical), value) => match (&logical.logical, value) {
                (LogicalType::Date, Value::Date(_))
                | (LogicalType::TimeMillis, Value::TimeMillis(_))
                | (LogicalType::TimeMicros, Value::TimeMicros(_))
                | (LogicalType::TimestampMillis, Value::TimestampMillis(_))
                | (LogicalType::TimestampMicros, Value::TimestampMicros(_))
                | (LogicalType::Decimal { .. }, Value::Decimal(_))
                | (LogicalType::Uuid, Value::Uuid(_)) => true,
                (_, base) => widen && self.conforms(&logical.base, base, true),
            },
            _ => false,
        }
    }

    /// Convert a logical value to the representation of the logical type's
    /// base schema. Base-typed values pass through unchanged.
    fn logical_to_base<'v>(
        &self,
        logical: &LogicalSchema,
        value: &'v Value,
        path: &str,
    ) -> Result<Cow<'v, Value>> {
        let converted = match (&logical.logical, value) {
            (LogicalType::Date, Value::Date(v))
            | (LogicalType::TimeMillis, Value::TimeMillis(v)) => Value::Int(*v),
            (LogicalType::TimeMicros, Value::TimeMicros(v))
            | (LogicalType::TimestampMillis, Value::TimestampMillis(v))
            | (LogicalType::TimestampMicros, Value::TimestampMicros(v)) => Value::Long(*v),
            (LogicalType::Uuid, Value::Uuid(u)) => Value::String(u.hyphenated().to_string()),
            (LogicalType::Decimal { precision, scale }, Value::Decimal(decimal)) => {
                if decimal.scale() != *scale {
                    return Err(DatumError::invalid(
                        path,
                        format!("decimal scale {} does not match {scale}", decimal.scale()),
                    ));
                }
                if let Some(unscaled) = decimal.to_i128() {
                    let digits = unscaled.unsigned_abs().to_string().len();
                    if digits > *precision as usize {
                        return Err(DatumError::invalid(
                            path,
                            format!("decimal {decimal} exceeds precision {precision}"),
                        ));
                    }
                }
                match logical.base.deref(self.names) {
                    Some(Schema::Fixed(fixed)) => {
                        let bytes = decimal.to_fixed_width(fixed.size).ok_or_else(|| {
                            DatumError::invalid(
                                path,
                                format!("decimal {decimal} does not fit in {} bytes", fixed.size),
                            )
                        })?;
                        Value::Fixed(bytes)
                    }
                    _ => Value::Bytes(decimal.unscaled_bytes().to_vec()),
                }
            }
            (_, base) => return Ok(Cow::Borrowed(base)),
        };
        Ok(Cow::Owned(converted))
    }
}
