//! Schema-driven skipping: consumes exactly the bytes a datum occupies
//! without materializing it.

use aingle_core::{Name, Names, Schema};

use crate::{BlockHeader, Decoder, error::DatumError};

/// Upper bound on the items of one array or map whose items encode to zero
/// bytes, summed over all of its blocks.
pub const MAX_ZERO_SIZE_ITEMS: usize = 1 << 20;

pub fn skip_value(
    schema: &Schema,
    names: &Names,
    d: &mut Decoder,
    path: &str,
) -> Result<(), DatumError> {
    let at = || DatumError::decode(path);
    match schema {
        Schema::Null => Ok(()),
        Schema::Boolean => d.skip(1).map_err(at()),
        Schema::Int | Schema::Long | Schema::Enum(_) => d.skip_long().map_err(at()),
        Schema::Float => d.skip(4).map_err(at()),
        Schema::Double => d.skip(8).map_err(at()),
        Schema::Bytes | Schema::String => d.skip_bytes().map_err(at()),
        Schema::Fixed(fixed) => d.skip(fixed.size).map_err(at()),
        Schema::Array(array) => skip_blocks(d, path, item_size(&array.items, names, 0), |d, i| {
            skip_value(&array.items, names, d, &format!("{path}[{i}]"))
        }),
        Schema::Map(map) => skip_blocks(d, path, item_size(&map.values, names, 1), |d, i| {
            d.skip_bytes().map_err(at())?;
            skip_value(&map.values, names, d, &format!("{path}[{i}]"))
        }),
        Schema::Record(record) => record.fields.iter().try_for_each(|field| {
            skip_value(&field.schema, names, d, &format!("{path}.{}", field.name))
        }),
        Schema::Union(union) => {
            let index = d.read_union_index().map_err(at())?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| union.variants().get(i))
                .ok_or_else(|| {
                    DatumError::invalid(path, format!("union index {index} out of range"))
                })?;
            skip_value(branch, names, d, path)
        }
        Schema::Logical(logical) => skip_value(&logical.base, names, d, path),
        Schema::Ref(name) => match names.get(name) {
            Some(Schema::Ref(_)) | None => Err(DatumError::UnknownName {
                path: path.to_string(),
                name: name.fullname(),
            }),
            Some(definition) => skip_value(definition, names, d, path),
        },
    }
}

/// Walk array/map blocks, skipping sized blocks wholesale.
fn skip_blocks(
    d: &mut Decoder,
    path: &str,
    min_item: usize,
    mut skip_item: impl FnMut(&mut Decoder, usize) -> Result<(), DatumError>,
) -> Result<(), DatumError> {
    let mut index = 0;
    loop {
        let header = d.read_block_header().map_err(DatumError::decode(path))?;
        if header.count == 0 {
            return Ok(());
        }
        check_block(&header, index, min_item, d, path)?;
        match header.byte_len {
            Some(len) => {
                d.skip(len).map_err(DatumError::decode(path))?;
                index += header.count;
            }
            None => {
                for _ in 0..header.count {
                    skip_item(d, index)?;
                    index += 1;
                }
            }
        }
    }
}

/// Fewest bytes any datum of `schema` can encode to. Recursive references
/// count as zero, so the result is a lower bound.
pub fn min_encoded_size(schema: &Schema, names: &Names) -> usize {
    min_size(schema, names, &mut Vec::new())
}

fn min_size<'a>(schema: &'a Schema, names: &'a Names, visiting: &mut Vec<&'a Name>) -> usize {
    match schema {
        Schema::Null => 0,
        Schema::Boolean
        | Schema::Int
        | Schema::Long
        | Schema::Enum(_)
        | Schema::Bytes
        | Schema::String
        | Schema::Array(_)
        | Schema::Map(_) => 1,
        Schema::Float => 4,
        Schema::Double => 8,
        Schema::Fixed(fixed) => fixed.size,
        Schema::Record(record) => {
            if visiting.contains(&&record.name) {
                return 0;
            }
            visiting.push(&record.name);
            let size = record
                .fields
                .iter()
                .map(|field| min_size(&field.schema, names, visiting))
                .sum();
            visiting.pop();
            size
        }
        Schema::Union(union) => {
            1 + union
                .variants()
                .iter()
                .map(|branch| min_size(branch, names, visiting))
                .min()
                .unwrap_or(0)
        }
        Schema::Logical(logical) => min_size(&logical.base, names, visiting),
        Schema::Ref(name) => match names.get(name) {
            Some(Schema::Ref(_)) | None => 0,
            Some(definition) => min_size(definition, names, visiting),
        },
    }
}

/// Minimum bytes of one array item (`key_size` 0) or map entry (`key_size`
/// 1 for the key's length prefix).
pub(crate) fn item_size(schema: &Schema, names: &Names, key_size: usize) -> usize {
    key_size + min_encoded_size(schema, names)
}

/// Reject an array/map block whose item count the input cannot back.
pub(crate) fn check_block(
    header: &BlockHeader,
    seen: usize,
    min_item: usize,
    d: &Decoder,
    path: &str,
) -> Result<(), DatumError> {
    if min_item == 0 {
        if header.count > MAX_ZERO_SIZE_ITEMS.saturating_sub(seen) {
            return Err(DatumError::invalid(
                path,
                format!(
                    "block of {} zero-size items exceeds the limit of {MAX_ZERO_SIZE_ITEMS}",
                    header.count
                ),
            ));
        }
        return Ok(());
    }
    let available = header.byte_len.unwrap_or_else(|| d.remaining());
    if header.count > available / min_item {
        return Err(DatumError::invalid(
            path,
            format!(
                "block of {} items cannot fit in {available} bytes",
                header.count
            ),
        ));
    }
    Ok(())
}
