//! Parsing canonical form and schema fingerprints.
//!
//! The canonical form keeps only the attributes that affect how data is
//! read (`name`, `type`, `fields`, `symbols`, `items`, `values`, `size`, in
//! that order), uses full names, drops namespaces, documentation, aliases,
//! defaults, logical types and custom properties, and contains no whitespace.
//! Field order is significant and is kept as declared.

use std::{collections::HashSet, fmt::Write as _};

use sha2::{Digest, Sha256};

use super::{Name, Names, ParsedSchema, Schema};

/// Initial value (and polynomial) of the 64-bit Rabin fingerprint.
pub const RABIN_EMPTY: u64 = 0xc15d_213a_a4d7_a795;

const RABIN_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut fp = i as u64;
        let mut bit = 0;
        while bit < 8 {
            fp = (fp >> 1) ^ (RABIN_EMPTY & 0u64.wrapping_sub(fp & 1));
            bit += 1;
        }
        table[i] = fp;
        i += 1;
    }
    table
};

/// 64-bit Rabin fingerprint (CRC-64-AVRO) of `bytes`.
///
/// Equivalent to extending the fingerprint of `bytes` by eight zero bytes
/// under the bit-at-a-time polynomial definition.
pub fn rabin_fingerprint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(RABIN_EMPTY, |fp, &b| {
        (fp >> 8) ^ RABIN_TABLE[((fp ^ b as u64) & 0xff) as usize]
    })
}

impl ParsedSchema {
    /// Deterministic minimal rendering; two schemas are semantically
    /// identical iff their canonical forms are byte-identical.
    pub fn canonical_form(&self) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        write_canonical(&self.root, &self.names, &mut seen, &mut out);
        out
    }

    /// Rabin fingerprint of the canonical form.
    pub fn fingerprint64(&self) -> u64 {
        rabin_fingerprint(self.canonical_form().as_bytes())
    }

    /// SHA-256 digest of the canonical form.
    pub fn fingerprint_sha256(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.canonical_form().as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

fn write_canonical(schema: &Schema, names: &Names, seen: &mut HashSet<Name>, out: &mut String) {
    match schema {
        Schema::Record(record) => {
            if !seen.insert(record.name.clone()) {
                push_json_string(out, &record.name.fullname());
                return;
            }
            out.push_str("{\"name\":");
            push_json_string(out, &record.name.fullname());
            out.push_str(",\"type\":\"record\",\"fields\":[");
            for (i, field) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str("{\"name\":");
                push_json_string(out, &field.name);
                out.push_str(",\"type\":");
                write_canonical(&field.schema, names, seen, out);
                out.push('}');
            }
            out.push_str("]}");
        }
        Schema::Enum(enum_schema) => {
            if !seen.insert(enum_schema.name.clone()) {
                push_json_string(out, &enum_schema.name.fullname());
                return;
            }
            out.push_str("{\"name\":");
            push_json_string(out, &enum_schema.name.fullname());
            out.push_str(",\"type\":\"enum\",\"symbols\":[");
            for (i, symbol) in enum_schema.symbols.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_json_string(out, symbol);
            }
            out.push_str("]}");
        }
        Schema::Fixed(fixed) => {
            if !seen.insert(fixed.name.clone()) {
                push_json_string(out, &fixed.name.fullname());
                return;
            }
            out.push_str("{\"name\":");
            push_json_string(out, &fixed.name.fullname());
            // Writing to a String cannot fail.
            let _ = write!(out, ",\"type\":\"fixed\",\"size\":{}}}", fixed.size);
        }
        Schema::Array(array) => {
            out.push_str("{\"type\":\"array\",\"items\":");
            write_canonical(&array.items, names, seen, out);
            out.push('}');
        }
        Schema::Map(map) => {
            out.push_str("{\"type\":\"map\",\"values\":");
            write_canonical(&map.values, names, seen, out);
            out.push('}');
        }
        Schema::Union(union) => {
            out.push('[');
            for (i, variant) in union.variants.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(variant, names, seen, out);
            }
            out.push(']');
        }
        Schema::Logical(logical) => write_canonical(&logical.base, names, seen, out),
        Schema::Ref(name) => match names.get(name) {
            Some(definition) if !seen.contains(name) && !matches!(definition, Schema::Ref(_)) => {
                write_canonical(definition, names, seen, out)
            }
            _ => push_json_string(out, &name.fullname()),
        },
        primitive => {
            out.push('"');
            out.push_str(primitive.type_name());
            out.push('"');
        }
    }
}

fn push_json_string(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::String(s.to_string()).to_string());
}
