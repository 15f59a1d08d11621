//! Logical type definitions and their validation against a base schema.

use serde_json::{Map, Value as JsonValue};

use super::{Names, Schema};

/// Semantic refinement of a base schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    /// Arbitrary-precision decimal over `bytes` or `fixed`.
    Decimal { precision: u32, scale: u32 },
    /// Days since the Unix epoch, over `int`.
    Date,
    /// Milliseconds after midnight, over `int`.
    TimeMillis,
    /// Microseconds after midnight, over `long`.
    TimeMicros,
    /// Milliseconds since the Unix epoch, over `long`.
    TimestampMillis,
    /// Microseconds since the Unix epoch, over `long`.
    TimestampMicros,
    /// RFC 4122 UUID, over `string`.
    Uuid,
}

impl LogicalType {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::Decimal { .. } => "decimal",
            LogicalType::Date => "date",
            LogicalType::TimeMillis => "time-millis",
            LogicalType::TimeMicros => "time-micros",
            LogicalType::TimestampMillis => "timestamp-millis",
            LogicalType::TimestampMicros => "timestamp-micros",
            LogicalType::Uuid => "uuid",
        }
    }

    /// Whether `name` is a logical type this crate understands.
    pub fn is_known(name: &str) -> bool {
        matches!(
            name,
            "decimal"
                | "date"
                | "time-millis"
                | "time-micros"
                | "timestamp-millis"
                | "timestamp-micros"
                | "uuid"
        )
    }

    /// Build and validate a known logical type from its attributes.
    ///
    /// `base` is the already-parsed base schema; references are followed
    /// through `names`. Returns a human-readable reason on failure.
    pub(crate) fn from_attributes(
        name: &str,
        attributes: &Map<String, JsonValue>,
        base: &Schema,
        names: &Names,
    ) -> Result<Self, String> {
        let base = base
            .deref(names)
            .ok_or_else(|| "base type is not defined".to_string())?;
        let require = |expected: &Schema, logical: LogicalType| {
            if base == expected {
                Ok(logical)
            } else {
                Err(format!(
                    "requires base type '{}', found '{}'",
                    expected.type_name(),
                    base.type_name()
                ))
            }
        };

        match name {
            "decimal" => {
                let precision = match attributes.get("precision") {
                    Some(p) => p
                        .as_u64()
                        .filter(|p| *p > 0 && *p <= u32::MAX as u64)
                        .ok_or_else(|| format!("precision must be a positive integer, found {p}"))?,
                    None => return Err("missing precision".to_string()),
                };
                let scale = match attributes.get("scale") {
                    Some(s) => s
                        .as_u64()
                        .ok_or_else(|| format!("scale must be a non-negative integer, found {s}"))?,
                    None => 0,
                };
                if scale > precision {
                    return Err(format!(
                        "scale {scale} must not exceed precision {precision}"
                    ));
                }
                match base {
                    Schema::Bytes => {}
                    Schema::Fixed(fixed) => {
                        let max = max_fixed_precision(fixed.size);
                        if precision > max {
                            return Err(format!(
                                "fixed of size {} holds at most {max} digits, precision is {precision}",
                                fixed.size
                            ));
                        }
                    }
                    other => {
                        return Err(format!(
                            "requires base type 'bytes' or 'fixed', found '{}'",
                            other.type_name()
                        ));
                    }
                }
                Ok(LogicalType::Decimal {
                    precision: precision as u32,
                    scale: scale as u32,
                })
            }
            "date" => require(&Schema::Int, LogicalType::Date),
            "time-millis" => require(&Schema::Int, LogicalType::TimeMillis),
            "time-micros" => require(&Schema::Long, LogicalType::TimeMicros),
            "timestamp-millis" => require(&Schema::Long, LogicalType::TimestampMillis),
            "timestamp-micros" => require(&Schema::Long, LogicalType::TimestampMicros),
            "uuid" => require(&Schema::String, LogicalType::Uuid),
            other => Err(format!("unknown logical type '{other}'")),
        }
    }
}

/// Largest number of decimal digits a signed two's-complement value of
/// `size` bytes can always hold.
pub fn max_fixed_precision(size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    let bits = (8 * size - 1) as f64;
    (bits * 2f64.log10()).floor() as u64
}
