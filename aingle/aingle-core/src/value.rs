//! Generic in-memory datum, shaped by a schema.

use std::fmt;

use crate::{
    error::{LogicalValueError, ValueTypeError},
    schema::LogicalType,
};

/// Value written by the datum writer and produced by the datum reader.
///
/// Record and map entries keep their order. A value read under a union
/// schema is always wrapped in [`Value::Union`] with the reader's branch
/// index; the writer also accepts bare values for union schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    /// Ordinal and symbol.
    Enum(u32, String),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
    Record(Vec<(String, Value)>),
    /// Branch index and branch value.
    Union(u32, Box<Value>),
    Date(i32),
    TimeMillis(i32),
    TimeMicros(i64),
    TimestampMillis(i64),
    TimestampMicros(i64),
    Decimal(Decimal),
    Uuid(uuid::Uuid),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Build a record value from `(field name, value)` pairs.
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn union(index: u32, value: Value) -> Self {
        Self::Union(index, Box::new(value))
    }

    /// The value inside a union wrapper, or `self`.
    pub fn peel_union(&self) -> &Value {
        match self {
            Value::Union(_, inner) => inner.peel_union(),
            other => other,
        }
    }

    /// Field `name` of a record value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self.peel_union() {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn try_bool(&self) -> Result<Option<bool>, ValueTypeError> {
        match self.peel_union() {
            Value::Boolean(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Boolean")),
        }
    }

    pub fn try_int(&self) -> Result<Option<i32>, ValueTypeError> {
        match self.peel_union() {
            Value::Int(v) | Value::Date(v) | Value::TimeMillis(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Int")),
        }
    }

    pub fn try_long(&self) -> Result<Option<i64>, ValueTypeError> {
        match self.peel_union() {
            Value::Long(v)
            | Value::TimeMicros(v)
            | Value::TimestampMillis(v)
            | Value::TimestampMicros(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Long")),
        }
    }

    pub fn try_float(&self) -> Result<Option<f32>, ValueTypeError> {
        match self.peel_union() {
            Value::Float(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Float")),
        }
    }

    pub fn try_double(&self) -> Result<Option<f64>, ValueTypeError> {
        match self.peel_union() {
            Value::Double(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Double")),
        }
    }

    pub fn try_str(&self) -> Result<Option<&str>, ValueTypeError> {
        match self.peel_union() {
            Value::String(v) => Ok(Some(v.as_str())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("String")),
        }
    }

    /// Contents of a `bytes` or `fixed` value.
    pub fn try_bytes(&self) -> Result<Option<&[u8]>, ValueTypeError> {
        match self.peel_union() {
            Value::Bytes(v) | Value::Fixed(v) => Ok(Some(v.as_slice())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Bytes")),
        }
    }

    /// Symbol of an enum value.
    pub fn try_symbol(&self) -> Result<Option<&str>, ValueTypeError> {
        match self.peel_union() {
            Value::Enum(_, symbol) => Ok(Some(symbol.as_str())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Enum")),
        }
    }

    pub fn try_array(&self) -> Result<Option<&[Value]>, ValueTypeError> {
        match self.peel_union() {
            Value::Array(items) => Ok(Some(items.as_slice())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Array")),
        }
    }

    pub fn try_map(&self) -> Result<Option<&[(String, Value)]>, ValueTypeError> {
        match self.peel_union() {
            Value::Map(entries) => Ok(Some(entries.as_slice())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Map")),
        }
    }

    pub fn try_record(&self) -> Result<Option<&[(String, Value)]>, ValueTypeError> {
        match self.peel_union() {
            Value::Record(fields) => Ok(Some(fields.as_slice())),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Record")),
        }
    }

    pub fn try_decimal(&self) -> Result<Option<&Decimal>, ValueTypeError> {
        match self.peel_union() {
            Value::Decimal(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Decimal")),
        }
    }

    pub fn try_uuid(&self) -> Result<Option<uuid::Uuid>, ValueTypeError> {
        match self.peel_union() {
            Value::Uuid(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            other => Err(other.type_mismatch("Uuid")),
        }
    }

    pub fn type_mismatch(&self, expected: impl Into<String>) -> ValueTypeError {
        ValueTypeError::new(expected, self.variant_name())
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Bytes(_) => "Bytes",
            Value::String(_) => "String",
            Value::Fixed(_) => "Fixed",
            Value::Enum(..) => "Enum",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
            Value::Union(..) => "Union",
            Value::Date(_) => "Date",
            Value::TimeMillis(_) => "TimeMillis",
            Value::TimeMicros(_) => "TimeMicros",
            Value::TimestampMillis(_) => "TimestampMillis",
            Value::TimestampMicros(_) => "TimestampMicros",
            Value::Decimal(_) => "Decimal",
            Value::Uuid(_) => "Uuid",
        }
    }

    /// Convert a base-typed value into its logical representation.
    ///
    /// Values that are already logical values of the right kind are returned
    /// unchanged.
    pub fn to_logical(self, logical: &LogicalType) -> Result<Value, LogicalValueError> {
        let fail = |detail: String| LogicalValueError {
            logical_type: logical.name(),
            detail,
        };
        match (logical, self) {
            (LogicalType::Decimal { scale, .. }, Value::Bytes(b) | Value::Fixed(b)) => {
                Ok(Value::Decimal(Decimal::new(b, *scale)))
            }
            (LogicalType::Decimal { scale, .. }, Value::Decimal(d)) => {
                if d.scale == *scale {
                    Ok(Value::Decimal(d))
                } else {
                    Err(fail(format!("scale {} does not match {scale}", d.scale)))
                }
            }
            (LogicalType::Date, Value::Int(v) | Value::Date(v)) => Ok(Value::Date(v)),
            (LogicalType::TimeMillis, Value::Int(v) | Value::TimeMillis(v)) => {
                Ok(Value::TimeMillis(v))
            }
            (LogicalType::TimeMicros, Value::Long(v) | Value::TimeMicros(v)) => {
                Ok(Value::TimeMicros(v))
            }
            (LogicalType::TimestampMillis, Value::Long(v) | Value::TimestampMillis(v)) => {
                Ok(Value::TimestampMillis(v))
            }
            (LogicalType::TimestampMicros, Value::Long(v) | Value::TimestampMicros(v)) => {
                Ok(Value::TimestampMicros(v))
            }
            (LogicalType::Uuid, Value::String(s)) => uuid::Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| fail(format!("'{s}' is not a UUID: {e}"))),
            (LogicalType::Uuid, Value::Uuid(u)) => Ok(Value::Uuid(u)),
            (_, other) => Err(fail(format!("unexpected {} value", other.variant_name()))),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Arbitrary-precision decimal: big-endian two's-complement unscaled value
/// and a scale (`value = unscaled * 10^-scale`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: Vec<u8>,
    scale: u32,
}

impl Decimal {
    /// The unscaled bytes are stored in their minimal two's-complement form.
    pub fn new(unscaled: impl Into<Vec<u8>>, scale: u32) -> Self {
        Self {
            unscaled: minimal_twos_complement(unscaled.into()),
            scale,
        }
    }

    pub fn from_i128(unscaled: i128, scale: u32) -> Self {
        Self::new(unscaled.to_be_bytes().to_vec(), scale)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn unscaled_bytes(&self) -> &[u8] {
        &self.unscaled
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled.first().is_some_and(|b| b & 0x80 != 0)
    }

    /// Unscaled value, when it fits in 128 bits.
    pub fn to_i128(&self) -> Option<i128> {
        if self.unscaled.len() > 16 {
            return None;
        }
        let mut buf = if self.is_negative() { [0xff; 16] } else { [0; 16] };
        buf[16 - self.unscaled.len()..].copy_from_slice(&self.unscaled);
        Some(i128::from_be_bytes(buf))
    }

    /// Unscaled bytes sign-extended to exactly `size` bytes, or `None` if the
    /// value does not fit.
    pub fn to_fixed_width(&self, size: usize) -> Option<Vec<u8>> {
        let len = self.unscaled.len();
        if len > size {
            return None;
        }
        let pad = if self.is_negative() { 0xff } else { 0 };
        let mut out = vec![pad; size - len];
        out.extend_from_slice(&self.unscaled);
        Some(out)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(unscaled) = self.to_i128() else {
            write!(f, "0x")?;
            for b in &self.unscaled {
                write!(f, "{b:02x}")?;
            }
            return write!(f, "e-{}", self.scale);
        };
        let digits = unscaled.unsigned_abs().to_string();
        let sign = if unscaled < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            write!(f, "{sign}{digits}")
        } else if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int}.{frac}")
        } else {
            write!(f, "{sign}0.{digits:0>scale$}")
        }
    }
}

fn minimal_twos_complement(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.is_empty() {
        return vec![0];
    }
    let redundant = bytes
        .windows(2)
        .take_while(|w| (w[0] == 0x00 && w[1] & 0x80 == 0) || (w[0] == 0xff && w[1] & 0x80 != 0))
        .count();
    bytes.drain(..redundant);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_is_stored_minimally() {
        assert_eq!(Decimal::new(vec![0, 0, 1], 0).unscaled_bytes(), &[1]);
        assert_eq!(Decimal::new(vec![0xff, 0xff, 0x80], 0).unscaled_bytes(), &[0x80]);
        assert_eq!(Decimal::new(vec![0x00, 0x80], 0).unscaled_bytes(), &[0x00, 0x80]);
        assert_eq!(Decimal::new(Vec::new(), 0).unscaled_bytes(), &[0]);
    }

    #[test]
    fn decimal_i128_conversions() {
        for v in [0i128, 1, -1, 127, 128, -128, -129, i64::MAX as i128, i128::MIN] {
            assert_eq!(Decimal::from_i128(v, 2).to_i128(), Some(v));
        }
        assert_eq!(
            Decimal::from_i128(-2, 0).to_fixed_width(4),
            Some(vec![0xff, 0xff, 0xff, 0xfe])
        );
        assert_eq!(Decimal::from_i128(1 << 20, 0).to_fixed_width(2), None);
    }

    #[test]
    fn decimal_display() {
        assert_eq!(Decimal::from_i128(12345, 2).to_string(), "123.45");
        assert_eq!(Decimal::from_i128(-5, 3).to_string(), "-0.005");
        assert_eq!(Decimal::from_i128(42, 0).to_string(), "42");
    }

    #[test]
    fn accessors_look_through_unions() {
        let v = Value::union(1, Value::Int(7));
        assert_eq!(v.try_int(), Ok(Some(7)));
        assert_eq!(Value::Null.try_str(), Ok(None));
        let err = Value::Long(1).try_int().unwrap_err();
        assert_eq!(err.actual, "Long");
    }

    #[test]
    fn logical_conversion() {
        let date = Value::Int(19000).to_logical(&LogicalType::Date).unwrap();
        assert_eq!(date, Value::Date(19000));
        assert!(Value::string("nope").to_logical(&LogicalType::Uuid).is_err());
        let dec = Value::Bytes(vec![0x30, 0x39])
            .to_logical(&LogicalType::Decimal { precision: 5, scale: 2 })
            .unwrap();
        assert_eq!(dec.try_decimal().unwrap().unwrap().to_string(), "123.45");
    }
}
