//! Value: dynamic instances of registry types.
//!
//! Records are keyed by logical (camelCase) field names in declaration order.
//! An absent optional field is a missing key, never a null.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::fixed::{FixedKind, FixedPoint};

pub type Record = IndexMap<String, Value>;

/// Lightweight kind enum used for dispatch and error messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Fixed,
    Float,
    Str,
    Bytes,
    Enum,
    Array,
    Record,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Fixed => "fixed",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Enum => "enum",
            ValueKind::Array => "array",
            ValueKind::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    /// Any integer primitive, bit-packed or byte-aligned.
    Int(i64),
    Fixed(FixedPoint),
    /// `Float64` values, and numbers read from JSON for them.
    Float(f64),
    /// `Float32` values, kept as-is so every bit pattern (NaN payloads
    /// included) re-encodes unchanged.
    Float32(f32),
    Str(String),
    Bytes(Vec<u8>),
    /// Enumeration or discriminant label (PascalCase logical name).
    Enum(String),
    Array(Vec<Value>),
    Record(Record),
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Fixed(_) => ValueKind::Fixed,
            Value::Float(_) | Value::Float32(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Enum(_) => ValueKind::Enum,
            Value::Array(_) => ValueKind::Array,
            Value::Record(_) => ValueKind::Record,
        }
    }

    pub fn enumeration(label: impl Into<String>) -> Self {
        Value::Enum(label.into())
    }

    /// Signed 16.16 value nearest to `v`. Out-of-range values clamp to the
    /// `Sfixed16P16` bounds and NaN becomes zero; use
    /// [`FixedPoint::from_f64`] to detect either.
    pub fn fixed16(v: f64) -> Self {
        Value::Fixed(FixedPoint::saturating_from_f64(v, FixedKind::Sfixed16P16))
    }

    /// Signed 8.8 counterpart of [`Value::fixed16`], clamped to `Sfixed8P8`.
    pub fn fixed8(v: f64) -> Self {
        Value::Fixed(FixedPoint::saturating_from_f64(v, FixedKind::Sfixed8P8))
    }

    /// Build a record from `(logical name, value)` pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup on records; `None` for other kinds.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_record().and_then(|map| map.get(field))
    }

    /// Follow a dotted field path through nested records.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |v, seg| v.get(seg))
    }
}

/// Dotted-path lookup starting at a record.
pub fn record_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = record.get(segments.next()?)?;
    segments.try_fold(first, |v, seg| v.get(seg))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Fixed(a), Value::Fixed(b)) => a == b,
            // bitwise so NaN payloads and signed zeros survive round trips
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<FixedPoint> for Value {
    fn from(v: FixedPoint) -> Self {
        Value::Fixed(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// Schema-less rendering keyed by logical names. The registry-aware form
/// lives in [`crate::json`].
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Fixed(f) => serializer.serialize_f64(f.to_f64()),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Float32(f) => serializer.serialize_f32(*f),
            Value::Str(s) | Value::Enum(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Fixed(x) => write!(f, "{x}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Float32(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Enum(label) => f.write_str(label),
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Record(fields) => write!(f, "{{{} fields}}", fields.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_path_lookup() {
        let v = Value::record([(
            "events",
            Value::record([("keyPress", Value::Bool(true))]),
        )]);
        assert_eq!(v.get_path("events.keyPress"), Some(&Value::Bool(true)));
        assert_eq!(v.get_path("events.missing"), None);
    }

    #[test]
    fn floats_compare_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        let quiet = Value::Float32(f32::from_bits(0x7fc0_0000));
        let signalling = Value::Float32(f32::from_bits(0x7f80_0001));
        assert_ne!(quiet, signalling);
        assert_ne!(Value::Float32(0.5), Value::Float(0.5));
    }

    #[test]
    fn fixed_constructors_clamp() {
        assert_eq!(Value::fixed8(1.5), Value::Fixed(FixedPoint::from_raw(384, 8)));
        assert_eq!(Value::fixed8(1000.0), Value::Fixed(FixedPoint::from_raw(32767, 8)));
        assert_eq!(Value::fixed8(-1000.0), Value::Fixed(FixedPoint::from_raw(-32768, 8)));
        assert_eq!(
            Value::fixed16(f64::INFINITY),
            Value::Fixed(FixedPoint::from_raw(i64::from(i32::MAX), 16))
        );
        assert_eq!(Value::fixed16(f64::NAN), Value::Fixed(FixedPoint::from_raw(0, 16)));
    }

    #[test]
    fn natural_json_rendering() {
        let v = Value::record([
            ("depth", Value::Int(1)),
            ("data", Value::Bytes(vec![0xde, 0xad])),
            ("scale", Value::fixed16(1.5)),
        ]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            serde_json::json!({"depth": 1, "data": "dead", "scale": 1.5})
        );
    }
}
