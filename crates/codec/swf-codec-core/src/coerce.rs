//! Coercion helpers between Values and primitive codecs.
//! Rules:
//! - integers accept `Int`, and `Float`/`Fixed` only when integral
//! - fixed point accepts `Fixed` (rescaled), `Int` and `Float` (rounded to nearest)
//! - floats accept `Float`, `Float32`, `Int` and `Fixed`
//!
//! Every helper range-checks against the target and reports `Range` or
//! `TypeMismatch`.

use crate::error::{CodecError, CodecResult};
use crate::fixed::{FixedKind, FixedPoint};
use crate::schema::int_range;
use crate::value::Value;

pub fn expect_bool(v: &Value) -> CodecResult<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(CodecError::mismatch("bool", other.kind().name())),
    }
}

/// Integer view of a value, without range checks.
pub fn to_int(v: &Value) -> CodecResult<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => Ok(*f as i64),
        Value::Float32(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => Ok(*f as i64),
        Value::Fixed(x) if x.raw() % (1i64 << x.frac_bits()) == 0 => {
            Ok(x.raw() >> x.frac_bits())
        }
        other => Err(CodecError::mismatch("integer", other.kind().name())),
    }
}

/// Integer that fits `bits` (two's complement when `signed`).
pub fn int_in_range(v: &Value, bits: u8, signed: bool, target: &str) -> CodecResult<i64> {
    let i = to_int(v)?;
    check_int(i, bits, signed, target)
}

pub fn check_int(i: i64, bits: u8, signed: bool, target: &str) -> CodecResult<i64> {
    let (min, max) = int_range(bits, signed);
    if i < min || i > max {
        return Err(CodecError::range(i, target));
    }
    Ok(i)
}

pub fn to_fixed(v: &Value, kind: FixedKind) -> CodecResult<FixedPoint> {
    let frac = kind.frac_bits();
    let value = match v {
        Value::Fixed(x) => x.with_frac_bits(frac),
        Value::Int(i) => i
            .checked_mul(1i64 << frac)
            .map(|raw| FixedPoint::from_raw(raw, frac))
            .ok_or_else(|| CodecError::range(i, kind.name()))?,
        Value::Float(_) | Value::Float32(_) => {
            let f = to_f64(v)?;
            FixedPoint::from_f64(f, frac).ok_or_else(|| CodecError::range(f, kind.name()))?
        }
        other => return Err(CodecError::mismatch(kind.name(), other.kind().name())),
    };
    kind.check(value)
}

pub fn to_f64(v: &Value) -> CodecResult<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        Value::Float32(f) => Ok(f64::from(*f)),
        Value::Int(i) => Ok(*i as f64),
        Value::Fixed(x) => Ok(x.to_f64()),
        other => Err(CodecError::mismatch("float", other.kind().name())),
    }
}

/// A float that survives the trip through `f32` unchanged. `Float32` values
/// pass through bit for bit.
pub fn to_f32(v: &Value) -> CodecResult<f32> {
    if let Value::Float32(f) = v {
        return Ok(*f);
    }
    let f = to_f64(v)?;
    let narrow = f as f32;
    if f.is_finite() && f64::from(narrow) != f {
        return Err(CodecError::range(f, "f32"));
    }
    Ok(narrow)
}

pub fn expect_str(v: &Value) -> CodecResult<&str> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(CodecError::mismatch("string", other.kind().name())),
    }
}

pub fn expect_bytes(v: &Value) -> CodecResult<&[u8]> {
    match v {
        Value::Bytes(b) => Ok(b),
        other => Err(CodecError::mismatch("bytes", other.kind().name())),
    }
}

pub fn expect_array(v: &Value) -> CodecResult<&[Value]> {
    match v {
        Value::Array(items) => Ok(items),
        other => Err(CodecError::mismatch("array", other.kind().name())),
    }
}

pub fn expect_record(v: &Value) -> CodecResult<&crate::value::Record> {
    match v {
        Value::Record(map) => Ok(map),
        other => Err(CodecError::mismatch("record", other.kind().name())),
    }
}

pub fn expect_label(v: &Value) -> CodecResult<&str> {
    match v {
        Value::Enum(label) => Ok(label),
        other => Err(CodecError::mismatch("enum label", other.kind().name())),
    }
}

/// Bits needed to hold `v` in two's complement; zero needs none.
pub fn signed_bit_width(v: i64) -> u8 {
    let magnitude = if v < 0 { !v } else { v };
    if v == 0 {
        0
    } else {
        (64 - magnitude.leading_zeros() + 1) as u8
    }
}

pub fn unsigned_bit_width(v: u64) -> u8 {
    (64 - v.leading_zeros()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn unsigned_rejects_negative() {
        let err = int_in_range(&Value::Int(-1), 8, false, "u8").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Range { .. }));
        assert_eq!(int_in_range(&Value::Int(255), 8, false, "u8").unwrap(), 255);
        assert!(int_in_range(&Value::Int(256), 8, false, "u8").is_err());
        assert!(int_in_range(&Value::Int(-128), 8, true, "i8").is_ok());
    }

    #[test]
    fn fixed_from_any_number() {
        let one = FixedPoint::from_raw(65536, 16);
        assert_eq!(to_fixed(&Value::Int(1), FixedKind::Sfixed16P16).unwrap(), one);
        assert_eq!(
            to_fixed(&Value::Float(1.0), FixedKind::Sfixed16P16).unwrap(),
            one
        );
        assert!(to_fixed(&Value::Int(200), FixedKind::Sfixed8P8).is_err());
        assert!(to_fixed(&Value::Float(-0.5), FixedKind::Ufixed8P8).is_err());
    }

    #[test]
    fn f32_must_be_exact() {
        assert_eq!(to_f32(&Value::Float(0.5)).unwrap(), 0.5);
        assert!(to_f32(&Value::Float(0.1)).is_err());
        assert_eq!(to_f32(&Value::Float(f64::from(0.1f32))).unwrap(), 0.1f32);
        let payload = f32::from_bits(0x7f80_0001);
        assert_eq!(to_f32(&Value::Float32(payload)).unwrap().to_bits(), 0x7f80_0001);
    }

    #[test]
    fn bit_widths() {
        assert_eq!(signed_bit_width(0), 0);
        assert_eq!(signed_bit_width(-1), 1);
        assert_eq!(signed_bit_width(1), 2);
        assert_eq!(signed_bit_width(-16), 5);
        assert_eq!(signed_bit_width(15), 5);
        assert_eq!(signed_bit_width(16), 6);
        assert_eq!(unsigned_bit_width(0), 0);
        assert_eq!(unsigned_bit_width(255), 8);
    }
}
