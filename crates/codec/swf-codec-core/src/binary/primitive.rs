//! Primitive codecs over the bit cursor.

use crate::bits::{BitReader, BitWriter};
use crate::coerce;
use crate::error::{CodecError, CodecResult, ErrorKind};
use crate::fixed::FixedPoint;
use crate::schema::{BoolRepr, BytesMode, IntKind, LengthPrefix, Primitive, StringMode};
use crate::value::Value;

/// Accept a non-canonical encoding only when not strict.
pub(crate) fn canonical(strict: bool, reason: impl Into<String>) -> CodecResult<()> {
    let reason = reason.into();
    if strict {
        return Err(CodecError::non_canonical(reason));
    }
    log::warn!("accepting non-canonical input: {reason}");
    Ok(())
}

fn read_int(r: &mut BitReader<'_>, kind: IntKind) -> CodecResult<i64> {
    Ok(match kind {
        IntKind::U8 => i64::from(r.read_u8()?),
        IntKind::U16 => i64::from(r.read_u16()?),
        IntKind::U32 => i64::from(r.read_u32()?),
        IntKind::I8 => i64::from(r.read_u8()? as i8),
        IntKind::I16 => i64::from(r.read_u16()? as i16),
        IntKind::I32 => i64::from(r.read_u32()? as i32),
    })
}

fn write_int(w: &mut BitWriter, kind: IntKind, v: i64) {
    match kind.bits() {
        8 => w.write_u8(v as u8),
        16 => w.write_u16(v as u16),
        _ => w.write_u32(v as u32),
    }
}

pub(crate) fn read_encoded_u32(r: &mut BitReader<'_>, strict: bool) -> CodecResult<u32> {
    let mut value: u64 = 0;
    for i in 0..5 {
        let byte = r.read_u8()?;
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                canonical(strict, "encoded u32 carries trailing zero groups")?;
            }
            return u32::try_from(value).map_err(|_| CodecError::range(value, "encoded u32"));
        }
    }
    Err(CodecError::invalid("encoded u32 is longer than 5 bytes"))
}

pub(crate) fn write_encoded_u32(w: &mut BitWriter, mut v: u32) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            w.write_u8(byte);
            return;
        }
        w.write_u8(byte | 0x80);
    }
}

pub(crate) fn read_length(
    r: &mut BitReader<'_>,
    prefix: LengthPrefix,
    strict: bool,
) -> CodecResult<usize> {
    if !matches!(prefix, LengthPrefix::Bits(_)) {
        r.align(strict)?;
    }
    let len = match prefix {
        LengthPrefix::Int(kind) => read_int(r, kind)? as u64,
        LengthPrefix::Bits(width) => u64::from(r.read_bits(width)?),
        LengthPrefix::EncodedU32 => u64::from(read_encoded_u32(r, strict)?),
        LengthPrefix::ExtendedU8 => match r.read_u8()? {
            0xff => {
                let long = r.read_u16()?;
                if long < 0xff {
                    canonical(strict, format!("extended count {long} fits one byte"))?;
                }
                u64::from(long)
            }
            short => u64::from(short),
        },
    };
    usize::try_from(len).map_err(|_| CodecError::range(len, "length"))
}

pub(crate) fn write_length(w: &mut BitWriter, prefix: LengthPrefix, len: usize) -> CodecResult<()> {
    let len = len as i64;
    match prefix {
        LengthPrefix::Int(kind) => {
            coerce::check_int(len, kind.bits(), false, kind.name())?;
            write_int(w, kind, len);
        }
        LengthPrefix::Bits(width) => {
            coerce::check_int(len, width, false, "length bits")?;
            w.write_bits(width, len as u32);
        }
        LengthPrefix::EncodedU32 => {
            coerce::check_int(len, 32, false, "encoded u32")?;
            write_encoded_u32(w, len as u32);
        }
        LengthPrefix::ExtendedU8 => {
            if len < 0xff {
                w.write_u8(len as u8);
            } else {
                coerce::check_int(len, 16, false, "extended count")?;
                w.write_u8(0xff);
                w.write_u16(len as u16);
            }
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> CodecResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| CodecError::invalid(format!("string is not UTF-8: {e}")))
}

pub(crate) fn read(r: &mut BitReader<'_>, p: &Primitive, strict: bool) -> CodecResult<Value> {
    if p.is_byte_aligned() {
        r.align(strict)?;
    }
    Ok(match *p {
        Primitive::Bool(BoolRepr::Bit) => Value::Bool(r.read_bits(1)? == 1),
        Primitive::Bool(BoolRepr::Byte) => match r.read_u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => {
                canonical(strict, format!("boolean byte {other:#04x}"))?;
                Value::Bool(true)
            }
        },
        Primitive::Int(kind) => Value::Int(read_int(r, kind)?),
        Primitive::Bits { width, signed } => {
            if signed {
                Value::Int(i64::from(r.read_signed_bits(width)?))
            } else {
                Value::Int(i64::from(r.read_bits(width)?))
            }
        }
        Primitive::Fixed(kind) => {
            let int = if kind.bits() == 16 {
                if kind.is_signed() {
                    IntKind::I16
                } else {
                    IntKind::U16
                }
            } else if kind.is_signed() {
                IntKind::I32
            } else {
                IntKind::U32
            };
            Value::Fixed(FixedPoint::from_raw(read_int(r, int)?, kind.frac_bits()))
        }
        Primitive::Float16 => Value::Float32(f16_to_f32(r.read_u16()?)),
        Primitive::Float32 => Value::Float32(f32::from_bits(r.read_u32()?)),
        Primitive::Float64 => Value::Float(f64::from_bits(r.read_u64()?)),
        Primitive::EncodedU32 => Value::Int(i64::from(read_encoded_u32(r, strict)?)),
        Primitive::Str(StringMode::NullTerminated) => Value::Str(utf8(r.read_until_nul()?)?),
        Primitive::Str(StringMode::LengthPrefixed(prefix)) => {
            let len = read_length(r, prefix, strict)?;
            r.align(strict)?;
            Value::Str(utf8(r.read_bytes(len)?)?)
        }
        Primitive::Bytes(BytesMode::LengthPrefixed(prefix)) => {
            let len = read_length(r, prefix, strict)?;
            r.align(strict)?;
            Value::Bytes(r.read_bytes(len)?.to_vec())
        }
        Primitive::Bytes(BytesMode::Fixed(len)) => Value::Bytes(r.read_bytes(len)?.to_vec()),
        Primitive::Bytes(BytesMode::Remaining) => Value::Bytes(r.read_rest()?.to_vec()),
    })
}

/// Widen a half-precision float. Every half is exactly representable.
pub(crate) fn f16_to_f32(half: u16) -> f32 {
    let sign = u32::from(half & 0x8000) << 16;
    let exp = u32::from((half >> 10) & 0x1f);
    let mant = u32::from(half & 0x3ff);
    let bits = match exp {
        0 if mant == 0 => sign,
        0 => {
            // subnormal: shift the leading one up to the implicit bit
            let shift = mant.leading_zeros() - 21;
            sign | ((113 - shift) << 23) | (((mant << shift) & 0x3ff) << 13)
        }
        0x1f => sign | 0x7f80_0000 | (mant << 13),
        _ => sign | ((exp + 112) << 23) | (mant << 13),
    };
    f32::from_bits(bits)
}

/// Narrow to half precision, or `None` when the value would change.
pub(crate) fn f32_to_f16(value: f32) -> Option<u16> {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = bits & 0x7f_ffff;
    if exp == 0xff {
        return (mant & 0x1fff == 0).then(|| sign | 0x7c00 | (mant >> 13) as u16);
    }
    if exp == 0 {
        return (mant == 0).then_some(sign);
    }
    let e = exp - 127;
    if (-14..=15).contains(&e) {
        return (mant & 0x1fff == 0).then(|| sign | (((e + 15) as u16) << 10) | (mant >> 13) as u16);
    }
    if (-24..-14).contains(&e) {
        let full = 0x80_0000 | mant;
        let shift = (-e - 1) as u32;
        return (full & ((1 << shift) - 1) == 0).then(|| sign | (full >> shift) as u16);
    }
    None
}

fn check_fixed_len(len: usize, expected: usize) -> CodecResult<()> {
    if len != expected {
        return Err(ErrorKind::LengthExceeded {
            len,
            min: expected,
            max: Some(expected),
        }
        .into());
    }
    Ok(())
}

/// Validate `v` against `p` without writing anything.
pub(crate) fn check(p: &Primitive, v: &Value) -> CodecResult<()> {
    write(&mut BitWriter::new(), p, v)
}

pub(crate) fn write(w: &mut BitWriter, p: &Primitive, v: &Value) -> CodecResult<()> {
    if p.is_byte_aligned() {
        w.align();
    }
    match *p {
        Primitive::Bool(BoolRepr::Bit) => w.write_bits(1, u32::from(coerce::expect_bool(v)?)),
        Primitive::Bool(BoolRepr::Byte) => w.write_u8(u8::from(coerce::expect_bool(v)?)),
        Primitive::Int(kind) => {
            let i = coerce::int_in_range(v, kind.bits(), kind.is_signed(), kind.name())?;
            write_int(w, kind, i);
        }
        Primitive::Bits { width, signed } => {
            let i = coerce::int_in_range(v, width, signed, &p.describe())?;
            if signed {
                w.write_signed_bits(width, i as i32);
            } else {
                w.write_bits(width, i as u32);
            }
        }
        Primitive::Fixed(kind) => {
            let raw = coerce::to_fixed(v, kind)?.raw();
            match kind.bits() {
                16 => w.write_u16(raw as u16),
                _ => w.write_u32(raw as u32),
            }
        }
        Primitive::Float16 => {
            let f = coerce::to_f32(v)?;
            let half = f32_to_f16(f).ok_or_else(|| CodecError::range(f, "f16"))?;
            w.write_u16(half);
        }
        Primitive::Float32 => w.write_u32(coerce::to_f32(v)?.to_bits()),
        Primitive::Float64 => w.write_u64(coerce::to_f64(v)?.to_bits()),
        Primitive::EncodedU32 => {
            let i = coerce::int_in_range(v, 32, false, "encoded u32")?;
            write_encoded_u32(w, i as u32);
        }
        Primitive::Str(mode) => {
            let s = coerce::expect_str(v)?;
            match mode {
                StringMode::NullTerminated => {
                    if s.contains('\0') {
                        return Err(CodecError::invalid("NUL inside a null-terminated string"));
                    }
                    w.write_bytes(s.as_bytes());
                    w.write_u8(0);
                }
                StringMode::LengthPrefixed(prefix) => {
                    write_length(w, prefix, s.len())?;
                    w.write_bytes(s.as_bytes());
                }
            }
        }
        Primitive::Bytes(mode) => {
            let bytes = coerce::expect_bytes(v)?;
            match mode {
                BytesMode::LengthPrefixed(prefix) => write_length(w, prefix, bytes.len())?,
                BytesMode::Fixed(len) => check_fixed_len(bytes.len(), len)?,
                BytesMode::Remaining => {}
            }
            w.write_bytes(bytes);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FixedKind;

    fn round_trip(p: Primitive, v: Value) -> Vec<u8> {
        let mut w = BitWriter::new();
        write(&mut w, &p, &v).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(read(&mut r, &p, true).unwrap(), v);
        assert!(r.is_exhausted());
        bytes
    }

    #[test]
    fn sixteen_sixteen_one() {
        let bytes = round_trip(
            Primitive::Fixed(FixedKind::Sfixed16P16),
            Value::Fixed(FixedPoint::from_raw(65536, 16)),
        );
        assert_eq!(bytes, [0x00, 0x00, 0x01, 0x00]);
        let mut r = BitReader::new(&bytes);
        match read(&mut r, &Primitive::Fixed(FixedKind::Sfixed16P16), true).unwrap() {
            Value::Fixed(x) => assert_eq!(x.to_f64(), 1.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_eight_eight() {
        let bytes = round_trip(
            Primitive::Fixed(FixedKind::Sfixed8P8),
            Value::Fixed(FixedPoint::from_raw(-384, 8)),
        );
        assert_eq!(bytes, [0x80, 0xfe]);
    }

    #[test]
    fn encoded_u32_forms() {
        assert_eq!(round_trip(Primitive::EncodedU32, Value::Int(0)), [0x00]);
        assert_eq!(round_trip(Primitive::EncodedU32, Value::Int(300)), [0xac, 0x02]);
        assert_eq!(
            round_trip(Primitive::EncodedU32, Value::Int(u32::MAX as i64)),
            [0xff, 0xff, 0xff, 0xff, 0x0f]
        );
    }

    #[test]
    fn encoded_u32_rejects_padding_groups_when_strict() {
        let bytes = [0x81, 0x00];
        let err = read(&mut BitReader::new(&bytes), &Primitive::EncodedU32, true).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NonCanonical { .. }));
        let v = read(&mut BitReader::new(&bytes), &Primitive::EncodedU32, false).unwrap();
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn unsigned_ints_reject_negatives() {
        let err = check(&Primitive::Int(IntKind::U16), &Value::Int(-1)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Range { .. }));
        assert!(check(&Primitive::Int(IntKind::U16), &Value::Int(65536)).is_err());
        assert!(check(&Primitive::Int(IntKind::I16), &Value::Int(-32768)).is_ok());
    }

    #[test]
    fn strings_and_bytes() {
        assert_eq!(
            round_trip(
                Primitive::Str(StringMode::NullTerminated),
                Value::Str("hi".into())
            ),
            b"hi\0"
        );
        assert_eq!(
            round_trip(
                Primitive::Bytes(BytesMode::LengthPrefixed(LengthPrefix::Int(IntKind::U16))),
                Value::Bytes(vec![7, 8])
            ),
            [2, 0, 7, 8]
        );
        let err = check(
            &Primitive::Bytes(BytesMode::Fixed(4)),
            &Value::Bytes(vec![1, 2]),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LengthExceeded { .. }));
    }

    #[test]
    fn extended_counts() {
        let mut w = BitWriter::new();
        write_length(&mut w, LengthPrefix::ExtendedU8, 300).unwrap();
        write_length(&mut w, LengthPrefix::ExtendedU8, 3).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, [0xff, 0x2c, 0x01, 0x03]);
        let mut r = BitReader::new(&bytes);
        assert_eq!(read_length(&mut r, LengthPrefix::ExtendedU8, true).unwrap(), 300);
        assert_eq!(read_length(&mut r, LengthPrefix::ExtendedU8, true).unwrap(), 3);
    }

    #[test]
    fn byte_bools_are_zero_or_one() {
        let p = Primitive::Bool(BoolRepr::Byte);
        assert!(read(&mut BitReader::new(&[2]), &p, true).is_err());
        assert_eq!(
            read(&mut BitReader::new(&[2]), &p, false).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn half_floats_widen_exactly() {
        assert_eq!(f16_to_f32(0x3c00), 1.0);
        assert_eq!(f16_to_f32(0xc000), -2.0);
        assert_eq!(f16_to_f32(0x7bff), 65504.0);
        assert_eq!(f16_to_f32(0x0001), 2f32.powi(-24));
        assert_eq!(f16_to_f32(0x0200), 2f32.powi(-15));
        assert_eq!(f16_to_f32(0x7c00), f32::INFINITY);
        assert!(f16_to_f32(0x7e00).is_nan());
        for half in [0x0000, 0x8000, 0x0001, 0x03ff, 0x0400, 0x3555, 0x7bff, 0xfc00, 0x7e01] {
            assert_eq!(f32_to_f16(f16_to_f32(half)), Some(half), "{half:#06x}");
        }
    }

    #[test]
    fn inexact_halves_are_out_of_range() {
        assert_eq!(f32_to_f16(0.1), None);
        assert_eq!(f32_to_f16(65536.0), None);
        assert_eq!(f32_to_f16(2f32.powi(-25)), None);
        let err = check(&Primitive::Float16, &Value::Float32(0.1)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Range { .. }));
        assert_eq!(round_trip(Primitive::Float16, Value::Float32(0.5)), [0x00, 0x38]);
    }

    #[test]
    fn float32_is_bit_exact() {
        round_trip(Primitive::Float32, Value::Float32(0.1));
        round_trip(Primitive::Float64, Value::Float(-0.0));
        // a signalling NaN must not come back quieted
        let bytes = [0x01, 0x00, 0x80, 0x7f];
        let value = read(&mut BitReader::new(&bytes), &Primitive::Float32, true).unwrap();
        assert_eq!(round_trip(Primitive::Float32, value), bytes);
    }
}
