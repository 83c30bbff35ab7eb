//! Fixed-point numbers stored as raw integers.
//!
//! The raw integer is the source of truth; `to_f64` is only a view. Converting
//! a float rounds to the nearest raw value and is range-checked against the
//! declared kind.

use std::fmt;

use serde::Serialize;

use crate::error::{CodecError, CodecResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedKind {
    Sfixed8P8,
    Ufixed8P8,
    Sfixed16P16,
    Ufixed16P16,
}

impl FixedKind {
    pub fn frac_bits(self) -> u8 {
        match self {
            FixedKind::Sfixed8P8 | FixedKind::Ufixed8P8 => 8,
            FixedKind::Sfixed16P16 | FixedKind::Ufixed16P16 => 16,
        }
    }

    /// Width of the raw integer on the wire.
    pub fn bits(self) -> u8 {
        self.frac_bits() * 2
    }

    pub fn is_signed(self) -> bool {
        matches!(self, FixedKind::Sfixed8P8 | FixedKind::Sfixed16P16)
    }

    pub fn raw_range(self) -> (i64, i64) {
        let bits = u32::from(self.bits());
        if self.is_signed() {
            (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
        } else {
            (0, (1i64 << bits) - 1)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FixedKind::Sfixed8P8 => "sfixed8.8",
            FixedKind::Ufixed8P8 => "ufixed8.8",
            FixedKind::Sfixed16P16 => "sfixed16.16",
            FixedKind::Ufixed16P16 => "ufixed16.16",
        }
    }

    pub fn check(self, value: FixedPoint) -> CodecResult<FixedPoint> {
        let value = value.with_frac_bits(self.frac_bits());
        let (min, max) = self.raw_range();
        if value.raw < min || value.raw > max {
            return Err(CodecError::range(value, self.name()));
        }
        Ok(value)
    }
}

/// A fixed-point value: `raw / 2^frac_bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    raw: i64,
    frac_bits: u8,
}

impl FixedPoint {
    pub fn from_raw(raw: i64, frac_bits: u8) -> Self {
        Self { raw, frac_bits }
    }

    /// Nearest representable value (ties away from zero).
    pub fn from_f64(value: f64, frac_bits: u8) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * (1u64 << frac_bits) as f64).round();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return None;
        }
        Some(Self::from_raw(scaled as i64, frac_bits))
    }

    /// Nearest value of `kind`, clamped to its range. NaN maps to zero.
    pub fn saturating_from_f64(value: f64, kind: FixedKind) -> Self {
        let frac_bits = kind.frac_bits();
        let (min, max) = kind.raw_range();
        if value.is_nan() {
            return Self::from_raw(0, frac_bits);
        }
        let scaled = (value * (1u64 << frac_bits) as f64).round();
        let raw = if scaled <= min as f64 {
            min
        } else if scaled >= max as f64 {
            max
        } else {
            scaled as i64
        };
        Self::from_raw(raw, frac_bits)
    }

    pub fn raw(self) -> i64 {
        self.raw
    }

    pub fn frac_bits(self) -> u8 {
        self.frac_bits
    }

    pub fn to_f64(self) -> f64 {
        self.raw as f64 / (1u64 << self.frac_bits) as f64
    }

    /// Rescale to another precision, rounding to nearest when narrowing.
    pub fn with_frac_bits(self, frac_bits: u8) -> Self {
        use std::cmp::Ordering;
        match frac_bits.cmp(&self.frac_bits) {
            Ordering::Equal => self,
            Ordering::Greater => Self::from_raw(self.raw << (frac_bits - self.frac_bits), frac_bits),
            Ordering::Less => {
                // widened so the magnitude of i64::MIN and the rounding bias fit
                let shift = self.frac_bits - frac_bits;
                let half = 1i128 << (shift - 1);
                let raw = i128::from(self.raw);
                let rounded = if raw >= 0 {
                    (raw + half) >> shift
                } else {
                    -((-raw + half) >> shift)
                };
                Self::from_raw(rounded as i64, frac_bits)
            }
        }
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_in_sixteen_sixteen() {
        let one = FixedPoint::from_raw(65536, 16);
        assert_eq!(one.to_f64(), 1.0);
        assert_eq!(FixedPoint::from_f64(1.0, 16), Some(one));
    }

    #[test]
    fn rounds_to_nearest_raw() {
        // 1/3 in 8.8 is 85.33.. raw
        assert_eq!(FixedPoint::from_f64(1.0 / 3.0, 8).unwrap().raw(), 85);
        assert_eq!(FixedPoint::from_f64(-0.5, 8).unwrap().raw(), -128);
        assert!(FixedPoint::from_f64(f64::NAN, 8).is_none());
    }

    #[test]
    fn kind_range_checks() {
        let max = FixedKind::Sfixed8P8;
        assert_eq!(max.raw_range(), (-32768, 32767));
        assert!(max.check(FixedPoint::from_raw(32767, 8)).is_ok());
        assert!(max.check(FixedPoint::from_raw(32768, 8)).is_err());
        assert!(FixedKind::Ufixed16P16
            .check(FixedPoint::from_raw(-1, 16))
            .is_err());
    }

    #[test]
    fn rescale_between_precisions() {
        let half = FixedPoint::from_raw(128, 8);
        assert_eq!(half.with_frac_bits(16).raw(), 32768);
        assert_eq!(FixedPoint::from_raw(32768, 16).with_frac_bits(8).raw(), 128);
    }

    #[test]
    fn narrowing_the_extremes_does_not_overflow() {
        let min = FixedPoint::from_raw(i64::MIN, 16).with_frac_bits(8);
        assert_eq!(min.raw(), i64::MIN >> 8);
        let max = FixedPoint::from_raw(i64::MAX, 16).with_frac_bits(8);
        assert_eq!(max.raw(), (i64::MAX >> 8) + 1);
        assert_eq!(FixedPoint::from_raw(-384, 16).with_frac_bits(8).raw(), -2);
    }
}
