//! Numeric conversion under an explicit overflow and truncation policy.
//!
//! A conversion succeeds silently only when converting the result back
//! yields the source value. Otherwise it fails, unless the matching opt-in is
//! set: `allow_truncation` for lost fractions or precision, `allow_overflow`
//! for magnitudes outside the target range. Integer overflow wraps with
//! two's-complement semantics so the reverse conversion restores the bits.

use std::fmt;

use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};
use crate::representation::IntegerWidth;

/// A source value in one of the numeric domains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i128),
    Single(f32),
    Double(f64),
    Decimal(Decimal128),
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(v) => v.fmt(f),
            Numeric::Single(v) => v.fmt(f),
            Numeric::Double(v) => v.fmt(f),
            Numeric::Decimal(v) => v.fmt(f),
        }
    }
}

/// Rust integer types the engine can target.
pub trait IntegerTarget: Copy + fmt::Display + Send + Sync + 'static {
    const WIDTH: IntegerWidth;

    fn to_i128(self) -> i128;

    /// `value` is already within `WIDTH`.
    fn from_i128_unchecked(value: i128) -> Self;
}

macro_rules! integer_target {
    ($($ty:ty => $width:ident),* $(,)?) => {$(
        impl IntegerTarget for $ty {
            const WIDTH: IntegerWidth = IntegerWidth::$width;

            fn to_i128(self) -> i128 {
                self as i128
            }

            fn from_i128_unchecked(value: i128) -> Self {
                value as $ty
            }
        }
    )*};
}

integer_target! {
    i8 => I8, u8 => U8, i16 => I16, u16 => U16,
    i32 => I32, u32 => U32, i64 => I64, u64 => U64,
}

/// Overflow and truncation policy. The default is strict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NumericConverter {
    pub allow_overflow: bool,
    pub allow_truncation: bool,
}

impl NumericConverter {
    pub const STRICT: NumericConverter = NumericConverter {
        allow_overflow: false,
        allow_truncation: false,
    };
    pub const LENIENT: NumericConverter = NumericConverter {
        allow_overflow: true,
        allow_truncation: true,
    };

    pub fn to_int<T: IntegerTarget>(&self, value: Numeric) -> Result<T> {
        self.to_integer(value, T::WIDTH)
            .map(T::from_i128_unchecked)
    }

    /// Converts into the range of `width`, returning the value as an `i128`.
    pub fn to_integer(&self, value: Numeric, width: IntegerWidth) -> Result<i128> {
        let integral = match value {
            Numeric::Int(v) => v,
            Numeric::Single(v) => self.float_to_i128(v as f64, value, width)?,
            Numeric::Double(v) => self.float_to_i128(v, value, width)?,
            Numeric::Decimal(d) => {
                let truncated = d.trunc();
                if truncated != d && !self.allow_truncation {
                    return Err(truncation(value, width.name()));
                }
                match truncated.to_i128() {
                    Some(v) => v,
                    None if self.allow_overflow => {
                        if truncated.is_sign_negative() {
                            i128::MIN
                        } else {
                            i128::MAX
                        }
                    }
                    None => return Err(overflow(value, width.name())),
                }
            }
        };
        if width.contains(integral) {
            Ok(integral)
        } else if !self.allow_overflow {
            Err(overflow(value, width.name()))
        } else if let Numeric::Int(_) = value {
            Ok(width.wrap(integral))
        } else {
            // non-integral sources clamp to the width, like `as` from a float
            Ok(integral.clamp(width.min(), width.max()))
        }
    }

    fn float_to_i128(&self, v: f64, source: Numeric, width: IntegerWidth) -> Result<i128> {
        if !v.is_finite() {
            return Err(overflow(source, width.name()));
        }
        let truncated = v.trunc();
        if truncated != v && !self.allow_truncation {
            return Err(truncation(source, width.name()));
        }
        // `as` saturates; anything beyond i128 is beyond every width and clamps again later
        Ok(truncated as i128)
    }

    pub fn to_f64(&self, value: Numeric) -> Result<f64> {
        match value {
            Numeric::Int(v) => {
                let d = v as f64;
                if d as i128 != v && !self.allow_truncation {
                    return Err(truncation(value, "f64"));
                }
                Ok(d)
            }
            Numeric::Single(v) if v == f32::MAX => Ok(f64::MAX),
            Numeric::Single(v) if v == f32::MIN => Ok(f64::MIN),
            Numeric::Single(v) => Ok(v as f64),
            Numeric::Double(v) => Ok(v),
            Numeric::Decimal(d) => {
                if d == Decimal128::MAX {
                    return Ok(f64::MAX);
                }
                if d == Decimal128::MIN {
                    return Ok(f64::MIN);
                }
                let v = d.to_f64();
                if !v.is_finite() {
                    return if self.allow_overflow {
                        Ok(v)
                    } else {
                        Err(overflow(value, "f64"))
                    };
                }
                if Decimal128::from_f64(v) != Some(d) && !self.allow_truncation {
                    return Err(truncation(value, "f64"));
                }
                Ok(v)
            }
        }
    }

    pub fn to_f32(&self, value: Numeric) -> Result<f32> {
        let v = match value {
            Numeric::Single(v) => return Ok(v),
            Numeric::Int(v) => {
                let f = v as f32;
                if f as i128 != v && !self.allow_truncation {
                    return Err(truncation(value, "f32"));
                }
                return Ok(f);
            }
            Numeric::Double(v) => v,
            Numeric::Decimal(d) => {
                if d == Decimal128::MAX {
                    return Ok(f32::MAX);
                }
                if d == Decimal128::MIN {
                    return Ok(f32::MIN);
                }
                let f = d.to_f32();
                if !f.is_finite() {
                    return if self.allow_overflow {
                        Ok(f)
                    } else {
                        Err(overflow(value, "f32"))
                    };
                }
                if Decimal128::from_f32(f) != Some(d) && !self.allow_truncation {
                    return Err(truncation(value, "f32"));
                }
                return Ok(f);
            }
        };
        if v == f64::MAX {
            return Ok(f32::MAX);
        }
        if v == f64::MIN {
            return Ok(f32::MIN);
        }
        if v.is_nan() || v.is_infinite() {
            return Ok(v as f32);
        }
        if (v < f32::MIN as f64 || v > f32::MAX as f64) && !self.allow_overflow {
            return Err(overflow(value, "f32"));
        }
        let f = v as f32;
        if f.is_finite() && f as f64 != v && !self.allow_truncation {
            return Err(truncation(value, "f32"));
        }
        Ok(f)
    }

    pub fn to_decimal(&self, value: Numeric) -> Result<Decimal128> {
        match value {
            Numeric::Int(v) => {
                Decimal128::from_i128(v).ok_or_else(|| overflow(value, "Decimal128"))
            }
            Numeric::Single(v) if v == f32::MAX => Ok(Decimal128::MAX),
            Numeric::Single(v) if v == f32::MIN => Ok(Decimal128::MIN),
            Numeric::Single(v) => {
                Decimal128::from_f32(v).ok_or_else(|| overflow(value, "Decimal128"))
            }
            Numeric::Double(v) if v == f64::MAX => Ok(Decimal128::MAX),
            Numeric::Double(v) if v == f64::MIN => Ok(Decimal128::MIN),
            Numeric::Double(v) => {
                Decimal128::from_f64(v).ok_or_else(|| overflow(value, "Decimal128"))
            }
            Numeric::Decimal(d) => Ok(d),
        }
    }
}

fn overflow(value: Numeric, target: &str) -> CodecError {
    CodecError::overflow(format!("{value} does not fit in {target}"))
}

fn truncation(value: Numeric, target: &str) -> CodecError {
    CodecError::truncation(format!("{value} cannot be represented exactly as {target}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    const STRICT: NumericConverter = NumericConverter::STRICT;
    const WRAP: NumericConverter = NumericConverter {
        allow_overflow: true,
        allow_truncation: false,
    };

    #[test]
    fn unsigned_max_wraps_to_minus_one() {
        assert_eq!(WRAP.to_int::<i32>(Numeric::Int(u32::MAX as i128)).unwrap(), -1);
        assert_eq!(WRAP.to_int::<u32>(Numeric::Int(-1)).unwrap(), u32::MAX);
        assert_eq!(WRAP.to_int::<i64>(Numeric::Int(u64::MAX as i128)).unwrap(), -1);
        assert_eq!(WRAP.to_int::<u64>(Numeric::Int(-1)).unwrap(), u64::MAX);
    }

    #[test]
    fn float_overflow_clamps_to_the_width() {
        let stored = WRAP.to_f64(Numeric::Int(u64::MAX as i128));
        assert!(stored.is_err());
        let lossy = NumericConverter::LENIENT;
        let stored = lossy.to_f64(Numeric::Int(u64::MAX as i128)).unwrap();
        assert_eq!(stored, 18446744073709551616.0);
        assert_eq!(lossy.to_int::<u64>(Numeric::Double(stored)).unwrap(), u64::MAX);
        assert!(STRICT.to_int::<u64>(Numeric::Double(stored)).is_err());

        let stored = lossy.to_f64(Numeric::Int(i64::MAX as i128)).unwrap();
        assert_eq!(stored, 9223372036854775808.0);
        assert_eq!(lossy.to_int::<i64>(Numeric::Double(stored)).unwrap(), i64::MAX);
        assert_eq!(lossy.to_int::<i64>(Numeric::Double(-stored)).unwrap(), i64::MIN);
        assert_eq!(WRAP.to_int::<i64>(Numeric::Double(f64::MAX)).unwrap(), i64::MAX);
        assert_eq!(WRAP.to_int::<u32>(Numeric::Double(-1.0)).unwrap(), 0);
        assert_eq!(WRAP.to_int::<u8>(Numeric::Single(1e30)).unwrap(), u8::MAX);

        let huge: Decimal128 = "1e40".parse().unwrap();
        assert_eq!(WRAP.to_int::<i32>(Numeric::Decimal(huge)).unwrap(), i32::MAX);
        let tiny: Decimal128 = "-1e40".parse().unwrap();
        assert_eq!(WRAP.to_int::<u64>(Numeric::Decimal(tiny)).unwrap(), 0);
    }

    #[test]
    fn strict_overflow_is_an_overflow_error() {
        let err = STRICT
            .to_int::<i32>(Numeric::Int(i64::MAX as i128))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert!(matches!(err, CodecError::Overflow(_)));
        assert!(STRICT.to_int::<i32>(Numeric::Int(i32::MAX as i128)).is_ok());
        assert!(STRICT.to_int::<i32>(Numeric::Int(i32::MAX as i128 + 1)).is_err());
        assert!(STRICT.to_int::<u8>(Numeric::Int(-1)).is_err());
    }

    #[test]
    fn fractions_need_truncation_opt_in() {
        let err = STRICT.to_int::<i32>(Numeric::Double(1.5)).unwrap_err();
        assert!(matches!(err, CodecError::Truncation(_)));
        assert_eq!(err.kind(), ErrorKind::Overflow);

        let lenient = NumericConverter {
            allow_overflow: false,
            allow_truncation: true,
        };
        assert_eq!(lenient.to_int::<i32>(Numeric::Double(1.5)).unwrap(), 1);
        assert_eq!(lenient.to_int::<i32>(Numeric::Double(-1.5)).unwrap(), -1);
        let half: Decimal128 = "2.5".parse().unwrap();
        assert_eq!(lenient.to_int::<i64>(Numeric::Decimal(half)).unwrap(), 2);
        assert!(STRICT.to_int::<i64>(Numeric::Decimal(half)).is_err());
    }

    #[test]
    fn special_floats_never_become_integers_or_decimals() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(NumericConverter::LENIENT.to_int::<i64>(Numeric::Double(v)).is_err());
            assert!(NumericConverter::LENIENT.to_decimal(Numeric::Double(v)).is_err());
            assert!(STRICT.to_f32(Numeric::Double(v)).is_ok());
        }
        assert!(STRICT.to_f32(Numeric::Double(f64::NAN)).unwrap().is_nan());
        assert_eq!(
            STRICT.to_f32(Numeric::Double(f64::INFINITY)).unwrap(),
            f32::INFINITY
        );
    }

    #[test]
    fn large_integers_lose_precision_as_doubles() {
        let big = (1i128 << 53) + 1;
        assert!(STRICT.to_f64(Numeric::Int(big)).is_err());
        assert!(STRICT.to_f64(Numeric::Int(1i128 << 53)).is_ok());
        assert!(STRICT.to_f64(Numeric::Int(i64::MAX as i128)).is_err());
    }

    #[test]
    fn float_extremes_map_onto_each_other() {
        assert_eq!(STRICT.to_f32(Numeric::Double(f64::MAX)).unwrap(), f32::MAX);
        assert_eq!(STRICT.to_f64(Numeric::Single(f32::MIN)).unwrap(), f64::MIN);
        assert_eq!(STRICT.to_decimal(Numeric::Double(f64::MAX)).unwrap(), Decimal128::MAX);
        assert_eq!(STRICT.to_f64(Numeric::Decimal(Decimal128::MIN)).unwrap(), f64::MIN);
    }

    #[test]
    fn doubles_beyond_single_range_overflow() {
        let err = STRICT.to_f32(Numeric::Double(1e300)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(WRAP.to_f32(Numeric::Double(1e300)).unwrap(), f32::INFINITY);
        assert!(STRICT.to_f32(Numeric::Double(0.1)).is_err());
        assert_eq!(STRICT.to_f32(Numeric::Double(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn decimals_convert_exactly_when_possible() {
        let tenth: Decimal128 = "0.1".parse().unwrap();
        assert_eq!(STRICT.to_f64(Numeric::Decimal(tenth)).unwrap(), 0.1);
        let precise: Decimal128 = "0.12345678901234567890123".parse().unwrap();
        assert!(STRICT.to_f64(Numeric::Decimal(precise)).is_err());
    }

    proptest! {
        #[test]
        fn i32_round_trips_through_double(v in any::<i32>()) {
            let d = STRICT.to_f64(Numeric::Int(v as i128)).unwrap();
            prop_assert_eq!(STRICT.to_int::<i32>(Numeric::Double(d)).unwrap(), v);
        }

        #[test]
        fn i64_round_trips_through_decimal(v in any::<i64>()) {
            let d = STRICT.to_decimal(Numeric::Int(v as i128)).unwrap();
            prop_assert_eq!(STRICT.to_int::<i64>(Numeric::Decimal(d)).unwrap(), v);
        }

        #[test]
        fn unsigned_wrap_restores_bit_pattern(v in any::<u32>()) {
            let stored = WRAP.to_int::<i32>(Numeric::Int(v as i128)).unwrap();
            prop_assert_eq!(stored, v as i32);
            prop_assert_eq!(WRAP.to_int::<u32>(Numeric::Int(stored as i128)).unwrap(), v);
        }

        #[test]
        fn u64_wrap_restores_bit_pattern(v in any::<u64>()) {
            let stored = WRAP.to_int::<i64>(Numeric::Int(v as i128)).unwrap();
            prop_assert_eq!(WRAP.to_int::<u64>(Numeric::Int(stored as i128)).unwrap(), v);
        }

        #[test]
        fn finite_doubles_round_trip_through_decimal(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let d = STRICT.to_decimal(Numeric::Double(v)).unwrap();
            prop_assert_eq!(STRICT.to_f64(Numeric::Decimal(d)).unwrap(), v);
        }
    }
}
