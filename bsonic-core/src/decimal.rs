use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::CodecError;

const MAX_DIGITS: usize = 34;
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;
const MIN_EXPONENT: i32 = -6176;
const MAX_EXPONENT: i32 = 6111;

/// A finite 128-bit decimal: up to 34 significant digits scaled by a power of ten.
///
/// Values compare by magnitude, so `1.0` and `1.00` are equal.
#[derive(Debug, Clone, Copy)]
pub struct Decimal128 {
    negative: bool,
    coefficient: u128,
    exponent: i32,
}

impl Decimal128 {
    pub const ZERO: Decimal128 = Decimal128 {
        negative: false,
        coefficient: 0,
        exponent: 0,
    };
    pub const ONE: Decimal128 = Decimal128 {
        negative: false,
        coefficient: 1,
        exponent: 0,
    };
    pub const MAX: Decimal128 = Decimal128 {
        negative: false,
        coefficient: MAX_COEFFICIENT,
        exponent: MAX_EXPONENT,
    };
    pub const MIN: Decimal128 = Decimal128 {
        negative: true,
        coefficient: MAX_COEFFICIENT,
        exponent: MAX_EXPONENT,
    };

    /// Builds a decimal from its parts, or `None` if they are out of range.
    pub fn from_parts(negative: bool, coefficient: u128, exponent: i32) -> Option<Self> {
        if coefficient > MAX_COEFFICIENT || !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return None;
        }
        Some(Decimal128 {
            negative,
            coefficient,
            exponent,
        })
    }

    /// Exact conversion; `None` when the integer needs more than 34 digits.
    pub fn from_i128(value: i128) -> Option<Self> {
        Decimal128::from_parts(value < 0, value.unsigned_abs(), 0)
    }

    /// Shortest decimal that converts back to the same `f64`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        format!("{value:e}").parse().ok()
    }

    /// Shortest decimal that converts back to the same `f32`.
    pub fn from_f32(value: f32) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        format!("{value:e}").parse().ok()
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == 0
    }

    pub fn is_sign_negative(&self) -> bool {
        self.negative && self.coefficient != 0
    }

    /// Discards the fractional part, rounding toward zero.
    pub fn trunc(&self) -> Decimal128 {
        if self.exponent >= 0 {
            return *self;
        }
        let scale = -self.exponent as u32;
        let coefficient = match 10u128.checked_pow(scale) {
            Some(divisor) => self.coefficient / divisor,
            None => 0,
        };
        Decimal128 {
            negative: self.negative,
            coefficient,
            exponent: 0,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.trunc() == *self
    }

    /// The integral value, if the decimal has no fractional part and fits an `i128`.
    pub fn to_i128(&self) -> Option<i128> {
        if !self.is_integral() {
            return None;
        }
        let (negative, coefficient, exponent) = self.normalized();
        let magnitude = coefficient.checked_mul(10u128.checked_pow(exponent.max(0) as u32)?)?;
        if negative {
            0i128.checked_sub_unsigned(magnitude)
        } else {
            i128::try_from(magnitude).ok()
        }
    }

    /// Nearest `f64`; magnitudes beyond the `f64` range become infinite.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Nearest `f32`; magnitudes beyond the `f32` range become infinite.
    pub fn to_f32(&self) -> f32 {
        self.to_string().parse().unwrap_or(f32::NAN)
    }

    fn normalized(&self) -> (bool, u128, i32) {
        if self.coefficient == 0 {
            return (false, 0, 0);
        }
        let mut coefficient = self.coefficient;
        let mut exponent = self.exponent;
        while coefficient % 10 == 0 {
            coefficient /= 10;
            exponent += 1;
        }
        (self.negative, coefficient, exponent)
    }
}

impl PartialEq for Decimal128 {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Decimal128 {}

impl Hash for Decimal128 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl From<i32> for Decimal128 {
    fn from(value: i32) -> Self {
        Decimal128 {
            negative: value < 0,
            coefficient: value.unsigned_abs() as u128,
            exponent: 0,
        }
    }
}

impl From<i64> for Decimal128 {
    fn from(value: i64) -> Self {
        Decimal128 {
            negative: value < 0,
            coefficient: value.unsigned_abs() as u128,
            exponent: 0,
        }
    }
}

impl From<u64> for Decimal128 {
    fn from(value: u64) -> Self {
        Decimal128 {
            negative: false,
            coefficient: value as u128,
            exponent: 0,
        }
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sign_negative() {
            f.write_str("-")?;
        }
        let digits = self.coefficient.to_string();
        let adjusted = self.exponent as i64 + digits.len() as i64 - 1;

        if self.exponent <= 0 && adjusted >= -6 {
            let scale = (-self.exponent) as usize;
            if scale == 0 {
                return f.write_str(&digits);
            }
            if digits.len() > scale {
                let (int, frac) = digits.split_at(digits.len() - scale);
                return write!(f, "{int}.{frac}");
            }
            return write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits);
        }

        let (first, rest) = digits.split_at(1);
        f.write_str(first)?;
        if !rest.is_empty() {
            write!(f, ".{rest}")?;
        }
        if adjusted >= 0 {
            write!(f, "E+{adjusted}")
        } else {
            write!(f, "E{adjusted}")
        }
    }
}

impl FromStr for Decimal128 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::format(format!("'{s}' is not a valid Decimal128"));

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(at) => {
                let exponent: i64 = body[at + 1..].parse().map_err(|_| invalid())?;
                (&body[..at], exponent)
            }
            None => (body, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
        let out_of_range = || CodecError::format(format!("'{s}' is outside the Decimal128 range"));
        let mut exponent = exponent
            .checked_sub(frac_part.len() as i64)
            .ok_or_else(out_of_range)?;
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(Decimal128 {
                negative,
                coefficient: 0,
                exponent: exponent.clamp(MIN_EXPONENT as i64, MAX_EXPONENT as i64) as i32,
            });
        }
        digits = trimmed.to_string();
        while digits.len() > MAX_DIGITS && digits.ends_with('0') {
            digits.pop();
            exponent = exponent.checked_add(1).ok_or_else(out_of_range)?;
        }
        if digits.len() > MAX_DIGITS {
            return Err(CodecError::format(format!(
                "'{s}' has more than {MAX_DIGITS} significant digits"
            )));
        }
        let mut coefficient: u128 = digits.parse().map_err(|_| invalid())?;
        while exponent > MAX_EXPONENT as i64 && coefficient * 10 <= MAX_COEFFICIENT {
            coefficient *= 10;
            exponent -= 1;
        }
        if !(MIN_EXPONENT as i64..=MAX_EXPONENT as i64).contains(&exponent) {
            return Err(out_of_range());
        }
        Ok(Decimal128 {
            negative,
            coefficient,
            exponent: exponent as i32,
        })
    }
}
