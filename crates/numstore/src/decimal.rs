//! Arbitrary-precision decimal values
//!
//! Wraps `BigDecimal` behind a strict literal grammar and a canonical
//! plain-notation rendering. Values are immutable: arithmetic always
//! produces a new `Decimal`.

use crate::error::ArithmeticError;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use thiserror::Error;

/// Largest exponent magnitude accepted in a literal (`1e1000000`)
pub const MAX_EXPONENT: i64 = 1_000_000;

/// Significant digits kept by division unless configured otherwise
pub const DEFAULT_DIV_PRECISION: u64 = 50;

/// Upper bound for the division precision setting
pub const MAX_DIV_PRECISION: u64 = 100;

/// Largest number of digits an arithmetic result may render to
pub const MAX_RESULT_DIGITS: u64 = 100_000;

/// Literal parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    #[error("empty literal")]
    Empty,

    #[error("unexpected character {found:?} at offset {offset}")]
    InvalidCharacter { found: char, offset: usize },

    #[error("multiple decimal points")]
    MultiplePoints,

    #[error("literal has no digits")]
    NoDigits,

    #[error("malformed exponent")]
    MalformedExponent,

    #[error("exponent out of range (max magnitude {})", MAX_EXPONENT)]
    ExponentOutOfRange,
}

/// Immutable arbitrary-precision signed decimal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Parse a literal: `[+-]? digits ['.' digits] [(e|E) [+-]? digits]`
    ///
    /// At least one mantissa digit is required; `.5` and `5.` are accepted.
    /// Whitespace anywhere is rejected.
    pub fn parse(text: &str) -> Result<Self, DecimalError> {
        if text.is_empty() {
            return Err(DecimalError::Empty);
        }

        let bytes = text.as_bytes();
        let mut pos = 0;
        let negative = match bytes[0] {
            b'-' => {
                pos = 1;
                true
            }
            b'+' => {
                pos = 1;
                false
            }
            _ => false,
        };

        let mut digits = String::with_capacity(text.len());
        let mut frac_digits: i64 = 0;
        let mut seen_point = false;

        while pos < bytes.len() {
            match bytes[pos] {
                b @ b'0'..=b'9' => {
                    digits.push(b as char);
                    if seen_point {
                        frac_digits += 1;
                    }
                }
                b'.' if seen_point => return Err(DecimalError::MultiplePoints),
                b'.' => seen_point = true,
                b'e' | b'E' => break,
                _ => return Err(invalid_character(text, pos)),
            }
            pos += 1;
        }

        if digits.is_empty() {
            return Err(DecimalError::NoDigits);
        }

        let exponent = if pos < bytes.len() {
            parse_exponent(text, pos + 1)?
        } else {
            0
        };

        if negative {
            digits.insert(0, '-');
        }
        // Only ASCII digits with an optional sign reach this point
        let mantissa = BigInt::from_str(&digits).map_err(|_| DecimalError::NoDigits)?;

        Ok(Self(BigDecimal::new(mantissa, frac_digits - exponent)))
    }

    /// Check whether `text` follows the literal grammar, ignoring the
    /// exponent range
    pub fn is_numeric_literal(text: &str) -> bool {
        matches!(Self::parse(text), Ok(_) | Err(DecimalError::ExponentOutOfRange))
    }

    /// Check whether the value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Powers of ten spanned by the stored digits, most significant first
    ///
    /// `None` for zero. Trailing zeros of the mantissa are counted, so the
    /// range may be wider than the canonical rendering.
    pub(crate) fn digit_range(&self) -> Option<(i64, i64)> {
        if self.is_zero() {
            return None;
        }
        let (mantissa, scale) = self.0.as_bigint_and_exponent();
        let low = -scale;
        Some((low + digit_count(mantissa.magnitude()) - 1, low))
    }

    pub fn add(&self, other: &Decimal) -> Decimal {
        Decimal(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &Decimal) -> Decimal {
        Decimal(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal(&self.0 * &other.0)
    }

    /// Divide, rounding half-even to `precision` significant digits
    ///
    /// The quotient is rounded once, against the exact remainder.
    pub fn div(&self, other: &Decimal, precision: NonZeroU64) -> Result<Decimal, ArithmeticError> {
        if other.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Decimal(BigDecimal::zero()));
        }

        let (num, num_scale) = self.0.as_bigint_and_exponent();
        let (den, den_scale) = other.0.as_bigint_and_exponent();
        let negative = num.sign() != den.sign();
        let num = num.magnitude();
        let den = den.magnitude();
        let precision = i64::try_from(precision.get()).unwrap_or(i64::MAX);

        // Scale the numerator so the integer quotient keeps at least
        // `precision + 1` digits
        let shift = (precision + digit_count(den) - digit_count(num) + 1).max(0);
        let scaled = num * pow10(shift);
        let quotient = &scaled / den;
        let remainder = &scaled % den;

        let excess = (digit_count(&quotient) - precision).max(0);
        let unit = pow10(excess);
        let mut kept = &quotient / &unit;
        let dropped = &quotient % &unit;

        // Discarded fraction is (dropped + remainder / den) / unit
        let twice_fraction = (dropped * den + remainder) * 2u32;
        let round_up = match twice_fraction.cmp(&(&unit * den)) {
            Ordering::Greater => true,
            Ordering::Equal => kept.bit(0),
            Ordering::Less => false,
        };
        if round_up {
            kept += 1u32;
        }

        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let scale = shift - excess + num_scale - den_scale;
        Ok(Decimal(BigDecimal::new(BigInt::from_biguint(sign, kept), scale)))
    }
}

/// Number of decimal digits in `n` (1 for zero)
fn digit_count(n: &BigUint) -> i64 {
    if n.is_zero() {
        return 1;
    }
    // 2^(bits-1) <= n < 2^bits pins the count to one of two neighbours
    let bits = n.bits();
    let mut digits = ((bits - 1) as f64 * std::f64::consts::LOG10_2) as i64 + 1;
    while digits > 1 && *n < pow10(digits - 1) {
        digits -= 1;
    }
    while *n >= pow10(digits) {
        digits += 1;
    }
    digits
}

fn pow10(exponent: i64) -> BigUint {
    let exponent = u32::try_from(exponent.max(0)).unwrap_or(u32::MAX);
    BigUint::from(10u32).pow(exponent)
}

fn invalid_character(text: &str, offset: usize) -> DecimalError {
    // Every byte before `offset` is ASCII, so `offset` is a char boundary
    let found = text[offset..].chars().next().unwrap_or('\u{fffd}');
    DecimalError::InvalidCharacter { found, offset }
}

fn parse_exponent(text: &str, start: usize) -> Result<i64, DecimalError> {
    let bytes = text.as_bytes();
    let mut pos = start;
    if pos < bytes.len() && matches!(bytes[pos], b'+' | b'-') {
        pos += 1;
    }
    let digits_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == digits_start {
        return match bytes.get(pos) {
            Some(_) => Err(invalid_character(text, pos)),
            None => Err(DecimalError::MalformedExponent),
        };
    }
    if pos < bytes.len() {
        return Err(invalid_character(text, pos));
    }

    let exponent: i64 = text[start..]
        .parse()
        .map_err(|_| DecimalError::ExponentOutOfRange)?;
    if exponent.abs() > MAX_EXPONENT {
        return Err(DecimalError::ExponentOutOfRange);
    }
    Ok(exponent)
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: plain notation, no trailing fractional zeros, no
/// trailing point, `0` for any zero.
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_zero() {
            return f.write_str("0");
        }

        let (mantissa, scale) = self.0.normalized().as_bigint_and_exponent();
        let digits = mantissa.magnitude().to_string();
        let mut out = String::with_capacity(digits.len() + 2);

        if mantissa.sign() == Sign::Minus {
            out.push('-');
        }

        if scale <= 0 {
            out.push_str(&digits);
            out.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        } else {
            let scale = scale as usize;
            if digits.len() > scale {
                let (int_part, frac_part) = digits.split_at(digits.len() - scale);
                out.push_str(int_part);
                out.push('.');
                out.push_str(frac_part);
            } else {
                out.push_str("0.");
                out.extend(std::iter::repeat('0').take(scale - digits.len()));
                out.push_str(&digits);
            }
        }

        f.write_str(&out)
    }
}
