//! Arithmetic executor

use crate::decimal::{Decimal, MAX_RESULT_DIGITS};
use crate::error::ArithmeticError;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// The four binary operations served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    /// Method name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }

    /// Apply the operation to two resolved operands
    ///
    /// Pure; `div_precision` only affects `Div`. Results that would render
    /// beyond `MAX_RESULT_DIGITS` are refused before any digit is computed.
    pub fn apply(
        &self,
        a: &Decimal,
        b: &Decimal,
        div_precision: NonZeroU64,
    ) -> Result<Decimal, ArithmeticError> {
        let digits = self.result_digits(a, b, div_precision);
        if digits > MAX_RESULT_DIGITS {
            return Err(ArithmeticError::ResultTooLarge {
                digits,
                limit: MAX_RESULT_DIGITS,
            });
        }

        match self {
            ArithOp::Add => Ok(a.add(b)),
            ArithOp::Sub => Ok(a.sub(b)),
            ArithOp::Mul => Ok(a.mul(b)),
            ArithOp::Div => a.div(b, div_precision),
        }
    }

    /// Upper bound on the digits the result renders to, from the operands'
    /// digit ranges alone
    fn result_digits(&self, a: &Decimal, b: &Decimal, div_precision: NonZeroU64) -> u64 {
        let range = match (self, a.digit_range(), b.digit_range()) {
            (ArithOp::Add | ArithOp::Sub, Some((ha, la)), Some((hb, lb))) => {
                Some((ha.max(hb) + 1, la.min(lb)))
            }
            (ArithOp::Add | ArithOp::Sub, range, None) | (ArithOp::Add | ArithOp::Sub, None, range) => {
                range
            }
            (ArithOp::Mul, Some((ha, la)), Some((hb, lb))) => Some((ha + hb + 1, la + lb)),
            (ArithOp::Div, Some((ha, _)), Some((hb, _))) => {
                let precision = i64::try_from(div_precision.get()).unwrap_or(i64::MAX);
                let high = ha - hb + 1;
                Some((high, high.saturating_sub(precision)))
            }
            // Zero product, zero dividend, or a division that will fail
            _ => None,
        };

        match range {
            Some((high, low)) => high.max(0).saturating_sub(low.min(0)).saturating_add(1) as u64,
            None => 1,
        }
    }
}

impl FromStr for ArithOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ArithOp::Add),
            "sub" => Ok(ArithOp::Sub),
            "mul" => Ok(ArithOp::Mul),
            "div" => Ok(ArithOp::Div),
            other => Err(format!("unknown arithmetic op: {}", other)),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::DEFAULT_DIV_PRECISION;

    fn apply(op: ArithOp, a: &str, b: &str) -> Result<String, ArithmeticError> {
        let precision = NonZeroU64::new(DEFAULT_DIV_PRECISION).unwrap();
        op.apply(&Decimal::parse(a).unwrap(), &Decimal::parse(b).unwrap(), precision)
            .map(|v| v.to_string())
    }

    #[test]
    fn test_apply_each_op() {
        assert_eq!(apply(ArithOp::Add, "1", "0.005").unwrap(), "1.005");
        assert_eq!(apply(ArithOp::Sub, "0.3", "0.005").unwrap(), "0.295");
        assert_eq!(apply(ArithOp::Mul, "3", "0.005").unwrap(), "0.015");
        assert_eq!(apply(ArithOp::Div, "5", "2.5").unwrap(), "2");
    }

    #[test]
    fn test_mul_keeps_precision() {
        let product = apply(
            ArithOp::Mul,
            "0.000000000066731039356729",
            "6416930923733925522307001.29472615",
        )
        .unwrap();
        assert_eq!(product, "428208470021099.96114484339101847547483621476335");
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(apply(ArithOp::Div, "1", "0"), Err(ArithmeticError::DivisionByZero));
        assert_eq!(apply(ArithOp::Div, "-3.5", "0.00"), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_div_rounds_half_even() {
        let one = NonZeroU64::new(1).unwrap();
        let div = |a: &str, b: &str| {
            ArithOp::Div
                .apply(&Decimal::parse(a).unwrap(), &Decimal::parse(b).unwrap(), one)
                .unwrap()
                .to_string()
        };
        assert_eq!(div("5", "2e50"), format!("0.{}2", "0".repeat(49)));
        assert_eq!(div("25", "10"), "2");
        assert_eq!(div("35", "10"), "4");
        assert_eq!(div("251", "100"), "3");
    }

    #[test]
    fn test_oversized_results_refused() {
        let too_large = |result: Result<String, ArithmeticError>| {
            matches!(result, Err(ArithmeticError::ResultTooLarge { limit: MAX_RESULT_DIGITS, .. }))
        };
        assert!(too_large(apply(ArithOp::Mul, "1e1000000", "1e1000000")));
        assert!(too_large(apply(ArithOp::Add, "1e1000000", "1e-1000000")));
        assert!(too_large(apply(ArithOp::Sub, "1e-1000000", "1")));
        assert!(too_large(apply(ArithOp::Div, "1e1000000", "1e-1000000")));
        assert!(too_large(apply(ArithOp::Add, "1e1000000", "0")));

        let huge_precision = NonZeroU64::new(u64::MAX).unwrap();
        let (one, three) = (Decimal::parse("1").unwrap(), Decimal::parse("3").unwrap());
        let result = ArithOp::Div.apply(&one, &three, huge_precision);
        assert!(matches!(result, Err(ArithmeticError::ResultTooLarge { .. })));
    }

    #[test]
    fn test_large_results_within_limit() {
        let product = apply(ArithOp::Mul, "1e49999", "1e49999").unwrap();
        assert_eq!(product.len(), 99_999);
        assert!(product.starts_with('1'));

        assert_eq!(apply(ArithOp::Mul, "0", "1e1000000").unwrap(), "0");
        assert_eq!(apply(ArithOp::Div, "1e-1000000", "1e-1000000").unwrap(), "1");
    }

    #[test]
    fn test_parse_op() {
        for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div] {
            assert_eq!(op.as_str().parse::<ArithOp>(), Ok(op));
        }
        assert!("mod".parse::<ArithOp>().is_err());
        assert!("ADD".parse::<ArithOp>().is_err());
    }
}
