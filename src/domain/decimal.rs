//! Lossless decimal amount type backed by rust_decimal.
//!
//! Balances, redeemable values, fee rates and USD amounts all flow through this
//! type so that fee and net-amount arithmetic never drifts.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure of a checked arithmetic operation on [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("decimal arithmetic overflowed")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Lossless decimal amount.
///
/// Serializes to a JSON number (not a string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Build a Decimal from a JSON float, as returned by services that do not
    /// quote their numbers.
    pub fn from_f64(value: f64) -> Option<Self> {
        RustDecimal::try_from(value).ok().map(Decimal)
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn checked_add(self, rhs: Decimal) -> Result<Decimal, ArithmeticError> {
        self.0
            .checked_add(rhs.0)
            .map(Decimal)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, rhs: Decimal) -> Result<Decimal, ArithmeticError> {
        self.0
            .checked_sub(rhs.0)
            .map(Decimal)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Result<Decimal, ArithmeticError> {
        self.0
            .checked_mul(rhs.0)
            .map(Decimal)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_div(self, rhs: Decimal) -> Result<Decimal, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        self.0
            .checked_div(rhs.0)
            .map(Decimal)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn max_value() -> Self {
        Decimal(RustDecimal::MAX)
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Round half away from zero to `dp` decimal places.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Restrict the value to `[min, max]`.
    pub fn clamp_to(&self, min: Decimal, max: Decimal) -> Self {
        if *self < min {
            min
        } else if *self > max {
            max
        } else {
            *self
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_strips_trailing_zeros() {
        assert_eq!(d("50.000").to_canonical_string(), "50");
        assert_eq!(d(" 12.50 ").to_canonical_string(), "12.5");
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");
        assert_eq!(a.checked_add(b).unwrap().to_canonical_string(), "13");
        assert_eq!(a.checked_sub(b).unwrap().to_canonical_string(), "8");
        assert_eq!(a.checked_mul(b).unwrap().to_canonical_string(), "26.25");
        assert_eq!(a.checked_div(b).unwrap().to_canonical_string(), "4.2");
    }

    #[test]
    fn test_decimal_overflow_is_an_error() {
        let max = Decimal::max_value();
        assert_eq!(max.checked_add(d("1")), Err(ArithmeticError::Overflow));
        assert_eq!(max.checked_mul(d("2")), Err(ArithmeticError::Overflow));
        assert_eq!((-max).checked_sub(d("1")), Err(ArithmeticError::Overflow));
        assert_eq!(d("1").checked_div(Decimal::zero()), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_decimal_sign_predicates() {
        assert!(d("0.01").is_positive());
        assert!(d("-0.01").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }

    #[test]
    fn test_decimal_json_serialization() {
        let json = serde_json::to_value(d("123.456")).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(Decimal::from_f64(2.5), Some(d("2.5")));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
    }

    #[test]
    fn test_decimal_round_and_clamp() {
        assert_eq!(d("1.005").round_dp(2), d("1.01"));
        assert_eq!(d("-1.005").round_dp(2), d("-1.01"));
        assert_eq!(d("150").clamp_to(Decimal::zero(), Decimal::hundred()), d("100"));
        assert_eq!(d("-3").clamp_to(Decimal::zero(), Decimal::hundred()), d("0"));
        assert_eq!(d("7.5").clamp_to(Decimal::zero(), Decimal::hundred()), d("7.5"));
    }
}
