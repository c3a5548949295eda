//! Unsigned 18-decimal fixed-point numbers backed by `U256`
//!
//! Mirrors the on-chain `FixedPointMath` library. Every economic quantity is a
//! 256-bit integer scaled by 10^18, and every operation that could leave the
//! 256-bit range or divide by zero returns an error.
//!
//! ## Rounding
//!
//! Multiplication and division come in `_down` and `_up` variants that differ
//! only in truncation direction. Callers choose the direction per formula; the
//! [`Rounding`] enum is available for code that carries the direction as data.

use crate::errors::{FixedPointError, Result};
use crate::math;
use ethers_core::types::{I256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Truncation direction for a scaled multiplication or division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Truncate toward zero
    Down,
    /// Round away from zero when there is a remainder
    Up,
}

/// Unsigned fixed-point value with 18 decimal places
///
/// Examples:
/// - 1.0 = `FixedPoint::ONE` (raw 1_000_000_000_000_000_000)
/// - 0.05 = raw 50_000_000_000_000_000
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(U256);

const ONE_RAW: u64 = 1_000_000_000_000_000_000;

impl FixedPoint {
    /// Number of decimal places in the scale
    pub const DECIMALS: u32 = 18;

    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// 1.0 in fixed point
    pub const ONE: Self = Self(U256([ONE_RAW, 0, 0, 0]));

    pub const MAX: Self = Self(U256::MAX);

    /// Create from an already-scaled raw value
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Create from an already-scaled raw `u128`, usable in constants
    pub const fn from_raw_u128(raw: u128) -> Self {
        Self(U256([raw as u64, (raw >> 64) as u64, 0, 0]))
    }

    /// Create from a whole number of units, e.g. `from_units(5)` is 5.0
    pub fn from_units(units: u128) -> Result<Self> {
        U256::from(units)
            .checked_mul(U256::from(ONE_RAW))
            .map(Self)
            .ok_or(FixedPointError::Overflow {
                operation: "unit scaling",
            })
    }

    /// Parse a raw scaled value from its decimal integer representation
    ///
    /// This is the on-chain `uint256` textual form, so `"1500000000000000000"`
    /// is 1.5. Fractional and non-numeric input is rejected.
    pub fn from_dec_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FixedPointError::InvalidDecimal {
                input: input.to_string(),
            });
        }
        U256::from_dec_str(trimmed)
            .map(Self)
            .map_err(|_| FixedPointError::InvalidDecimal {
                input: input.to_string(),
            })
    }

    /// The raw scaled integer
    pub const fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(FixedPointError::Overflow { operation: "add" })
    }

    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(FixedPointError::Underflow { operation: "sub" })
    }

    /// Subtraction that floors at zero instead of failing
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self * other / divisor` with the requested rounding
    ///
    /// Fails if the intermediate product overflows 256 bits, matching the
    /// on-chain `mulDiv` guard, or if `divisor` is zero.
    pub fn mul_div(self, other: Self, divisor: Self, rounding: Rounding) -> Result<Self> {
        if divisor.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let product = self
            .0
            .checked_mul(other.0)
            .ok_or(FixedPointError::Overflow { operation: "mul_div" })?;
        let quotient = product / divisor.0;
        match rounding {
            Rounding::Down => Ok(Self(quotient)),
            Rounding::Up => {
                if (product % divisor.0).is_zero() {
                    Ok(Self(quotient))
                } else {
                    // quotient < U256::MAX whenever there is a remainder
                    Ok(Self(quotient + U256::one()))
                }
            }
        }
    }

    pub fn mul_div_down(self, other: Self, divisor: Self) -> Result<Self> {
        self.mul_div(other, divisor, Rounding::Down)
    }

    pub fn mul_div_up(self, other: Self, divisor: Self) -> Result<Self> {
        self.mul_div(other, divisor, Rounding::Up)
    }

    /// Scaled multiplication rounding toward zero
    pub fn mul_down(self, other: Self) -> Result<Self> {
        self.mul_div(other, Self::ONE, Rounding::Down)
    }

    /// Scaled multiplication rounding away from zero
    pub fn mul_up(self, other: Self) -> Result<Self> {
        self.mul_div(other, Self::ONE, Rounding::Up)
    }

    /// Scaled division rounding toward zero
    pub fn div_down(self, other: Self) -> Result<Self> {
        self.mul_div(Self::ONE, other, Rounding::Down)
    }

    /// Scaled division rounding away from zero
    pub fn div_up(self, other: Self) -> Result<Self> {
        self.mul_div(Self::ONE, other, Rounding::Up)
    }

    /// `self ^ exponent` computed as `exp(exponent * ln(self))`
    ///
    /// Matches the on-chain implementation bit for bit, including the
    /// `x^0 = 1` and `0^y = 0` shortcuts.
    pub fn pow(self, exponent: Self) -> Result<Self> {
        if exponent.is_zero() {
            return Ok(Self::ONE);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        let exponent = I256::try_from(exponent)?;
        let ln_x = math::ln(I256::try_from(self)?)?;
        let y_ln_x = math::scaled_wrapping_mul(exponent, ln_x);
        Self::try_from(math::exp(y_ln_x)?)
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Lossy conversion for logging and diagnostics only
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl From<U256> for FixedPoint {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl From<FixedPoint> for U256 {
    fn from(value: FixedPoint) -> Self {
        value.0
    }
}

impl TryFrom<FixedPoint> for I256 {
    type Error = FixedPointError;

    fn try_from(value: FixedPoint) -> Result<Self> {
        if value.0.bit(255) {
            return Err(FixedPointError::UnsafeCastToI256 {
                value: value.0.to_string(),
            });
        }
        Ok(I256::from_raw(value.0))
    }
}

impl TryFrom<I256> for FixedPoint {
    type Error = FixedPointError;

    fn try_from(value: I256) -> Result<Self> {
        if value.is_negative() {
            return Err(FixedPointError::NegativeValue {
                value: value.to_string(),
            });
        }
        Ok(Self(value.into_raw()))
    }
}

impl FromStr for FixedPoint {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_dec_str(s)
    }
}

/// Human-readable decimal form, e.g. `1.500000000000000000`
impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let one = U256::from(ONE_RAW);
        let whole = self.0 / one;
        let frac = self.0 % one;
        write!(f, "{}.{:0>18}", whole, frac.to_string())
    }
}

/// Serialized as the raw scaled decimal string so 256-bit values survive JSON
impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_dec_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(raw: u128) -> FixedPoint {
        FixedPoint::from_raw_u128(raw)
    }

    #[test]
    fn test_constants() {
        assert_eq!(FixedPoint::ONE.raw(), U256::exp10(18));
        assert!(FixedPoint::ZERO.is_zero());
        assert_eq!(FixedPoint::from_units(3).unwrap(), fp(3_000_000_000_000_000_000));
    }

    #[test]
    fn test_mul_rounding() {
        // 1e-18 * 0.5 = 0.5e-18
        let tiny = fp(1);
        let half = fp(500_000_000_000_000_000);
        assert_eq!(tiny.mul_down(half).unwrap(), FixedPoint::ZERO);
        assert_eq!(tiny.mul_up(half).unwrap(), fp(1));

        let two = fp(2_000_000_000_000_000_000);
        let three = fp(3_000_000_000_000_000_000);
        assert_eq!(two.mul_down(three).unwrap(), fp(6_000_000_000_000_000_000));
        assert_eq!(two.mul_up(three).unwrap(), fp(6_000_000_000_000_000_000));
    }

    #[test]
    fn test_div_rounding() {
        let one = FixedPoint::ONE;
        let three = fp(3_000_000_000_000_000_000);
        assert_eq!(one.div_down(three).unwrap(), fp(333_333_333_333_333_333));
        assert_eq!(one.div_up(three).unwrap(), fp(333_333_333_333_333_334));
        assert_eq!(
            one.mul_div(three, three, Rounding::Up).unwrap(),
            one.mul_div_down(three, three).unwrap()
        );
    }

    #[test]
    fn test_checked_failures() {
        assert_eq!(
            FixedPoint::ONE.div_down(FixedPoint::ZERO),
            Err(FixedPointError::DivisionByZero)
        );
        assert!(matches!(
            FixedPoint::ZERO.checked_sub(FixedPoint::ONE),
            Err(FixedPointError::Underflow { .. })
        ));
        assert!(matches!(
            FixedPoint::MAX.checked_add(fp(1)),
            Err(FixedPointError::Overflow { .. })
        ));
        // Intermediate product overflow is an error even if the quotient fits
        assert!(matches!(
            FixedPoint::MAX.mul_div_down(fp(2), fp(4)),
            Err(FixedPointError::Overflow { .. })
        ));
        assert_eq!(FixedPoint::ZERO.saturating_sub(FixedPoint::ONE), FixedPoint::ZERO);
    }

    #[test]
    fn test_pow() {
        assert_eq!(fp(123).pow(FixedPoint::ZERO).unwrap(), FixedPoint::ONE);
        assert_eq!(FixedPoint::ZERO.pow(FixedPoint::ONE).unwrap(), FixedPoint::ZERO);

        // 0.5 ^ 0.1
        let result = fp(500_000_000_000_000_000)
            .pow(fp(100_000_000_000_000_000))
            .unwrap();
        assert_eq!(result, fp(933_032_991_536_807_415));

        // 2 ^ 2 is within a few wei of 4
        let four = fp(2_000_000_000_000_000_000)
            .pow(fp(2_000_000_000_000_000_000))
            .unwrap();
        let expected = fp(4_000_000_000_000_000_000);
        let diff = if four > expected {
            four.checked_sub(expected).unwrap()
        } else {
            expected.checked_sub(four).unwrap()
        };
        assert!(diff < fp(1_000), "2^2 = {}", four);
    }

    #[test]
    fn test_parse_and_display() {
        let value: FixedPoint = "1500000000000000000".parse().unwrap();
        assert_eq!(value, fp(1_500_000_000_000_000_000));
        assert_eq!(value.to_string(), "1.500000000000000000");
        assert_eq!(fp(5).to_string(), "0.000000000000000005");

        for bad in ["asdf", "1.23", "", "-1", "1e18"] {
            assert!(
                matches!(
                    FixedPoint::from_dec_str(bad),
                    Err(FixedPointError::InvalidDecimal { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_signed_conversions() {
        let value = I256::try_from(FixedPoint::ONE).unwrap();
        assert_eq!(value, I256::from(ONE_RAW as i64));
        assert!(FixedPoint::try_from(I256::from(-1i64)).is_err());
        assert!(I256::try_from(FixedPoint::MAX).is_err());
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&FixedPoint::ONE).unwrap();
        assert_eq!(json, "\"1000000000000000000\"");
        let back: FixedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FixedPoint::ONE);
        assert!(serde_json::from_str::<FixedPoint>("\"1.5\"").is_err());
    }
}
