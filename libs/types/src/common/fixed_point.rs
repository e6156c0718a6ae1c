//! Fixed-point arithmetic with 18 fractional decimal digits
//!
//! Values are 256-bit integers scaled by [`BONE`] (`10^18`). Multiplication and
//! division round half-up exactly the way the pool contract does, so every
//! result computed here is bit-for-bit what the chain would compute.
//!
//! ## Design Principles
//!
//! - **No Floating Point**: every operation is integer arithmetic on scaled values
//! - **Overflow Protection**: checked arithmetic with named errors, never wrapping
//! - **Reproducible Rounding**: half-up multiply/divide identical to the contract
//! - **Transparency**: decimal strings only at the parsing/display boundary

use crate::common::errors::FixedPointError;
use crate::common::format::format_balance;
use ethers_core::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed-point scaling constant, representing `1.0`
pub const BONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Convergence bound of the fractional power series (`BONE / 10^10`)
pub const BPOW_PRECISION: U256 = U256([100_000_000, 0, 0, 0]);

/// Smallest base accepted when the exponent has a fractional part
pub const MIN_BPOW_BASE: U256 = U256([1, 0, 0, 0]);

/// Largest base accepted when the exponent has a fractional part (`2·BONE - 1`)
pub const MAX_BPOW_BASE: U256 = U256([1_999_999_999_999_999_999, 0, 0, 0]);

/// Fixed-point value with 18 decimal places of precision
///
/// Scale factor: 1,000,000,000,000,000,000 (10^18)
///
/// Examples:
/// - 1.0 = FixedPoint18(10^18)
/// - 0.003 = FixedPoint18(3 * 10^15)
/// - 1 wei of an 18-decimal token = FixedPoint18(1)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FixedPoint18(pub U256);

impl FixedPoint18 {
    /// Zero
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// One (`BONE`)
    pub const ONE: Self = Self(BONE);

    /// Create from raw scaled integer
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Get the raw scaled integer value
    pub fn raw_value(self) -> U256 {
        self.0
    }

    /// Create from a whole number of units (`value * BONE`)
    pub fn from_integer(value: u64) -> Self {
        Self(U256::from(value) * BONE)
    }

    /// Create from a decimal string with exact parsing
    ///
    /// This is the PRIMARY method for creating fixed-point values from
    /// configuration files or user input. Digits beyond the 18th decimal
    /// place are truncated.
    ///
    /// # Examples
    /// ```
    /// use types::FixedPoint18;
    ///
    /// let fee = FixedPoint18::from_decimal_str("0.003").unwrap();
    /// assert_eq!(fee.raw_value().as_u64(), 3_000_000_000_000_000);
    /// ```
    pub fn from_decimal_str(s: &str) -> Result<Self, FixedPointError> {
        let invalid = || FixedPointError::InvalidDecimal {
            input: s.to_string(),
        };

        let decimal = Decimal::from_str(s.trim()).map_err(|_| invalid())?;
        if decimal.is_sign_negative() {
            return Err(invalid());
        }

        let whole = decimal.trunc();
        let fraction = decimal - whole;

        let whole_units = whole.to_u128().ok_or_else(invalid)?;
        let fraction_units = (fraction * Decimal::from(BONE.as_u64()))
            .trunc()
            .to_u128()
            .ok_or_else(invalid)?;

        U256::from(whole_units)
            .checked_mul(BONE)
            .and_then(|scaled| scaled.checked_add(U256::from(fraction_units)))
            .map(Self)
            .ok_or(FixedPointError::Overflow {
                operation: "decimal parse",
            })
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn try_add(self, rhs: Self) -> Result<Self, FixedPointError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::Overflow { operation: "add" })
    }

    pub fn try_sub(self, rhs: Self) -> Result<Self, FixedPointError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::Underflow {
                operation: "subtract",
            })
    }

    /// Absolute difference plus a flag that is `true` when `rhs > self`
    pub fn sub_sign(self, rhs: Self) -> (Self, bool) {
        if self >= rhs {
            (Self(self.0 - rhs.0), false)
        } else {
            (Self(rhs.0 - self.0), true)
        }
    }

    /// Truncate to whole units (`self / BONE`), returned unscaled
    pub fn to_integer(self) -> U256 {
        self.0 / BONE
    }

    /// Round down to a whole number of units, kept scaled
    pub fn floor(self) -> Self {
        Self(self.to_integer() * BONE)
    }

    /// `round_half_up(self * rhs / BONE)`
    pub fn mul_fixed(self, rhs: Self) -> Result<Self, FixedPointError> {
        let overflow = FixedPointError::Overflow {
            operation: "multiply",
        };
        let product = self.0.checked_mul(rhs.0).ok_or(overflow.clone())?;
        let rounded = product.checked_add(BONE / 2).ok_or(overflow)?;
        Ok(Self(rounded / BONE))
    }

    /// `round_half_up(self * BONE / rhs)`
    pub fn div_fixed(self, rhs: Self) -> Result<Self, FixedPointError> {
        if rhs.0.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let overflow = FixedPointError::Overflow { operation: "divide" };
        let scaled = self.0.checked_mul(BONE).ok_or(overflow.clone())?;
        let rounded = scaled.checked_add(rhs.0 / 2).ok_or(overflow)?;
        Ok(Self(rounded / rhs.0))
    }

    /// Raise to a fixed-point exponent
    ///
    /// The integer part of the exponent is applied with exponentiation by
    /// squaring; the fractional remainder with the binomial series used by the
    /// pool contract, converging to [`BPOW_PRECISION`].
    pub fn pow_fixed(self, exponent: Self) -> Result<Self, FixedPointError> {
        let whole = exponent.floor();
        let remain = Self(exponent.0 - whole.0);

        let whole_pow = self.powi(whole.to_integer())?;
        if remain.is_zero() {
            return Ok(whole_pow);
        }

        if self.0 < MIN_BPOW_BASE || self.0 > MAX_BPOW_BASE {
            return Err(FixedPointError::PowerBaseOutOfRange {
                base: self.0,
                min: MIN_BPOW_BASE,
                max: MAX_BPOW_BASE,
            });
        }

        let partial = self.pow_approx(remain, Self(BPOW_PRECISION))?;
        whole_pow.mul_fixed(partial)
    }

    /// Exponentiation by squaring over `mul_fixed`
    fn powi(self, n: U256) -> Result<Self, FixedPointError> {
        let two = U256::from(2u8);
        let mut a = self;
        let mut n = n;
        let mut z = if n % two != U256::zero() { a } else { Self::ONE };

        n /= two;
        while !n.is_zero() {
            a = a.mul_fixed(a)?;
            if n % two != U256::zero() {
                z = z.mul_fixed(a)?;
            }
            n /= two;
        }
        Ok(z)
    }

    /// Binomial series for `self^exp` with `exp < 1`
    fn pow_approx(self, exp: Self, precision: Self) -> Result<Self, FixedPointError> {
        let a = exp;
        let (x, xneg) = self.sub_sign(Self::ONE);
        let mut term = Self::ONE;
        let mut sum = term;
        let mut negative = false;

        let mut i: u64 = 1;
        while term >= precision {
            let big_k = Self::from_integer(i);
            let (c, cneg) = a.sub_sign(Self(big_k.0 - BONE));
            term = term.mul_fixed(c.mul_fixed(x)?)?;
            term = term.div_fixed(big_k)?;
            if term.is_zero() {
                break;
            }

            if xneg {
                negative = !negative;
            }
            if cneg {
                negative = !negative;
            }
            sum = if negative {
                sum.try_sub(term)?
            } else {
                sum.try_add(term)?
            };
            i += 1;
        }

        Ok(sum)
    }

    /// Human-readable rendering with the given decimals and display precision
    pub fn display_amount(self, decimals: u32, precision: u32) -> String {
        format_balance(self.0, decimals, precision)
    }
}

impl From<U256> for FixedPoint18 {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl From<FixedPoint18> for U256 {
    fn from(value: FixedPoint18) -> Self {
        value.0
    }
}

/// Display implementation for convenient logging
impl fmt::Display for FixedPoint18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_balance(self.0, 18, 18))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> FixedPoint18 {
        FixedPoint18::from_decimal_str(s).unwrap()
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(fp("1"), FixedPoint18::ONE);
        assert_eq!(fp("0.5").raw_value(), BONE / 2);
        assert_eq!(fp("0.003").raw_value(), U256::from(3_000_000_000_000_000u64));
        assert_eq!(
            fp("10000").raw_value(),
            U256::from(10_000u64) * BONE
        );
        assert!(FixedPoint18::from_decimal_str("not_a_number").is_err());
        assert!(FixedPoint18::from_decimal_str("-1").is_err());
    }

    #[test]
    fn test_mul_rounds_half_up() {
        // 1 wei * 0.5 = 0.5 wei -> rounds up to 1
        let half = fp("0.5");
        assert_eq!(
            FixedPoint18::from_raw(U256::one()).mul_fixed(half).unwrap(),
            FixedPoint18::from_raw(U256::one())
        );
        // 1 wei * 0.4999... rounds down to 0
        let below_half = FixedPoint18::from_raw(BONE / 2 - 1);
        assert!(FixedPoint18::from_raw(U256::one())
            .mul_fixed(below_half)
            .unwrap()
            .is_zero());

        assert_eq!(fp("1.5").mul_fixed(fp("2")).unwrap(), fp("3"));
    }

    #[test]
    fn test_mul_is_commutative() {
        let a = fp("123.456789");
        let b = fp("0.000123");
        assert_eq!(a.mul_fixed(b).unwrap(), b.mul_fixed(a).unwrap());
    }

    #[test]
    fn test_div_rounds_half_up() {
        // 2/3 = 0.666...6667
        let result = fp("2").div_fixed(fp("3")).unwrap();
        assert_eq!(
            result.raw_value(),
            U256::from(666_666_666_666_666_667u64)
        );
        // 1/3 = 0.333...333
        let result = fp("1").div_fixed(fp("3")).unwrap();
        assert_eq!(
            result.raw_value(),
            U256::from(333_333_333_333_333_333u64)
        );
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(
            fp("1").div_fixed(FixedPoint18::ZERO),
            Err(FixedPointError::DivisionByZero)
        );
    }

    #[test]
    fn test_mul_overflow_is_reported() {
        let huge = FixedPoint18::from_raw(U256::MAX);
        assert!(matches!(
            huge.mul_fixed(fp("2")),
            Err(FixedPointError::Overflow { .. })
        ));
    }

    #[test]
    fn test_integer_powers() {
        assert_eq!(fp("2").pow_fixed(fp("3")).unwrap(), fp("8"));
        assert_eq!(fp("1.5").pow_fixed(fp("2")).unwrap(), fp("2.25"));
        assert_eq!(fp("7").pow_fixed(FixedPoint18::ZERO).unwrap(), FixedPoint18::ONE);
        // integer exponents accept bases outside the series domain
        assert_eq!(fp("3").pow_fixed(FixedPoint18::ONE).unwrap(), fp("3"));
    }

    #[test]
    fn test_fractional_power_converges() {
        // 0.25^0.5 = 0.5
        let result = fp("0.25").pow_fixed(fp("0.5")).unwrap();
        let diff = result.sub_sign(fp("0.5")).0;
        assert!(diff.raw_value() < U256::from(1_000_000_000u64), "{}", result);

        // 1.21^0.5 = 1.1
        let result = fp("1.21").pow_fixed(fp("0.5")).unwrap();
        let diff = result.sub_sign(fp("1.1")).0;
        assert!(diff.raw_value() < U256::from(1_000_000_000u64), "{}", result);

        // 0.81^1.5 = 0.729
        let result = fp("0.81").pow_fixed(fp("1.5")).unwrap();
        let diff = result.sub_sign(fp("0.729")).0;
        assert!(diff.raw_value() < U256::from(1_000_000_000u64), "{}", result);
    }

    #[test]
    fn test_fractional_power_base_domain() {
        assert!(matches!(
            fp("2").pow_fixed(fp("0.5")),
            Err(FixedPointError::PowerBaseOutOfRange { .. })
        ));
        assert!(matches!(
            FixedPoint18::ZERO.pow_fixed(fp("0.5")),
            Err(FixedPointError::PowerBaseOutOfRange { .. })
        ));
    }

    #[test]
    fn test_sub_sign_and_floor() {
        assert_eq!(fp("1").sub_sign(fp("3")), (fp("2"), true));
        assert_eq!(fp("3").sub_sign(fp("1")), (fp("2"), false));
        assert_eq!(fp("2.75").floor(), fp("2"));
        assert_eq!(fp("2.75").to_integer(), U256::from(2u8));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(format!("{}", fp("1.5")), "1.50");
        assert_eq!(format!("{}", fp("0.000000000000000001")), "0.000000000000000001");
    }
}
