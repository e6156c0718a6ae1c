//! Trade-size limits enforced by the pool contract
//!
//! Inputs may not exceed just under half of the pool balance and outputs just
//! under a third. The margins below the mathematical limits leave room for the
//! rounding of the power series near the invariant's singularities.

use crate::errors::{PoolMathError, Result};
use ethers_core::types::U256;
use types::FixedPoint18;

/// Smallest weight an asset is priced with (`BONE / 4`)
pub const MIN_WEIGHT: FixedPoint18 =
    FixedPoint18::from_raw(U256([250_000_000_000_000_000, 0, 0, 0]));

/// Maximum input as a fraction of the input balance (`0.499999999999999`)
pub const MAX_IN_RATIO: FixedPoint18 =
    FixedPoint18::from_raw(U256([499_999_999_999_999_000, 0, 0, 0]));

/// Maximum output as a fraction of the output balance (`0.333333333333333`)
pub const MAX_OUT_RATIO: FixedPoint18 =
    FixedPoint18::from_raw(U256([333_333_333_333_333_000, 0, 0, 0]));

/// Reject an input amount above `balance · MAX_IN_RATIO`
pub fn ensure_within_max_in(
    operation: &'static str,
    amount: FixedPoint18,
    balance: FixedPoint18,
) -> Result<()> {
    ensure_within(operation, amount, balance.mul_fixed(MAX_IN_RATIO)?)
}

/// Reject an output amount above `balance · MAX_OUT_RATIO`
pub fn ensure_within_max_out(
    operation: &'static str,
    amount: FixedPoint18,
    balance: FixedPoint18,
) -> Result<()> {
    ensure_within(operation, amount, balance.mul_fixed(MAX_OUT_RATIO)?)
}

fn ensure_within(operation: &'static str, amount: FixedPoint18, limit: FixedPoint18) -> Result<()> {
    if amount > limit {
        return Err(PoolMathError::InvalidTradeSize {
            operation,
            amount: amount.raw_value(),
            limit: limit.raw_value(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> FixedPoint18 {
        FixedPoint18::from_decimal_str(s).unwrap()
    }

    #[test]
    fn test_max_in_boundary() {
        let balance = fp("1000");
        assert!(ensure_within_max_in("test", fp("499.999999999999"), balance).is_ok());
        let err = ensure_within_max_in("test", fp("500"), balance).unwrap_err();
        assert!(matches!(err, PoolMathError::InvalidTradeSize { operation: "test", .. }));
    }

    #[test]
    fn test_max_out_boundary() {
        let balance = fp("300");
        assert!(ensure_within_max_out("test", fp("99.9999999999999"), balance).is_ok());
        assert!(ensure_within_max_out("test", fp("100"), balance).is_err());
    }
}
