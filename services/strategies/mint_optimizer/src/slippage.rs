//! Slippage bounds in basis points
//!
//! Both bounds are floored, matching the swap venue SDK: the worst accepted
//! output is `amount / (1 + tolerance)` and the most that may be spent is
//! `amount · (1 + tolerance)`.

use ethers_core::types::{U256, U512};
use pool_config::settings::BPS_DENOMINATOR;

/// `a · b / d` on a 512-bit intermediate, saturating at `U256::MAX`
pub(crate) fn mul_div(a: U256, b: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::MAX;
    }
    let wide = a.full_mul(b) / U512::from(d);
    U256::try_from(wide).unwrap_or(U256::MAX)
}

/// `amount · 10000 / (10000 + bps)`
pub fn minimum_amount_out(amount: U256, slippage_bps: u32) -> U256 {
    mul_div(
        amount,
        U256::from(BPS_DENOMINATOR),
        U256::from(BPS_DENOMINATOR + slippage_bps),
    )
}

/// `amount · (10000 + bps) / 10000`
pub fn maximum_amount_in(amount: U256, slippage_bps: u32) -> U256 {
    mul_div(
        amount,
        U256::from(BPS_DENOMINATOR + slippage_bps),
        U256::from(BPS_DENOMINATOR),
    )
}

/// `amount · bps / 10000`, the band within which two costs count as equal
pub fn tolerance_band(amount: U256, slippage_bps: u32) -> U256 {
    mul_div(
        amount,
        U256::from(slippage_bps),
        U256::from(BPS_DENOMINATOR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_percent_bounds() {
        let amount = U256::from(10_200u64);
        assert_eq!(minimum_amount_out(amount, 200), U256::from(10_000u64));
        assert_eq!(maximum_amount_in(U256::from(10_000u64), 200), amount);
    }

    #[test]
    fn test_bounds_floor() {
        // 100 / 1.02 = 98.039..
        assert_eq!(minimum_amount_out(U256::from(100u64), 200), U256::from(98u64));
        // 99 · 1.0001 = 99.0099
        assert_eq!(maximum_amount_in(U256::from(99u64), 1), U256::from(99u64));
    }

    #[test]
    fn test_zero_slippage_is_identity() {
        let amount = U256::exp10(24);
        assert_eq!(minimum_amount_out(amount, 0), amount);
        assert_eq!(maximum_amount_in(amount, 0), amount);
        assert!(tolerance_band(amount, 0).is_zero());
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        assert_eq!(maximum_amount_in(U256::MAX, 200), U256::MAX);
        assert_eq!(mul_div(U256::one(), U256::one(), U256::zero()), U256::MAX);
    }
}
