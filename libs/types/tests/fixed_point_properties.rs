//! Fixed-Point Arithmetic Property Tests
//!
//! Algebraic properties that must hold for any 18-decimal operands.

use proptest::prelude::*;
use types::{FixedPoint18, BONE, U256};

fn fp(raw: u128) -> FixedPoint18 {
    FixedPoint18::from_raw(U256::from(raw))
}

fn abs_diff(a: FixedPoint18, b: FixedPoint18) -> U256 {
    a.sub_sign(b).0.raw_value()
}

proptest! {
    #[test]
    fn multiply_by_one_is_identity(raw in 0u128..u128::MAX / 2) {
        let value = fp(raw);
        prop_assert_eq!(value.mul_fixed(FixedPoint18::ONE).unwrap(), value);
    }

    #[test]
    fn divide_by_one_is_identity(raw in 0u128..u128::MAX / 2) {
        let value = fp(raw);
        prop_assert_eq!(value.div_fixed(FixedPoint18::ONE).unwrap(), value);
    }

    #[test]
    fn multiplication_commutes(a in 0u128..10u128.pow(30), b in 0u128..10u128.pow(30)) {
        prop_assert_eq!(fp(a).mul_fixed(fp(b)).unwrap(), fp(b).mul_fixed(fp(a)).unwrap());
    }

    #[test]
    fn divide_then_multiply_is_close(
        a in 1u128..10u128.pow(30),
        b in 10u128.pow(15)..10u128.pow(24),
    ) {
        let quotient = fp(a).div_fixed(fp(b)).unwrap();
        let restored = quotient.mul_fixed(fp(b)).unwrap();
        // each rounding step moves the result by at most half a unit of the last place
        let tolerance = U256::from(b) / BONE + U256::one();
        prop_assert!(abs_diff(restored, fp(a)) <= tolerance);
    }

    #[test]
    fn integer_power_matches_repeated_multiplication(
        base in 5u128 * 10u128.pow(17)..2 * 10u128.pow(18),
        n in 0u64..6,
    ) {
        let base = fp(base);
        let mut expected = FixedPoint18::ONE;
        for _ in 0..n {
            expected = expected.mul_fixed(base).unwrap();
        }
        let actual = base.pow_fixed(FixedPoint18::from_integer(n)).unwrap();
        // squaring rounds differently from sequential products
        prop_assert!(abs_diff(actual, expected) <= U256::from(100u64));
    }

    #[test]
    fn fractional_power_stays_between_neighbours(
        base in 5 * 10u128.pow(17)..10u128.pow(18),
        exp in 10u128.pow(16)..10u128.pow(18),
    ) {
        // for a base below one, base^x sits between base^1 and base^0
        let result = fp(base).pow_fixed(fp(exp)).unwrap();
        prop_assert!(result <= FixedPoint18::ONE);
        prop_assert!(result.raw_value() + U256::from(10u64.pow(10)) >= U256::from(base));
    }
}
