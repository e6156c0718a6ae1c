//! # Pool Types Library
//!
//! Fixed-point numeric types shared by the pool math and strategy crates.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: balances, weights and fees are 256-bit integers scaled by 10^18
//! - **Contract Parity**: rounding matches the on-chain pool math bit for bit
//! - **Type Safety**: [`FixedPoint18`] keeps scaled values apart from raw integers
//! - **Clear Boundaries**: decimal strings only appear when parsing config or rendering output
//!
//! ## Quick Start
//!
//! ```rust
//! use types::FixedPoint18;
//!
//! let balance = FixedPoint18::from_decimal_str("10000").unwrap();
//! let fee = FixedPoint18::from_decimal_str("0.003").unwrap();
//! let after_fee = balance.mul_fixed(FixedPoint18::ONE.try_sub(fee).unwrap()).unwrap();
//! assert_eq!(after_fee, FixedPoint18::from_decimal_str("9970").unwrap());
//! ```
//!
//! ## Integration Points
//!
//! - **Pool Math**: every weighted-pool formula is written against [`FixedPoint18`]
//! - **Strategy Services**: trade plans carry raw `U256` amounts and render them with [`format_balance`]

#[cfg(feature = "common")]
pub mod common;

#[cfg(feature = "common")]
pub use common::{
    errors::FixedPointError,
    fixed_point::{FixedPoint18, BONE, BPOW_PRECISION, MAX_BPOW_BASE, MIN_BPOW_BASE},
    format::{format_balance, pad_to_decimal_places},
};

pub use ethers_core::types::{Address, U256};
