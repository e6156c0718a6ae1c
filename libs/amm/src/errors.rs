//! Pool math error taxonomy

use ethers_core::types::{Address, U256};
use thiserror::Error;
use types::FixedPointError;

/// Errors raised by weighted pool formulas and previews
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolMathError {
    #[error(transparent)]
    FixedPoint(#[from] FixedPointError),

    /// Amount outside the range the invariant can price accurately
    #[error("Invalid trade size in {operation}: amount {amount} exceeds limit {limit}")]
    InvalidTradeSize {
        operation: &'static str,
        amount: U256,
        limit: U256,
    },

    /// Single-asset exit or swap-out against an asset still ramping in
    #[error("Token {token:?} is not ready; the pool does not allow exiting into it")]
    ReadinessViolation { token: Address },

    #[error("Token {token:?} is not bound to the pool")]
    UnknownToken { token: Address },

    #[error("Invalid pool state: {reason}")]
    InvalidPoolState { reason: String },
}

impl PoolMathError {
    /// True when the failure means "this trade is too large", as opposed to
    /// bad input data
    ///
    /// Arithmetic underflow is not a size signal: the formulas report the
    /// subtractions a large trade can drive negative as `InvalidTradeSize`.
    pub fn is_trade_size(&self) -> bool {
        matches!(
            self,
            Self::InvalidTradeSize { .. }
                | Self::FixedPoint(FixedPointError::PowerBaseOutOfRange { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, PoolMathError>;
