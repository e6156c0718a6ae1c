//! Optimizer error types

use ethers_core::types::Address;
use state_cache::StateError;
use thiserror::Error;
use weighted_amm::PoolMathError;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Pool math error: {0}")]
    PoolMath(#[from] PoolMathError),

    #[error("Pool state unavailable: {0}")]
    PoolState(#[from] StateError),

    #[error("No route from {token_in:?} to {token_out:?} for any remaining candidate")]
    NoRouteAvailable { token_in: Address, token_out: Address },

    #[error("No feasible strategy: {reason}")]
    NoFeasibleCandidate { reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Quote source failed: {reason}")]
    QuoteSource { reason: String },

    #[error("Gas price oracle failed: {reason}")]
    GasOracle { reason: String },
}

impl OptimizerError {
    pub fn quote_source(error: anyhow::Error) -> Self {
        Self::QuoteSource {
            reason: format!("{error:#}"),
        }
    }

    pub fn gas_oracle(error: anyhow::Error) -> Self {
        Self::GasOracle {
            reason: format!("{error:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
