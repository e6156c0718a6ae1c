//! State Provider Traits
//!
//! Collaborator interfaces for fetching pool snapshots, and the errors a cached
//! refresh hands back to every caller waiting on it.

use async_trait::async_trait;
use ethers_core::types::Address;
use std::sync::Arc;
use thiserror::Error;
use weighted_amm::PoolState;

/// Error types for state refresh operations
///
/// Cloneable so one failed in-flight refresh can be reported to every waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("Fetched snapshot rejected: {reason}")]
    InvalidSnapshot { reason: String },
}

impl StateError {
    pub fn refresh_failed(error: anyhow::Error) -> Self {
        Self::RefreshFailed {
            reason: format!("{error:#}"),
        }
    }
}

/// Source of pool snapshots (batched contract reads, subgraph, fixtures)
#[async_trait]
pub trait PoolStateProvider: Send + Sync {
    /// Fetch a fully populated snapshot of `pool`
    async fn fetch_pool_state(&self, pool: Address) -> anyhow::Result<PoolState>;
}

#[async_trait]
impl<P: PoolStateProvider + ?Sized> PoolStateProvider for Arc<P> {
    async fn fetch_pool_state(&self, pool: Address) -> anyhow::Result<PoolState> {
        (**self).fetch_pool_state(pool).await
    }
}
