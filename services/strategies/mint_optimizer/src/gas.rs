//! # Gas Cost Estimation
//!
//! ## Purpose
//!
//! A proportional strategy submits one on-chain operation per pool asset where
//! a single-asset strategy submits one. When gas adjustment is enabled the
//! optimizer charges the multi-asset candidate for the extra operations at the
//! current gas price before comparing.
//!
//! ## Integration Points
//!
//! - **Input Sources**: any [`GasPriceOracle`] (node RPC, fee stream, fixture)
//! - **Output Destinations**: `StrategyOptimizer` gas-adjusted comparison
//! - **Fallback**: [`CachedGasPriceOracle`] serves the last known price when a
//!   refresh fails; with no known price the failure is returned
//!
//! ## Performance Profile
//!
//! - **Cache Duration**: [`DEFAULT_GAS_CACHE_SECS`], gas prices move slowly
//!   relative to a quote round
//! - **Lock**: one `parking_lot::RwLock` read on a cache hit

use async_trait::async_trait;
use ethers_core::types::U256;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default lifetime of a cached gas price
pub const DEFAULT_GAS_CACHE_SECS: u64 = 30;

/// Current network gas price
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    /// Gas price in wei per gas unit
    async fn current_price(&self) -> anyhow::Result<U256>;
}

#[async_trait]
impl<O: GasPriceOracle + ?Sized> GasPriceOracle for Arc<O> {
    async fn current_price(&self) -> anyhow::Result<U256> {
        (**self).current_price().await
    }
}

/// Wei spent on `extra_operations` operations of `gas_per_operation` gas each
pub fn execution_cost_wei(extra_operations: usize, gas_per_operation: u64, gas_price: U256) -> U256 {
    U256::from(extra_operations as u64)
        .saturating_mul(U256::from(gas_per_operation))
        .saturating_mul(gas_price)
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price_wei: U256,
    fetched_at: Instant,
}

/// Gas price cache with last-known-price fallback
pub struct CachedGasPriceOracle<O> {
    inner: O,
    ttl: Duration,
    cache: RwLock<Option<CachedPrice>>,
}

impl<O: GasPriceOracle> CachedGasPriceOracle<O> {
    pub fn new(inner: O) -> Self {
        Self::with_ttl(inner, Duration::from_secs(DEFAULT_GAS_CACHE_SECS))
    }

    pub fn with_ttl(inner: O, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Last price fetched, regardless of age
    pub fn last_known(&self) -> Option<U256> {
        let cached = *self.cache.read();
        cached.map(|cached| cached.price_wei)
    }
}

#[async_trait]
impl<O: GasPriceOracle> GasPriceOracle for CachedGasPriceOracle<O> {
    async fn current_price(&self) -> anyhow::Result<U256> {
        let cached = *self.cache.read();
        if let Some(cached) = cached {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.price_wei);
            }
        }

        match self.inner.current_price().await {
            Ok(price_wei) => {
                debug!("Gas price refreshed: {} wei", price_wei);
                *self.cache.write() = Some(CachedPrice {
                    price_wei,
                    fetched_at: Instant::now(),
                });
                Ok(price_wei)
            }
            Err(e) => match self.last_known() {
                Some(price_wei) => {
                    warn!("Gas price refresh failed, using last known {} wei: {:#}", price_wei, e);
                    Ok(price_wei)
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticGasOracle;

    #[test]
    fn test_execution_cost() {
        // two extra operations at 100k gas and 30 gwei
        let cost = execution_cost_wei(2, 100_000, U256::from(30_000_000_000u64));
        assert_eq!(cost, U256::from(6_000_000_000_000_000u64));
        assert!(execution_cost_wei(0, 100_000, U256::MAX).is_zero());
        assert_eq!(execution_cost_wei(2, 2, U256::MAX), U256::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_serves_price_within_ttl() {
        let oracle = Arc::new(StaticGasOracle::new(U256::from(30u64)));
        let cached = CachedGasPriceOracle::with_ttl(Arc::clone(&oracle), Duration::from_secs(30));

        assert_eq!(cached.current_price().await.unwrap(), U256::from(30u64));
        oracle.set_price(U256::from(45u64));
        assert_eq!(cached.current_price().await.unwrap(), U256::from(30u64));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cached.current_price().await.unwrap(), U256::from(45u64));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_last_known_price() {
        let oracle = Arc::new(StaticGasOracle::new(U256::from(30u64)));
        let cached = CachedGasPriceOracle::with_ttl(Arc::clone(&oracle), Duration::from_secs(30));

        cached.current_price().await.unwrap();
        oracle.set_failing(true);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cached.current_price().await.unwrap(), U256::from(30u64));
    }

    #[tokio::test]
    async fn test_failure_without_history_is_returned() {
        let oracle = StaticGasOracle::new(U256::from(30u64));
        oracle.set_failing(true);
        let cached = CachedGasPriceOracle::new(oracle);
        assert!(cached.current_price().await.is_err());
    }
}
