//! Pool-address entry point: cached snapshot in, trade plan out

use crate::errors::Result;
use crate::gas::{CachedGasPriceOracle, GasPriceOracle};
use crate::log_metrics;
use crate::optimizer::StrategyOptimizer;
use crate::plan::TradePlan;
use crate::quote::{CachedQuoteSource, QuoteSource};
use ethers_core::types::{Address, U256};
use pool_config::PoolkitConfig;
use state_cache::{CachedPoolStateProvider, PoolCacheStats, PoolStateProvider};
use std::sync::Arc;
use tracing::info;

/// Resolves pool snapshots through a TTL cache and runs the optimizer on them
pub struct MintPlanner<P> {
    pools: CachedPoolStateProvider<P>,
    optimizer: StrategyOptimizer,
}

impl<P> MintPlanner<P>
where
    P: PoolStateProvider + 'static,
{
    pub fn new(pools: CachedPoolStateProvider<P>, optimizer: StrategyOptimizer) -> Self {
        Self { pools, optimizer }
    }

    /// Wire collaborators with the configured TTLs and optimizer settings
    ///
    /// Quotes are cached for `cache.quote_ttl_secs`; the gas oracle, when
    /// given, is wrapped in a last-known-price cache.
    pub fn from_config(
        provider: P,
        quotes: Arc<dyn QuoteSource>,
        gas_oracle: Option<Arc<dyn GasPriceOracle>>,
        config: &PoolkitConfig,
    ) -> Self {
        let quotes: Arc<dyn QuoteSource> = Arc::new(CachedQuoteSource::new(quotes, &config.cache));
        let mut optimizer = StrategyOptimizer::new(quotes, config.optimizer.clone());
        if let Some(oracle) = gas_oracle {
            optimizer = optimizer.with_gas_oracle(Arc::new(CachedGasPriceOracle::new(oracle)));
        }
        info!(
            "Mint planner ready: slippage {} bps, gas adjustment {}",
            config.optimizer.slippage_bps, config.optimizer.gas.adjust_for_gas
        );
        Self::new(CachedPoolStateProvider::new(provider, &config.cache), optimizer)
    }

    pub fn optimizer(&self) -> &StrategyOptimizer {
        &self.optimizer
    }

    pub async fn plan_exact_pool_out(
        &self,
        pool: Address,
        token_in: Address,
        pool_amount_out: U256,
    ) -> Result<TradePlan> {
        let state = self.pools.pool_state(pool).await?;
        self.optimizer
            .best_exact_pool_out(&state, token_in, pool_amount_out)
            .await
    }

    pub async fn plan_exact_input(
        &self,
        pool: Address,
        token_in: Address,
        amount_in: U256,
    ) -> Result<TradePlan> {
        let state = self.pools.pool_state(pool).await?;
        self.optimizer
            .best_exact_input(&state, token_in, amount_in)
            .await
    }

    pub async fn plan_exact_pool_in(
        &self,
        pool: Address,
        token_out: Address,
        pool_amount_in: U256,
    ) -> Result<TradePlan> {
        let state = self.pools.pool_state(pool).await?;
        self.optimizer
            .best_exact_pool_in(&state, token_out, pool_amount_in)
            .await
    }

    /// Force the next plan for `pool` to read a fresh snapshot
    pub fn invalidate(&self, pool: Address) {
        self.pools.invalidate(pool);
    }

    pub fn cache_stats(&self) -> PoolCacheStats {
        let stats = self.pools.stats();
        log_metrics!(
            "Pool cache: {} pools, {} hits, {} misses",
            stats.cached_pools,
            stats.cache_hits,
            stats.cache_misses
        );
        stats
    }
}
