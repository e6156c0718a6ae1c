//! # Swap Venue Quotes
//!
//! ## Purpose
//!
//! The optimizer never prices a conversion itself. Every token-to-token amount
//! comes from a [`QuoteSource`] supplied by the caller (an aggregator client,
//! a router contract reader, a fixture in tests).
//!
//! ## Integration Points
//!
//! - **Input Sources**: any `QuoteSource` implementation
//! - **Output Destinations**: `StrategyOptimizer` candidate pricing
//! - **Caching**: [`CachedQuoteSource`] keeps quotes for `quote_ttl_secs`
//!
//! A missing route is `Ok(None)`, not an error: the optimizer drops the
//! affected candidate and keeps going. `Err` means the source itself failed and
//! aborts the optimization.

use async_trait::async_trait;
use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use pool_config::CacheSettings;
use serde::{Deserialize, Serialize};
use state_cache::{SnapshotCache, StateError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::slippage::{maximum_amount_in, minimum_amount_out};

/// Result of a conversion quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuote {
    pub input_amount: U256,
    pub output_amount: U256,
    /// Tokens visited, first to last
    pub path: Vec<Address>,
}

impl TradeQuote {
    pub fn minimum_amount_out(&self, slippage_bps: u32) -> U256 {
        minimum_amount_out(self.output_amount, slippage_bps)
    }

    pub fn maximum_amount_in(&self, slippage_bps: u32) -> U256 {
        maximum_amount_in(self.input_amount, slippage_bps)
    }
}

/// Best-available conversion quotes between two tokens
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Output for selling exactly `amount_in` of `token_in`
    async fn quote_exact_in(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> anyhow::Result<Option<TradeQuote>>;

    /// Input needed to buy exactly `amount_out` of `token_out`
    async fn quote_exact_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> anyhow::Result<Option<TradeQuote>>;
}

#[async_trait]
impl<Q: QuoteSource + ?Sized> QuoteSource for Arc<Q> {
    async fn quote_exact_in(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> anyhow::Result<Option<TradeQuote>> {
        (**self).quote_exact_in(token_in, amount_in, token_out).await
    }

    async fn quote_exact_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> anyhow::Result<Option<TradeQuote>> {
        (**self).quote_exact_out(token_in, token_out, amount_out).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum QuoteKind {
    ExactIn,
    ExactOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct QuoteKey {
    kind: QuoteKind,
    token_in: Address,
    token_out: Address,
    amount: U256,
}

/// Entries kept before stale quotes are swept
const SWEEP_THRESHOLD: usize = 1_024;

/// TTL cache in front of another quote source
///
/// Identical requests inside the TTL are answered from memory, and concurrent
/// identical requests share one upstream call. "No route" answers are cached
/// too; failures are not.
pub struct CachedQuoteSource<Q> {
    inner: Arc<Q>,
    ttl: Duration,
    quotes: DashMap<QuoteKey, Arc<SnapshotCache<Option<TradeQuote>>>>,
}

impl<Q> CachedQuoteSource<Q>
where
    Q: QuoteSource + 'static,
{
    pub fn new(inner: Q, settings: &CacheSettings) -> Self {
        Self::with_ttl(inner, settings.quote_ttl())
    }

    pub fn with_ttl(inner: Q, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            ttl,
            quotes: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Drop entries whose quote has expired
    ///
    /// Entries with a fetch in flight are kept so later callers still join it.
    pub fn sweep_stale(&self) {
        self.quotes
            .retain(|_, cache| cache.is_refreshing() || !cache.is_stale());
    }

    async fn cached(&self, key: QuoteKey) -> anyhow::Result<Option<TradeQuote>> {
        if self.quotes.len() >= SWEEP_THRESHOLD {
            self.sweep_stale();
        }
        let cache = self
            .quotes
            .entry(key)
            .or_insert_with(|| Arc::new(SnapshotCache::new(self.ttl)))
            .clone();

        let inner = Arc::clone(&self.inner);
        let quote = cache
            .refresh_if_stale(move || async move {
                debug!("Fetching {:?} quote {:?} -> {:?}", key.kind, key.token_in, key.token_out);
                let quote = match key.kind {
                    QuoteKind::ExactIn => {
                        inner
                            .quote_exact_in(key.token_in, key.amount, key.token_out)
                            .await
                    }
                    QuoteKind::ExactOut => {
                        inner
                            .quote_exact_out(key.token_in, key.token_out, key.amount)
                            .await
                    }
                };
                quote.map_err(StateError::refresh_failed)
            })
            .await?;
        Ok(quote)
    }
}

#[async_trait]
impl<Q> QuoteSource for CachedQuoteSource<Q>
where
    Q: QuoteSource + 'static,
{
    async fn quote_exact_in(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> anyhow::Result<Option<TradeQuote>> {
        self.cached(QuoteKey {
            kind: QuoteKind::ExactIn,
            token_in,
            token_out,
            amount: amount_in,
        })
        .await
    }

    async fn quote_exact_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> anyhow::Result<Option<TradeQuote>> {
        self.cached(QuoteKey {
            kind: QuoteKind::ExactOut,
            token_in,
            token_out,
            amount: amount_out,
        })
        .await
    }
}
