//! Deterministic collaborators for tests and local runs
//!
//! [`FixedRateQuoteSource`] prices every token against one numeraire, so a
//! quote is `amount · price_in / price_out` less a flat venue fee.

use crate::gas::GasPriceOracle;
use crate::quote::{QuoteSource, TradeQuote};
use crate::slippage::mul_div;
use async_trait::async_trait;
use ethers_core::types::{Address, U256};
use parking_lot::RwLock;
use pool_config::settings::BPS_DENOMINATOR;
use state_cache::PoolStateProvider;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use weighted_amm::PoolState;

pub use crate::logging::init_tracing;

/// Quote source with fixed prices and a flat fee
#[derive(Debug, Default)]
pub struct FixedRateQuoteSource {
    /// Numeraire value of one whole token, 18 decimals
    prices: HashMap<Address, U256>,
    fee_bps: u32,
    unroutable: HashSet<Address>,
    failing: HashSet<Address>,
    calls: AtomicUsize,
}

impl FixedRateQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, token: Address, price: U256) -> Self {
        self.prices.insert(token, price);
        self
    }

    pub fn with_fee_bps(mut self, fee_bps: u32) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    /// Quotes touching `token` find no route
    pub fn unroutable(mut self, token: Address) -> Self {
        self.unroutable.insert(token);
        self
    }

    /// Quotes touching `token` fail outright
    pub fn failing(mut self, token: Address) -> Self {
        self.failing.insert(token);
        self
    }

    /// Quote requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prices(&self, token_in: Address, token_out: Address) -> anyhow::Result<Option<(U256, U256)>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&token_in) || self.failing.contains(&token_out) {
            anyhow::bail!("venue unavailable for {:?} -> {:?}", token_in, token_out);
        }
        if self.unroutable.contains(&token_in) || self.unroutable.contains(&token_out) {
            return Ok(None);
        }
        match (self.prices.get(&token_in), self.prices.get(&token_out)) {
            (Some(price_in), Some(price_out)) => Ok(Some((*price_in, *price_out))),
            _ => Ok(None),
        }
    }

    fn after_fee(&self) -> U256 {
        U256::from(BPS_DENOMINATOR.saturating_sub(self.fee_bps))
    }
}

#[async_trait]
impl QuoteSource for FixedRateQuoteSource {
    async fn quote_exact_in(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> anyhow::Result<Option<TradeQuote>> {
        let Some((price_in, price_out)) = self.prices(token_in, token_out)? else {
            return Ok(None);
        };
        let gross = mul_div(amount_in, price_in, price_out);
        Ok(Some(TradeQuote {
            input_amount: amount_in,
            output_amount: mul_div(gross, self.after_fee(), U256::from(BPS_DENOMINATOR)),
            path: vec![token_in, token_out],
        }))
    }

    async fn quote_exact_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> anyhow::Result<Option<TradeQuote>> {
        let Some((price_in, price_out)) = self.prices(token_in, token_out)? else {
            return Ok(None);
        };
        let net = mul_div(amount_out, price_out, price_in);
        Ok(Some(TradeQuote {
            input_amount: mul_div(net, U256::from(BPS_DENOMINATOR), self.after_fee()),
            output_amount: amount_out,
            path: vec![token_in, token_out],
        }))
    }
}

/// Gas oracle returning a settable price
#[derive(Debug)]
pub struct StaticGasOracle {
    price_wei: RwLock<U256>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StaticGasOracle {
    pub fn new(price_wei: U256) -> Self {
        Self {
            price_wei: RwLock::new(price_wei),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, price_wei: U256) {
        *self.price_wei.write() = price_wei;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GasPriceOracle for StaticGasOracle {
    async fn current_price(&self) -> anyhow::Result<U256> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("gas price endpoint unavailable");
        }
        Ok(*self.price_wei.read())
    }
}

/// Pool snapshots served from memory
#[derive(Debug, Default)]
pub struct StaticPoolStateProvider {
    pools: RwLock<HashMap<Address, PoolState>>,
    fetches: AtomicUsize,
}

impl StaticPoolStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(self, pool: PoolState) -> Self {
        self.set_pool(pool);
        self
    }

    /// Replace a snapshot, e.g. to simulate a trade landing on chain
    pub fn set_pool(&self, pool: PoolState) {
        self.pools.write().insert(pool.address, pool);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolStateProvider for StaticPoolStateProvider {
    async fn fetch_pool_state(&self, pool: Address) -> anyhow::Result<PoolState> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pools
            .read()
            .get(&pool)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown pool {:?}", pool))
    }
}
