//! # Strategy Optimizer
//!
//! ## Purpose
//!
//! Picks the cheapest way to mint or burn pool shares through a single source
//! or destination token. Each operation prices two candidate shapes:
//!
//! - **Single asset**: swap into (or out of) one pool asset and join (or exit)
//!   single-sided
//! - **Proportional**: swap into (or out of) every pool asset and join (or
//!   exit) with the whole basket
//!
//! ## Selection Rules
//!
//! - Single-asset candidates whose pool-side trade reaches half of the asset's
//!   usable balance are excluded before comparison, as are candidates the
//!   pool's trade-size limits reject
//! - Candidates within the slippage tolerance of each other resolve to the
//!   single-asset plan, which submits fewer operations
//! - With gas adjustment on, the proportional candidate is charged for its
//!   extra operations at the current gas price, converted into the trade token
//! - A missing quote route drops the affected candidate; the optimization
//!   fails only when no candidate survives
//!
//! ## Architecture Role
//!
//! ```text
//! PoolState ──┐
//!             ├─→ [Candidate fan-out] ─→ [Pool math] ─→ [Compare] ─→ TradePlan
//! QuoteSource ┘          ↑                                  ↑
//!                  join_all per asset              GasPriceOracle (optional)
//! ```
//!
//! Every operation is a pure function of the supplied snapshot and the quotes
//! it requests; nothing persists between calls.

use crate::errors::{OptimizerError, Result};
use crate::gas::{execution_cost_wei, GasPriceOracle};
use crate::plan::{PlanDirection, PlanLeg, StrategyCandidate, TradePlan};
use crate::quote::QuoteSource;
use crate::slippage::{maximum_amount_in, minimum_amount_out, mul_div, tolerance_band};
use crate::{log_gas, log_profit, log_search};
use ethers_core::types::{Address, U256};
use futures::future::join_all;
use pool_config::settings::BPS_DENOMINATOR;
use pool_config::OptimizerSettings;
use std::sync::Arc;
use tracing::{debug, info, warn};
use weighted_amm::{FixedPoint18, PoolAssetState, PoolState, WeightedMath};

/// Re-pricing rounds when fitting a proportional basket to an input budget
const MAX_SIZING_ROUNDS: usize = 4;

/// Haircut on the share amount when a re-sized basket still overshoots
const SIZING_MARGIN_BPS: u32 = 1;

/// Trial share amount for sizing a basket when no single-asset candidate
/// exists, as a fraction of supply
const TRIAL_SUPPLY_DIVISOR: u64 = 1_000;

/// Outcome of pricing one candidate
enum Branch {
    Feasible(StrategyCandidate),
    /// Rejected by a trade-size limit or the half-balance filter
    Excluded,
    NoRoute,
}

#[derive(Default)]
struct Outcomes {
    feasible: Vec<StrategyCandidate>,
    no_route: bool,
}

impl Outcomes {
    fn collect(branches: Vec<Result<Branch>>) -> Result<Self> {
        let mut outcomes = Self::default();
        for branch in branches {
            outcomes.absorb(branch?);
        }
        Ok(outcomes)
    }

    fn absorb(&mut self, branch: Branch) -> Option<StrategyCandidate> {
        match branch {
            Branch::Feasible(candidate) => Some(candidate),
            Branch::NoRoute => {
                self.no_route = true;
                None
            }
            Branch::Excluded => None,
        }
    }
}

/// Pool math result, with trade-size rejections turned into `None`
fn within_limits<T>(result: weighted_amm::errors::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_trade_size() => {
            debug!("Candidate excluded by trade size: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// The cheapest-single-input filter
fn under_half_balance(amount: U256, asset: &PoolAssetState) -> bool {
    amount < asset.used_balance.raw_value() / 2
}

fn require_positive(name: &str, amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Err(OptimizerError::InvalidRequest {
            reason: format!("{name} must be positive"),
        });
    }
    Ok(())
}

fn sum_token_amounts(legs: &[PlanLeg]) -> U256 {
    legs.iter()
        .filter(|leg| leg.converted)
        .fold(U256::zero(), |acc, leg| acc.saturating_add(leg.token_amount))
}

/// Mint and burn strategy selection over quotes from a swap venue
pub struct StrategyOptimizer {
    quotes: Arc<dyn QuoteSource>,
    gas_oracle: Option<Arc<dyn GasPriceOracle>>,
    settings: OptimizerSettings,
}

impl StrategyOptimizer {
    pub fn new(quotes: Arc<dyn QuoteSource>, settings: OptimizerSettings) -> Self {
        Self {
            quotes,
            gas_oracle: None,
            settings,
        }
    }

    /// Enable live gas prices for `settings.gas.adjust_for_gas`
    pub fn with_gas_oracle(mut self, oracle: Arc<dyn GasPriceOracle>) -> Self {
        self.gas_oracle = Some(oracle);
        self
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    fn slippage_bps(&self) -> u32 {
        self.settings.slippage_bps
    }

    /// Cheapest plan minting exactly `pool_amount_out` shares from `token_in`
    pub async fn best_exact_pool_out(
        &self,
        pool: &PoolState,
        token_in: Address,
        pool_amount_out: U256,
    ) -> Result<TradePlan> {
        require_positive("pool_amount_out", pool_amount_out)?;
        pool.validate()?;
        let pool_out = FixedPoint18::from_raw(pool_amount_out);
        log_search!(
            "Pricing mint of {} {} from {:?} across {} assets",
            pool_out,
            pool.symbol,
            token_in,
            pool.assets.len()
        );

        let singles = join_all(
            pool.assets
                .iter()
                .map(|asset| self.single_for_pool_out(pool, asset, token_in, pool_out)),
        );
        let basket = self.basket_for_pool_out(pool, token_in, pool_out);
        let (singles, basket) = futures::join!(singles, basket);

        let mut outcomes = Outcomes::collect(singles)?;
        let single = std::mem::take(&mut outcomes.feasible)
            .into_iter()
            .min_by_key(|candidate| candidate.total);
        let mut multi = outcomes.absorb(basket?);
        if let Some(basket) = multi.as_mut() {
            basket.gas_penalty = self.gas_penalty(basket, token_in).await?;
        }

        let chosen = self
            .select(single, multi, false, StrategyCandidate::adjusted_cost)
            .ok_or_else(|| exhausted(outcomes.no_route, token_in, pool.address, "mint"))?;
        log_profit!(
            "Mint plan {:?}: {} shares for at most {} of {:?}",
            chosen.kind,
            chosen.pool_amount,
            chosen.total,
            token_in
        );
        Ok(chosen.into_plan(PlanDirection::ExactPoolOut, token_in))
    }

    /// Plan minting the most shares for exactly `amount_in` of `token_in`
    pub async fn best_exact_input(
        &self,
        pool: &PoolState,
        token_in: Address,
        amount_in: U256,
    ) -> Result<TradePlan> {
        require_positive("amount_in", amount_in)?;
        pool.validate()?;
        log_search!(
            "Pricing {} of {:?} into {} across {} assets",
            amount_in,
            token_in,
            pool.symbol,
            pool.assets.len()
        );

        let singles = join_all(
            pool.assets
                .iter()
                .map(|asset| self.single_for_input(pool, asset, token_in, amount_in)),
        )
        .await;
        let mut outcomes = Outcomes::collect(singles)?;
        let single = std::mem::take(&mut outcomes.feasible)
            .into_iter()
            .max_by_key(|candidate| candidate.pool_amount);

        let reference = single
            .as_ref()
            .map(|candidate| candidate.pool_amount)
            .unwrap_or_else(|| {
                pool.total_supply.raw_value() / U256::from(TRIAL_SUPPLY_DIVISOR)
            });
        let basket = self
            .basket_for_budget(pool, token_in, amount_in, reference)
            .await?;
        let multi = outcomes.absorb(basket);

        let chosen = self
            .select(single, multi, true, |candidate| candidate.pool_amount)
            .ok_or_else(|| exhausted(outcomes.no_route, token_in, pool.address, "mint"))?;
        log_profit!(
            "Mint plan {:?}: at least {} shares for {} of {:?}",
            chosen.kind,
            chosen.pool_amount,
            chosen.total,
            token_in
        );
        Ok(chosen.into_plan(PlanDirection::ExactInput, token_in))
    }

    /// Plan burning exactly `pool_amount_in` shares for the most `token_out`
    pub async fn best_exact_pool_in(
        &self,
        pool: &PoolState,
        token_out: Address,
        pool_amount_in: U256,
    ) -> Result<TradePlan> {
        require_positive("pool_amount_in", pool_amount_in)?;
        pool.validate()?;
        if pool_amount_in > pool.total_supply.raw_value() {
            return Err(OptimizerError::InvalidRequest {
                reason: format!(
                    "cannot burn {} of {} outstanding shares",
                    pool_amount_in,
                    pool.total_supply.raw_value()
                ),
            });
        }
        let pool_in = FixedPoint18::from_raw(pool_amount_in);
        log_search!(
            "Pricing burn of {} {} into {:?}",
            pool_in,
            pool.symbol,
            token_out
        );

        let singles = join_all(
            pool.assets
                .iter()
                .filter(|asset| asset.ready && !asset.weight.is_zero())
                .map(|asset| self.single_for_pool_in(pool, asset, token_out, pool_in)),
        );
        let basket = self.basket_for_pool_in(pool, token_out, pool_in);
        let (singles, basket) = futures::join!(singles, basket);

        let mut outcomes = Outcomes::collect(singles)?;
        let single = std::mem::take(&mut outcomes.feasible)
            .into_iter()
            .max_by_key(|candidate| candidate.total);
        let mut multi = outcomes.absorb(basket?);
        if let Some(basket) = multi.as_mut() {
            basket.gas_penalty = self.gas_penalty(basket, token_out).await?;
        }

        let chosen = self
            .select(single, multi, true, StrategyCandidate::adjusted_output)
            .ok_or_else(|| exhausted(outcomes.no_route, pool.address, token_out, "burn"))?;
        log_profit!(
            "Burn plan {:?}: {} shares for at least {} of {:?}",
            chosen.kind,
            chosen.pool_amount,
            chosen.total,
            token_out
        );
        Ok(chosen.into_plan(PlanDirection::ExactPoolIn, token_out))
    }

    /// Compare the best single-asset candidate with the proportional one
    ///
    /// Scores within the slippage band of each other resolve to the single
    /// asset candidate.
    fn select(
        &self,
        single: Option<StrategyCandidate>,
        multi: Option<StrategyCandidate>,
        maximize: bool,
        score: impl Fn(&StrategyCandidate) -> U256,
    ) -> Option<StrategyCandidate> {
        let (single, multi) = match (single, multi) {
            (Some(single), Some(multi)) => (single, multi),
            (single, multi) => return single.or(multi),
        };

        let (single_score, multi_score) = (score(&single), score(&multi));
        let band = tolerance_band(single_score.max(multi_score), self.slippage_bps());
        let prefer_single = if maximize {
            single_score.saturating_add(band) >= multi_score
        } else {
            single_score <= multi_score.saturating_add(band)
        };
        debug!(
            "Single score {} vs proportional score {} (band {})",
            single_score, multi_score, band
        );
        Some(if prefer_single { single } else { multi })
    }

    /// Source token spent to receive exactly `amount` of `asset`
    async fn buy(&self, token_in: Address, asset: Address, amount: U256) -> Result<Option<PlanLeg>> {
        if token_in == asset {
            return Ok(Some(PlanLeg::direct(asset, amount)));
        }
        let quote = self
            .quotes
            .quote_exact_out(token_in, asset, amount)
            .await
            .map_err(OptimizerError::quote_source)?;
        Ok(quote.map(|quote| PlanLeg {
            pool_token: asset,
            pool_token_amount: amount,
            token_amount: maximum_amount_in(quote.input_amount, self.slippage_bps()),
            path: quote.path,
            converted: true,
        }))
    }

    /// Pool asset received for spending exactly `amount_in` of `token_in`
    ///
    /// The leg carries the expected output; slippage is applied once, to the
    /// shares the deposit mints.
    async fn sell_into(
        &self,
        token_in: Address,
        amount_in: U256,
        asset: Address,
    ) -> Result<Option<PlanLeg>> {
        if token_in == asset {
            return Ok(Some(PlanLeg::direct(asset, amount_in)));
        }
        let quote = self
            .quotes
            .quote_exact_in(token_in, amount_in, asset)
            .await
            .map_err(OptimizerError::quote_source)?;
        Ok(quote.map(|quote| PlanLeg {
            pool_token: asset,
            pool_token_amount: quote.output_amount,
            token_amount: amount_in,
            path: quote.path,
            converted: true,
        }))
    }

    /// Destination token received for selling exactly `amount` of `asset`
    async fn dispose(
        &self,
        asset: Address,
        amount: U256,
        token_out: Address,
    ) -> Result<Option<PlanLeg>> {
        if asset == token_out {
            return Ok(Some(PlanLeg::direct(asset, amount)));
        }
        let quote = self
            .quotes
            .quote_exact_in(asset, amount, token_out)
            .await
            .map_err(OptimizerError::quote_source)?;
        Ok(quote.map(|quote| PlanLeg {
            pool_token: asset,
            pool_token_amount: amount,
            token_amount: minimum_amount_out(quote.output_amount, self.slippage_bps()),
            path: quote.path,
            converted: true,
        }))
    }

    async fn single_for_pool_out(
        &self,
        pool: &PoolState,
        asset: &PoolAssetState,
        token_in: Address,
        pool_out: FixedPoint18,
    ) -> Result<Branch> {
        let Some(deposit) = within_limits(WeightedMath::calc_single_in_given_pool_out(
            asset.used_balance,
            asset.used_weight,
            pool.total_supply,
            pool.total_weight,
            pool_out,
            pool.swap_fee,
        ))?
        else {
            return Ok(Branch::Excluded);
        };
        let deposit = deposit.raw_value();
        if !under_half_balance(deposit, asset) {
            debug!("{} deposit of {} exceeds half its balance", asset.symbol, deposit);
            return Ok(Branch::Excluded);
        }

        match self.buy(token_in, asset.token, deposit).await? {
            Some(leg) => {
                let cost = leg.token_amount;
                debug!("Single {} costs {}", asset.symbol, cost);
                Ok(Branch::Feasible(StrategyCandidate::single(
                    leg,
                    cost,
                    pool_out.raw_value(),
                )))
            }
            None => {
                warn!("No route from {:?} to {}, dropping single-asset mint", token_in, asset.symbol);
                Ok(Branch::NoRoute)
            }
        }
    }

    async fn single_for_input(
        &self,
        pool: &PoolState,
        asset: &PoolAssetState,
        token_in: Address,
        amount_in: U256,
    ) -> Result<Branch> {
        let Some(leg) = self.sell_into(token_in, amount_in, asset.token).await? else {
            warn!("No route from {:?} to {}, dropping single-asset mint", token_in, asset.symbol);
            return Ok(Branch::NoRoute);
        };
        let deposit = leg.pool_token_amount;
        if !under_half_balance(deposit, asset) {
            debug!("{} deposit of {} exceeds half its balance", asset.symbol, deposit);
            return Ok(Branch::Excluded);
        }

        let Some(pool_out) = within_limits(WeightedMath::calc_pool_out_given_single_in(
            asset.used_balance,
            asset.used_weight,
            pool.total_supply,
            pool.total_weight,
            FixedPoint18::from_raw(deposit),
            pool.swap_fee,
        ))?
        else {
            return Ok(Branch::Excluded);
        };
        let min_pool_out = minimum_amount_out(pool_out.raw_value(), self.slippage_bps());
        debug!("Single {} mints at least {}", asset.symbol, min_pool_out);
        Ok(Branch::Feasible(StrategyCandidate::single(
            leg,
            amount_in,
            min_pool_out,
        )))
    }

    async fn single_for_pool_in(
        &self,
        pool: &PoolState,
        asset: &PoolAssetState,
        token_out: Address,
        pool_in: FixedPoint18,
    ) -> Result<Branch> {
        let Some(withdrawal) = within_limits(WeightedMath::calc_single_out_given_pool_in(
            asset.balance,
            asset.weight,
            pool.total_supply,
            pool.total_weight,
            pool_in,
            pool.swap_fee,
            pool.exit_fee,
        ))?
        else {
            return Ok(Branch::Excluded);
        };

        match self.dispose(asset.token, withdrawal.raw_value(), token_out).await? {
            Some(leg) => {
                let proceeds = leg.token_amount;
                debug!("Single {} exit pays {}", asset.symbol, proceeds);
                Ok(Branch::Feasible(StrategyCandidate::single(
                    leg,
                    proceeds,
                    pool_in.raw_value(),
                )))
            }
            None => {
                warn!("No route from {} to {:?}, dropping single-asset burn", asset.symbol, token_out);
                Ok(Branch::NoRoute)
            }
        }
    }

    /// Buy the proportional basket for `pool_out` shares
    async fn basket_for_pool_out(
        &self,
        pool: &PoolState,
        token_in: Address,
        pool_out: FixedPoint18,
    ) -> Result<Branch> {
        let amounts =
            WeightedMath::calc_all_in_given_pool_out(&pool.used_balances(), pool.total_supply, pool_out)?;
        let wanted: Vec<(&PoolAssetState, U256)> = pool
            .assets
            .iter()
            .zip(amounts)
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| (asset, amount.raw_value()))
            .collect();
        if wanted.is_empty() {
            return Ok(Branch::Excluded);
        }

        let bought = join_all(
            wanted
                .iter()
                .map(|(asset, amount)| self.buy(token_in, asset.token, *amount)),
        )
        .await;

        let mut legs = Vec::with_capacity(wanted.len());
        for ((asset, _), leg) in wanted.iter().zip(bought) {
            match leg? {
                Some(leg) => legs.push(leg),
                None => {
                    warn!(
                        "No route from {:?} to {}, proportional mint not possible",
                        token_in, asset.symbol
                    );
                    return Ok(Branch::NoRoute);
                }
            }
        }

        let cost = sum_token_amounts(&legs);
        debug!("Proportional basket for {} shares costs {}", pool_out, cost);
        Ok(Branch::Feasible(StrategyCandidate::proportional(
            legs,
            cost,
            pool_out.raw_value(),
        )))
    }

    /// Largest proportional basket `amount_in` can pay for, gas included
    ///
    /// The basket is first priced at `reference` shares, then re-sized in
    /// proportion to the budget and re-priced until it fits.
    async fn basket_for_budget(
        &self,
        pool: &PoolState,
        token_in: Address,
        amount_in: U256,
        reference: U256,
    ) -> Result<Branch> {
        let mut pool_out = reference.max(U256::one());
        let mut basket = match self
            .basket_for_pool_out(pool, token_in, FixedPoint18::from_raw(pool_out))
            .await?
        {
            Branch::Feasible(basket) => basket,
            other => return Ok(other),
        };

        let gas_penalty = self.gas_penalty(&basket, token_in).await?;
        let budget = amount_in.saturating_sub(gas_penalty.unwrap_or_default());
        if budget.is_zero() {
            debug!("Gas penalty consumes the whole input");
            return Ok(Branch::Excluded);
        }

        for round in 0..MAX_SIZING_ROUNDS {
            if basket.total.is_zero() {
                return Ok(Branch::Excluded);
            }
            let mut resized = mul_div(pool_out, budget, basket.total);
            if round > 0 {
                let margin = mul_div(
                    resized,
                    U256::from(SIZING_MARGIN_BPS),
                    U256::from(BPS_DENOMINATOR),
                );
                resized = resized.saturating_sub(margin.max(U256::one()));
            }
            if resized.is_zero() {
                return Ok(Branch::Excluded);
            }

            pool_out = resized;
            basket = match self
                .basket_for_pool_out(pool, token_in, FixedPoint18::from_raw(pool_out))
                .await?
            {
                Branch::Feasible(basket) => basket,
                other => return Ok(other),
            };
            if basket.total <= budget {
                debug!("Basket sized to {} shares after {} rounds", pool_out, round + 1);
                basket.gas_penalty = gas_penalty;
                return Ok(Branch::Feasible(basket));
            }
        }

        debug!("Could not fit a proportional basket into {}", budget);
        Ok(Branch::Excluded)
    }

    /// Sell the proportional withdrawal for `pool_in` shares into `token_out`
    ///
    /// Assets with no route are kept as unconverted legs and left out of the
    /// proceeds.
    async fn basket_for_pool_in(
        &self,
        pool: &PoolState,
        token_out: Address,
        pool_in: FixedPoint18,
    ) -> Result<Branch> {
        let amounts = WeightedMath::calc_all_out_given_pool_in(
            &pool.balances(),
            &pool.weights(),
            pool.total_supply,
            pool_in,
            pool.exit_fee,
        )?;
        let withdrawn: Vec<(&PoolAssetState, U256)> = pool
            .assets
            .iter()
            .zip(amounts)
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| (asset, amount.raw_value()))
            .collect();
        if withdrawn.is_empty() {
            return Ok(Branch::Excluded);
        }

        let sold = join_all(
            withdrawn
                .iter()
                .map(|(asset, amount)| self.dispose(asset.token, *amount, token_out)),
        )
        .await;

        let mut legs = Vec::with_capacity(withdrawn.len());
        for ((asset, amount), leg) in withdrawn.iter().zip(sold) {
            match leg? {
                Some(leg) => legs.push(leg),
                None => {
                    warn!(
                        "No route from {} to {:?}, paying it out unconverted",
                        asset.symbol, token_out
                    );
                    legs.push(PlanLeg::unconverted(asset.token, *amount));
                }
            }
        }
        if !legs.iter().any(|leg| leg.converted) {
            return Ok(Branch::NoRoute);
        }

        let proceeds = sum_token_amounts(&legs);
        debug!("Proportional exit of {} shares pays {}", pool_in, proceeds);
        Ok(Branch::Feasible(StrategyCandidate::proportional(
            legs,
            proceeds,
            pool_in.raw_value(),
        )))
    }

    /// Execution cost of the candidate's extra operations, in `token` units
    async fn gas_penalty(&self, candidate: &StrategyCandidate, token: Address) -> Result<Option<U256>> {
        let gas = &self.settings.gas;
        let operations = candidate.operation_count();
        if !gas.adjust_for_gas || operations <= 1 {
            return Ok(None);
        }
        let Some(oracle) = &self.gas_oracle else {
            warn!("Gas adjustment enabled without a gas price oracle, comparing unadjusted");
            return Ok(None);
        };

        let gas_price = oracle
            .current_price()
            .await
            .map_err(OptimizerError::gas_oracle)?;
        let cost_wei = execution_cost_wei(operations - 1, gas.gas_per_operation, gas_price);
        log_gas!(
            "{} extra operations at {} wei/gas cost {} wei",
            operations - 1,
            gas_price,
            cost_wei
        );
        if token == gas.pricing_token || cost_wei.is_zero() {
            return Ok(Some(cost_wei));
        }

        let quote = self
            .quotes
            .quote_exact_in(gas.pricing_token, cost_wei, token)
            .await
            .map_err(OptimizerError::quote_source)?;
        match quote {
            Some(quote) => {
                info!("Gas penalty of {} wei is {} of {:?}", cost_wei, quote.output_amount, token);
                Ok(Some(quote.output_amount))
            }
            None => {
                warn!(
                    "No route from {:?} to {:?} to price gas, comparing unadjusted",
                    gas.pricing_token, token
                );
                Ok(None)
            }
        }
    }
}

fn exhausted(no_route: bool, token_in: Address, token_out: Address, operation: &str) -> OptimizerError {
    if no_route {
        OptimizerError::NoRouteAvailable { token_in, token_out }
    } else {
        OptimizerError::NoFeasibleCandidate {
            reason: format!("every {operation} candidate exceeds the pool's trade-size limits"),
        }
    }
}
