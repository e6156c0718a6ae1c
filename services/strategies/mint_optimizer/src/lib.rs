//! # Mint Optimizer
//!
//! Chooses how to mint or burn shares of a weighted multi-asset pool through
//! one token: swap into a single pool asset and join single-sided, or buy the
//! whole basket and join proportionally (and the reverse for exits).
//!
//! ## Operations
//!
//! - [`StrategyOptimizer::best_exact_pool_out`]: exact shares, least input
//! - [`StrategyOptimizer::best_exact_input`]: exact input, most shares
//! - [`StrategyOptimizer::best_exact_pool_in`]: exact shares burned, most output
//!
//! Quotes come from a caller-supplied [`QuoteSource`]; gas prices from an
//! optional [`GasPriceOracle`]. [`MintPlanner`] adds cached pool snapshots and
//! configuration wiring on top.

pub mod errors;
pub mod gas;
pub mod logging;
pub mod optimizer;
pub mod plan;
pub mod planner;
pub mod quote;
pub mod slippage;
pub mod testing;

pub use errors::{OptimizerError, Result};
pub use gas::{execution_cost_wei, CachedGasPriceOracle, GasPriceOracle};
pub use optimizer::StrategyOptimizer;
pub use plan::{PlanDirection, PlanLeg, StrategyKind, TradePlan};
pub use planner::MintPlanner;
pub use quote::{CachedQuoteSource, QuoteSource, TradeQuote};
pub use slippage::{maximum_amount_in, minimum_amount_out};
