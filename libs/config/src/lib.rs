//! # Pool Toolkit Configuration
//!
//! Typed settings for the mint/burn strategy optimizer and the pool state
//! cache, loaded from TOML with environment overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pool_config::PoolkitConfig;
//!
//! let config = PoolkitConfig::load(None, Some("mainnet")).unwrap();
//! let slippage = config.optimizer.slippage_bps;
//! let ttl = config.cache.pool_state_ttl();
//! ```
//!
//! Environment variables use the `POOLKIT_` prefix and `__` between nested
//! keys, e.g. `POOLKIT_OPTIMIZER__SLIPPAGE_BPS=50`.

pub mod loader;
pub mod settings;

pub use loader::{load_config, PoolkitConfig};
pub use settings::{CacheSettings, GasSettings, OptimizerSettings, MAX_SLIPPAGE_BPS};
