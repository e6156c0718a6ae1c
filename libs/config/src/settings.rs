//! # Optimizer and Cache Settings
//!
//! ## Purpose
//!
//! Runtime parameters for the mint/burn strategy optimizer and the pool state
//! cache. Nothing here is hard-coded at the call sites: slippage, gas
//! adjustment and cache lifetimes all come from these structures.
//!
//! ## Integration Points
//!
//! - **Input Sources**: TOML configuration files, `POOLKIT_` environment variables
//! - **Output Destinations**: `StrategyOptimizer`, `CachedPoolStateProvider`
//! - **Validation**: [`OptimizerSettings::validate`] and [`CacheSettings::validate`]
//!   reject values the optimizer could not act on

use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Basis points in one whole
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Upper bound accepted for slippage tolerance (50%)
pub const MAX_SLIPPAGE_BPS: u32 = 5_000;

/// Strategy optimizer parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Slippage tolerance applied to quotes, in basis points (200 = 2%)
    pub slippage_bps: u32,
    /// Execution cost adjustment of multi-asset strategies
    pub gas: GasSettings,
}

/// Gas-adjusted comparison parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSettings {
    pub adjust_for_gas: bool,
    /// Gas units charged for each on-chain operation beyond the first
    pub gas_per_operation: u64,
    /// Token gas is paid in (wrapped native token); gas costs are quoted from it
    pub pricing_token: Address,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            slippage_bps: 200,
            gas: GasSettings::default(),
        }
    }
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            adjust_for_gas: false,
            gas_per_operation: 100_000,
            // WETH
            pricing_token: Address::from([
                0xc0, 0x2a, 0xaa, 0x39, 0xb2, 0x23, 0xfe, 0x8d, 0x0a, 0x0e, 0x5c, 0x4f, 0x27, 0xea,
                0xd9, 0x08, 0x3c, 0x75, 0x6c, 0xc2,
            ]),
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.slippage_bps > MAX_SLIPPAGE_BPS {
            anyhow::bail!("slippage_bps must be <= {} (50%)", MAX_SLIPPAGE_BPS);
        }
        if self.gas.adjust_for_gas && self.gas.gas_per_operation == 0 {
            anyhow::bail!("gas_per_operation must be positive when adjust_for_gas is enabled");
        }
        Ok(())
    }
}

/// Cache lifetimes for externally fetched data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Pool balances, weights and fees
    pub pool_state_ttl_secs: u64,
    /// Swap venue quotes and pair reserves
    pub quote_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            pool_state_ttl_secs: 600,
            quote_ttl_secs: 120,
        }
    }
}

impl CacheSettings {
    pub fn pool_state_ttl(&self) -> Duration {
        Duration::from_secs(self.pool_state_ttl_secs)
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pool_state_ttl_secs == 0 {
            anyhow::bail!("pool_state_ttl_secs must be positive");
        }
        if self.quote_ttl_secs == 0 {
            anyhow::bail!("quote_ttl_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let optimizer = OptimizerSettings::default();
        assert_eq!(optimizer.slippage_bps, 200);
        assert!(!optimizer.gas.adjust_for_gas);
        assert!(optimizer.validate().is_ok());

        let cache = CacheSettings::default();
        assert_eq!(cache.pool_state_ttl(), Duration::from_secs(600));
        assert!(cache.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut optimizer = OptimizerSettings::default();
        optimizer.slippage_bps = MAX_SLIPPAGE_BPS + 1;
        assert!(optimizer.validate().is_err());

        let mut optimizer = OptimizerSettings::default();
        optimizer.gas.adjust_for_gas = true;
        optimizer.gas.gas_per_operation = 0;
        assert!(optimizer.validate().is_err());

        let cache = CacheSettings {
            pool_state_ttl_secs: 0,
            ..Default::default()
        };
        assert!(cache.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: OptimizerSettings = toml::from_str("slippage_bps = 50").unwrap();
        assert_eq!(settings.slippage_bps, 50);
        assert_eq!(settings.gas, GasSettings::default());
    }
}
