//! Weighted pool snapshot model
//!
//! A [`PoolState`] is an immutable snapshot supplied by the data layer. Assets
//! that are still ramping into the pool are priced with `used_balance` and
//! `used_weight`; ready assets use their real values for both.

use crate::errors::{PoolMathError, Result};
use crate::limits::MIN_WEIGHT;
use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::FixedPoint18;

/// One token bound to the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAssetState {
    pub token: Address,
    pub symbol: String,
    pub decimals: u32,
    /// False while the asset is below its minimum balance
    pub ready: bool,
    pub balance: FixedPoint18,
    /// Denormalized weight; zero for assets not yet ready or fully exited
    pub weight: FixedPoint18,
    pub used_balance: FixedPoint18,
    pub used_weight: FixedPoint18,
    pub minimum_balance: Option<FixedPoint18>,
}

impl PoolAssetState {
    /// A fully ramped asset priced with its real balance and weight
    pub fn ready(
        token: Address,
        symbol: impl Into<String>,
        decimals: u32,
        balance: FixedPoint18,
        weight: FixedPoint18,
    ) -> Self {
        Self {
            token,
            symbol: symbol.into(),
            decimals,
            ready: true,
            balance,
            weight,
            used_balance: balance,
            used_weight: weight.max(MIN_WEIGHT),
            minimum_balance: None,
        }
    }

    /// An asset still ramping in, priced as if it held `minimum_balance`
    pub fn initializing(
        token: Address,
        symbol: impl Into<String>,
        decimals: u32,
        balance: FixedPoint18,
        minimum_balance: FixedPoint18,
    ) -> Result<Self> {
        Ok(Self {
            token,
            symbol: symbol.into(),
            decimals,
            ready: false,
            balance,
            weight: FixedPoint18::ZERO,
            used_balance: minimum_balance,
            used_weight: ramp_weight(balance, minimum_balance)?,
            minimum_balance: Some(minimum_balance),
        })
    }
}

/// Weight of an asset that has not reached its minimum balance
///
/// `MIN_WEIGHT + MIN_WEIGHT/10 · (minimum_balance - balance) / minimum_balance`
pub fn ramp_weight(balance: FixedPoint18, minimum_balance: FixedPoint18) -> Result<FixedPoint18> {
    let (shortfall, over) = minimum_balance.sub_sign(balance);
    if over {
        return Ok(MIN_WEIGHT);
    }
    let premium_cap = FixedPoint18::from_raw(MIN_WEIGHT.raw_value() / 10);
    let premium = premium_cap.mul_fixed(shortfall.div_fixed(minimum_balance)?)?;
    Ok(MIN_WEIGHT.try_add(premium)?)
}

/// Snapshot of a weighted pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Pool token address
    pub address: Address,
    pub symbol: String,
    pub assets: Vec<PoolAssetState>,
    pub total_supply: FixedPoint18,
    pub total_weight: FixedPoint18,
    pub swap_fee: FixedPoint18,
    pub exit_fee: FixedPoint18,
}

impl PoolState {
    /// Build a snapshot, deriving `total_weight` from the asset weights
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        assets: Vec<PoolAssetState>,
        total_supply: FixedPoint18,
        swap_fee: FixedPoint18,
        exit_fee: FixedPoint18,
    ) -> Result<Self> {
        let total_weight = assets
            .iter()
            .try_fold(FixedPoint18::ZERO, |acc, asset| acc.try_add(asset.weight))?;
        let assets = assets
            .into_iter()
            .map(|mut asset| {
                if asset.used_weight < MIN_WEIGHT {
                    debug!(symbol = %asset.symbol, "used weight below floor, pricing with MIN_WEIGHT");
                    asset.used_weight = MIN_WEIGHT;
                }
                asset
            })
            .collect();

        let state = Self {
            address,
            symbol: symbol.into(),
            assets,
            total_supply,
            total_weight,
            swap_fee,
            exit_fee,
        };
        state.validate()?;
        Ok(state)
    }

    /// Check the snapshot is fully populated and internally consistent
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(PoolMathError::InvalidPoolState { reason });

        if self.assets.is_empty() {
            return invalid("pool has no assets".to_string());
        }
        if self.swap_fee >= FixedPoint18::ONE {
            return invalid(format!("swap fee {} must be below 1", self.swap_fee));
        }
        if self.exit_fee >= FixedPoint18::ONE {
            return invalid(format!("exit fee {} must be below 1", self.exit_fee));
        }
        if self.total_supply.is_zero() {
            return invalid("total supply is zero".to_string());
        }

        let weight_sum = self
            .assets
            .iter()
            .try_fold(FixedPoint18::ZERO, |acc, asset| acc.try_add(asset.weight))?;
        if weight_sum != self.total_weight || self.total_weight.is_zero() {
            return invalid(format!(
                "asset weights sum to {} but total weight is {}",
                weight_sum, self.total_weight
            ));
        }

        for asset in &self.assets {
            if asset.used_weight < MIN_WEIGHT {
                return invalid(format!("{} used weight below minimum", asset.symbol));
            }
            if asset.used_balance.is_zero() {
                return invalid(format!("{} has no usable balance", asset.symbol));
            }
        }
        Ok(())
    }

    pub fn asset(&self, token: Address) -> Result<&PoolAssetState> {
        self.assets
            .iter()
            .find(|asset| asset.token == token)
            .ok_or(PoolMathError::UnknownToken { token })
    }

    pub fn contains(&self, token: Address) -> bool {
        self.assets.iter().any(|asset| asset.token == token)
    }

    /// Asset that may be withdrawn or bought out of the pool
    pub fn ready_asset(&self, token: Address) -> Result<&PoolAssetState> {
        let asset = self.asset(token)?;
        if !asset.ready {
            return Err(PoolMathError::ReadinessViolation { token });
        }
        Ok(asset)
    }

    /// `weight / total_weight`
    pub fn normalized_weight(&self, token: Address) -> Result<FixedPoint18> {
        Ok(self.asset(token)?.weight.div_fixed(self.total_weight)?)
    }

    /// Total pool value denominated in `token`
    ///
    /// `used_balance · total_weight / used_weight`
    pub fn extrapolate_value(&self, token: Address) -> Result<FixedPoint18> {
        let asset = self.asset(token)?;
        Ok(asset
            .used_balance
            .mul_fixed(self.total_weight)?
            .div_fixed(asset.used_weight)?)
    }

    pub fn used_balances(&self) -> Vec<FixedPoint18> {
        self.assets.iter().map(|asset| asset.used_balance).collect()
    }

    pub fn balances(&self) -> Vec<FixedPoint18> {
        self.assets.iter().map(|asset| asset.balance).collect()
    }

    pub fn weights(&self) -> Vec<FixedPoint18> {
        self.assets.iter().map(|asset| asset.weight).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> FixedPoint18 {
        FixedPoint18::from_decimal_str(s).unwrap()
    }

    fn two_asset_pool() -> PoolState {
        PoolState::new(
            Address::repeat_byte(0xAA),
            "DPI",
            vec![
                PoolAssetState::ready(Address::repeat_byte(1), "AAA", 18, fp("10000"), fp("1")),
                PoolAssetState::ready(Address::repeat_byte(2), "BBB", 18, fp("20000"), fp("1")),
            ],
            fp("100"),
            fp("0.003"),
            FixedPoint18::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn test_ramp_weight_premium() {
        // half way to the minimum balance: MIN_WEIGHT + MIN_WEIGHT/20
        let weight = ramp_weight(fp("50"), fp("100")).unwrap();
        assert_eq!(weight, fp("0.2625"));

        // empty asset gets the full premium
        assert_eq!(ramp_weight(FixedPoint18::ZERO, fp("100")).unwrap(), fp("0.275"));

        // at or beyond the threshold only the floor remains
        assert_eq!(ramp_weight(fp("150"), fp("100")).unwrap(), MIN_WEIGHT);
    }

    #[test]
    fn test_initializing_asset_uses_minimum_balance() {
        let asset = PoolAssetState::initializing(
            Address::repeat_byte(3),
            "CCC",
            6,
            fp("25"),
            fp("100"),
        )
        .unwrap();
        assert!(!asset.ready);
        assert_eq!(asset.used_balance, fp("100"));
        assert_eq!(asset.used_weight, fp("0.26875"));
        assert!(asset.weight.is_zero());
    }

    #[test]
    fn test_zero_used_weight_is_floored() {
        let mut asset =
            PoolAssetState::ready(Address::repeat_byte(1), "AAA", 18, fp("10"), fp("1"));
        asset.used_weight = FixedPoint18::ZERO;
        let state = PoolState::new(
            Address::zero(),
            "P",
            vec![asset],
            fp("1"),
            FixedPoint18::ZERO,
            FixedPoint18::ZERO,
        )
        .unwrap();
        assert_eq!(state.assets[0].used_weight, MIN_WEIGHT);
    }

    #[test]
    fn test_validate_rejects_bad_fees_and_weights() {
        let mut state = two_asset_pool();
        state.swap_fee = FixedPoint18::ONE;
        assert!(matches!(
            state.validate(),
            Err(PoolMathError::InvalidPoolState { .. })
        ));

        let mut state = two_asset_pool();
        state.total_weight = fp("3");
        assert!(state.validate().is_err());

        let mut state = two_asset_pool();
        state.total_supply = FixedPoint18::ZERO;
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_fully_exited_asset_is_accepted() {
        let state = PoolState::new(
            Address::repeat_byte(0xAA),
            "DPI",
            vec![
                PoolAssetState::ready(Address::repeat_byte(1), "AAA", 18, fp("10000"), fp("1")),
                PoolAssetState::ready(Address::repeat_byte(2), "BBB", 18, fp("500"), FixedPoint18::ZERO),
            ],
            fp("100"),
            fp("0.003"),
            FixedPoint18::ZERO,
        )
        .unwrap();

        let exited = state.asset(Address::repeat_byte(2)).unwrap();
        assert!(exited.ready);
        assert!(exited.weight.is_zero());
        assert_eq!(exited.used_weight, MIN_WEIGHT);
        assert_eq!(state.total_weight, fp("1"));
        assert!(state.normalized_weight(Address::repeat_byte(2)).unwrap().is_zero());
    }

    #[test]
    fn test_lookup_and_extrapolation() {
        let state = two_asset_pool();
        assert_eq!(state.total_weight, fp("2"));
        assert_eq!(
            state.normalized_weight(Address::repeat_byte(1)).unwrap(),
            fp("0.5")
        );
        assert_eq!(
            state.extrapolate_value(Address::repeat_byte(2)).unwrap(),
            fp("40000")
        );
        assert!(matches!(
            state.asset(Address::repeat_byte(9)),
            Err(PoolMathError::UnknownToken { .. })
        ));
    }
}
