//! Trade, deposit and withdrawal previews over a pool snapshot
//!
//! Previews resolve tokens by address, pick the balance/weight pair the pool
//! contract would use for each side of the trade, and render amounts for
//! display. When a [`WalletSnapshot`] is attached, amounts the wallet must spend
//! carry its balance, allowance and the approval still missing.

use crate::errors::Result;
use crate::pool_state::{PoolAssetState, PoolState};
use crate::weighted_math::WeightedMath;
use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::{format_balance, FixedPoint18};

/// Fractional digits shown in display amounts
pub const DISPLAY_PRECISION: u32 = 4;

/// Decimals of the pool share token
pub const POOL_TOKEN_DECIMALS: u32 = 18;

/// Balances and allowances (towards the pool) of one wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub owner: Address,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<Address, U256>,
}

impl WalletSnapshot {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: Address, balance: U256, allowance: U256) -> Self {
        self.balances.insert(token, balance);
        self.allowances.insert(token, allowance);
        self
    }

    pub fn balance(&self, token: Address) -> U256 {
        self.balances.get(&token).copied().unwrap_or_default()
    }

    pub fn allowance(&self, token: Address) -> U256 {
        self.allowances.get(&token).copied().unwrap_or_default()
    }
}

/// An amount of one token, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Address,
    pub symbol: String,
    pub decimals: u32,
    pub amount: U256,
    pub display_amount: String,
    /// Approval still required before the pool can pull `amount`
    pub remaining_approval_amount: Option<U256>,
    pub balance: Option<U256>,
    pub allowance: Option<U256>,
}

/// Result of a swap preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPreview {
    pub token_in: TokenAmount,
    pub token_out: TokenAmount,
    /// Spot price of `token_out` in `token_in` after the swap settles
    pub spot_price_after: FixedPoint18,
}

/// Single-asset deposit: asset spent and shares minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPreview {
    pub token_in: TokenAmount,
    pub pool_amount_out: TokenAmount,
}

/// Single-asset withdrawal: shares burned and asset received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPreview {
    pub pool_amount_in: TokenAmount,
    pub token_out: TokenAmount,
}

/// Previews against one pool snapshot and an optional wallet
pub struct PoolPreview<'a> {
    pool: &'a PoolState,
    wallet: Option<&'a WalletSnapshot>,
}

impl<'a> PoolPreview<'a> {
    pub fn new(pool: &'a PoolState) -> Self {
        Self { pool, wallet: None }
    }

    pub fn with_wallet(mut self, wallet: &'a WalletSnapshot) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn pool(&self) -> &PoolState {
        self.pool
    }

    /// Swap an exact amount of `token_in` for `token_out`
    pub fn out_given_in(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<SwapPreview> {
        let asset_in = self.pool.asset(token_in)?;
        let asset_out = self.pool.ready_asset(token_out)?;
        let amount_in = FixedPoint18::from_raw(amount_in);

        let amount_out = WeightedMath::calc_out_given_in(
            asset_in.used_balance,
            asset_in.used_weight,
            asset_out.balance,
            asset_out.weight,
            amount_in,
            self.pool.swap_fee,
        )?;
        let spot_price_after = self.spot_price_after(asset_in, asset_out, amount_in, amount_out)?;

        Ok(SwapPreview {
            token_in: self.spend(asset_in, amount_in.raw_value()),
            token_out: self.plain(asset_out, amount_out.raw_value()),
            spot_price_after,
        })
    }

    /// Swap `token_in` for an exact amount of `token_out`
    pub fn in_given_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<SwapPreview> {
        let asset_in = self.pool.asset(token_in)?;
        let asset_out = self.pool.ready_asset(token_out)?;
        let amount_out = FixedPoint18::from_raw(amount_out);

        let amount_in = WeightedMath::calc_in_given_out(
            asset_in.used_balance,
            asset_in.used_weight,
            asset_out.balance,
            asset_out.weight,
            amount_out,
            self.pool.swap_fee,
        )?;
        let spot_price_after = self.spot_price_after(asset_in, asset_out, amount_in, amount_out)?;

        Ok(SwapPreview {
            token_in: self.spend(asset_in, amount_in.raw_value()),
            token_out: self.plain(asset_out, amount_out.raw_value()),
            spot_price_after,
        })
    }

    /// Asset needed to mint exactly `pool_amount_out` shares
    pub fn single_in_given_pool_out(
        &self,
        token_in: Address,
        pool_amount_out: U256,
    ) -> Result<JoinPreview> {
        let asset = self.pool.asset(token_in)?;
        let amount_in = WeightedMath::calc_single_in_given_pool_out(
            asset.used_balance,
            asset.used_weight,
            self.pool.total_supply,
            self.pool.total_weight,
            FixedPoint18::from_raw(pool_amount_out),
            self.pool.swap_fee,
        )?;
        Ok(JoinPreview {
            token_in: self.spend(asset, amount_in.raw_value()),
            pool_amount_out: self.pool_shares(pool_amount_out, false),
        })
    }

    /// Shares minted for depositing exactly `amount_in` of one asset
    pub fn pool_out_given_single_in(&self, token_in: Address, amount_in: U256) -> Result<JoinPreview> {
        let asset = self.pool.asset(token_in)?;
        let pool_amount_out = WeightedMath::calc_pool_out_given_single_in(
            asset.used_balance,
            asset.used_weight,
            self.pool.total_supply,
            self.pool.total_weight,
            FixedPoint18::from_raw(amount_in),
            self.pool.swap_fee,
        )?;
        Ok(JoinPreview {
            token_in: self.spend(asset, amount_in),
            pool_amount_out: self.pool_shares(pool_amount_out.raw_value(), false),
        })
    }

    /// Every asset needed to mint exactly `pool_amount_out` shares
    pub fn all_in_given_pool_out(&self, pool_amount_out: U256) -> Result<Vec<TokenAmount>> {
        let amounts = WeightedMath::calc_all_in_given_pool_out(
            &self.pool.used_balances(),
            self.pool.total_supply,
            FixedPoint18::from_raw(pool_amount_out),
        )?;
        Ok(self
            .pool
            .assets
            .iter()
            .zip(amounts)
            .map(|(asset, amount)| self.spend(asset, amount.raw_value()))
            .collect())
    }

    /// Asset received for burning exactly `pool_amount_in` shares
    pub fn single_out_given_pool_in(
        &self,
        token_out: Address,
        pool_amount_in: U256,
    ) -> Result<ExitPreview> {
        let asset = self.pool.ready_asset(token_out)?;
        let amount_out = WeightedMath::calc_single_out_given_pool_in(
            asset.balance,
            asset.weight,
            self.pool.total_supply,
            self.pool.total_weight,
            FixedPoint18::from_raw(pool_amount_in),
            self.pool.swap_fee,
            self.pool.exit_fee,
        )?;
        Ok(ExitPreview {
            pool_amount_in: self.pool_shares(pool_amount_in, true),
            token_out: self.plain(asset, amount_out.raw_value()),
        })
    }

    /// Shares burned to withdraw exactly `amount_out` of one asset
    pub fn pool_in_given_single_out(
        &self,
        token_out: Address,
        amount_out: U256,
    ) -> Result<ExitPreview> {
        let asset = self.pool.ready_asset(token_out)?;
        let pool_amount_in = WeightedMath::calc_pool_in_given_single_out(
            asset.balance,
            asset.weight,
            self.pool.total_supply,
            self.pool.total_weight,
            FixedPoint18::from_raw(amount_out),
            self.pool.swap_fee,
            self.pool.exit_fee,
        )?;
        Ok(ExitPreview {
            pool_amount_in: self.pool_shares(pool_amount_in.raw_value(), true),
            token_out: self.plain(asset, amount_out),
        })
    }

    /// Every asset received for burning exactly `pool_amount_in` shares
    pub fn all_out_given_pool_in(&self, pool_amount_in: U256) -> Result<Vec<TokenAmount>> {
        let amounts = WeightedMath::calc_all_out_given_pool_in(
            &self.pool.balances(),
            &self.pool.weights(),
            self.pool.total_supply,
            FixedPoint18::from_raw(pool_amount_in),
            self.pool.exit_fee,
        )?;
        Ok(self
            .pool
            .assets
            .iter()
            .zip(amounts)
            .map(|(asset, amount)| self.plain(asset, amount.raw_value()))
            .collect())
    }

    fn spot_price_after(
        &self,
        asset_in: &PoolAssetState,
        asset_out: &PoolAssetState,
        amount_in: FixedPoint18,
        amount_out: FixedPoint18,
    ) -> Result<FixedPoint18> {
        WeightedMath::calc_spot_price(
            asset_in.used_balance.try_add(amount_in)?,
            asset_in.used_weight,
            asset_out.used_balance.try_sub(amount_out)?,
            asset_out.used_weight,
            self.pool.swap_fee,
        )
    }

    fn plain(&self, asset: &PoolAssetState, amount: U256) -> TokenAmount {
        render(asset.token, &asset.symbol, asset.decimals, amount)
    }

    /// Amount the wallet pays into the pool
    fn spend(&self, asset: &PoolAssetState, amount: U256) -> TokenAmount {
        let mut rendered = self.plain(asset, amount);
        if let Some(wallet) = self.wallet {
            let allowance = wallet.allowance(asset.token);
            rendered.remaining_approval_amount = Some(amount.saturating_sub(allowance));
            rendered.allowance = Some(allowance);
            rendered.balance = Some(wallet.balance(asset.token));
        }
        rendered
    }

    /// Pool shares; burns report the wallet's share balance
    fn pool_shares(&self, amount: U256, burned: bool) -> TokenAmount {
        let mut rendered = render(
            self.pool.address,
            &self.pool.symbol,
            POOL_TOKEN_DECIMALS,
            amount,
        );
        if let (true, Some(wallet)) = (burned, self.wallet) {
            rendered.balance = Some(wallet.balance(self.pool.address));
        }
        rendered
    }
}

fn render(token: Address, symbol: &str, decimals: u32, amount: U256) -> TokenAmount {
    TokenAmount {
        token,
        symbol: symbol.to_string(),
        decimals,
        amount,
        display_amount: format_balance(amount, decimals, DISPLAY_PRECISION),
        remaining_approval_amount: None,
        balance: None,
        allowance: None,
    }
}
