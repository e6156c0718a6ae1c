//! Trade plans returned by the optimizer

use ethers_core::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Which side of the trade the caller fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanDirection {
    /// Mint an exact amount of pool shares for the least source token
    ExactPoolOut,
    /// Spend an exact amount of source token for the most pool shares
    ExactInput,
    /// Burn an exact amount of pool shares for the most destination token
    ExactPoolIn,
}

/// Shape of the pool operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// One pool asset, one single-sided join or exit
    SingleAsset,
    /// Every pool asset in proportion to its balance
    AllAssetsProportional,
}

/// One pool asset's part of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLeg {
    pub pool_token: Address,
    /// Amount of `pool_token` deposited into or withdrawn from the pool
    pub pool_token_amount: U256,
    /// Source token spent (mint) or destination token received (burn) for
    /// this leg, slippage bound applied
    pub token_amount: U256,
    /// Swap path; empty for a direct leg or an unconverted withdrawal
    pub path: Vec<Address>,
    /// False when a withdrawn asset could not be converted and is paid out as is
    pub converted: bool,
}

impl PlanLeg {
    /// Leg needing no swap: the source or destination token is the pool asset
    pub fn direct(pool_token: Address, amount: U256) -> Self {
        Self {
            pool_token,
            pool_token_amount: amount,
            token_amount: amount,
            path: Vec::new(),
            converted: true,
        }
    }

    pub fn unconverted(pool_token: Address, amount: U256) -> Self {
        Self {
            pool_token,
            pool_token_amount: amount,
            token_amount: U256::zero(),
            path: Vec::new(),
            converted: false,
        }
    }

    pub fn needs_swap(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Winning execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: PlanDirection,
    pub kind: StrategyKind,
    /// Source token of a mint, destination token of a burn
    pub token: Address,
    /// Total source token spent (at most) or destination token received (at least)
    pub token_amount: U256,
    /// Pool shares minted or burned; for exact-input mints the minimum minted
    pub pool_amount: U256,
    pub legs: Vec<PlanLeg>,
    /// Execution cost charged against a multi-asset plan, in `token` units
    pub gas_penalty: Option<U256>,
}

impl TradePlan {
    pub fn is_proportional(&self) -> bool {
        self.kind == StrategyKind::AllAssetsProportional
    }

    /// On-chain operations the plan submits, one per converted leg
    ///
    /// This is the count the gas penalty charges for.
    pub fn operation_count(&self) -> usize {
        operation_count(&self.legs)
    }

    /// Withdrawn assets that are paid out unconverted
    pub fn unconverted_legs(&self) -> impl Iterator<Item = &PlanLeg> {
        self.legs.iter().filter(|leg| !leg.converted)
    }
}

/// Unconverted withdrawals ride along with the exit and cost nothing extra
pub(crate) fn operation_count(legs: &[PlanLeg]) -> usize {
    legs.iter().filter(|leg| leg.converted).count()
}

/// A priced candidate before selection
#[derive(Debug, Clone)]
pub(crate) struct StrategyCandidate {
    pub kind: StrategyKind,
    pub legs: Vec<PlanLeg>,
    /// Source token cost or destination token output, before gas adjustment
    pub total: U256,
    pub pool_amount: U256,
    pub gas_penalty: Option<U256>,
}

impl StrategyCandidate {
    pub fn single(leg: PlanLeg, total: U256, pool_amount: U256) -> Self {
        Self {
            kind: StrategyKind::SingleAsset,
            legs: vec![leg],
            total,
            pool_amount,
            gas_penalty: None,
        }
    }

    pub fn proportional(legs: Vec<PlanLeg>, total: U256, pool_amount: U256) -> Self {
        Self {
            kind: StrategyKind::AllAssetsProportional,
            legs,
            total,
            pool_amount,
            gas_penalty: None,
        }
    }

    pub fn operation_count(&self) -> usize {
        operation_count(&self.legs)
    }

    /// Cost with the gas penalty added
    pub fn adjusted_cost(&self) -> U256 {
        self.total
            .saturating_add(self.gas_penalty.unwrap_or_default())
    }

    /// Output with the gas penalty taken off
    pub fn adjusted_output(&self) -> U256 {
        self.total
            .saturating_sub(self.gas_penalty.unwrap_or_default())
    }

    pub fn into_plan(self, direction: PlanDirection, token: Address) -> TradePlan {
        TradePlan {
            direction,
            kind: self.kind,
            token,
            token_amount: self.total,
            pool_amount: self.pool_amount,
            legs: self.legs,
            gas_penalty: self.gas_penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_count_matches_candidate() {
        let swapped = PlanLeg {
            pool_token: Address::repeat_byte(2),
            pool_token_amount: U256::from(5u64),
            token_amount: U256::from(6u64),
            path: vec![Address::repeat_byte(9), Address::repeat_byte(2)],
            converted: true,
        };
        let candidate = StrategyCandidate::proportional(
            vec![
                PlanLeg::direct(Address::repeat_byte(1), U256::from(5u64)),
                swapped,
                PlanLeg::unconverted(Address::repeat_byte(3), U256::from(7u64)),
            ],
            U256::from(11u64),
            U256::one(),
        );
        // the direct leg counts, the unconverted one does not
        assert_eq!(candidate.operation_count(), 2);
        let plan = candidate.into_plan(PlanDirection::ExactPoolIn, Address::repeat_byte(9));
        assert_eq!(plan.operation_count(), 2);

        let direct_only = StrategyCandidate::proportional(
            vec![
                PlanLeg::direct(Address::repeat_byte(1), U256::from(5u64)),
                PlanLeg::direct(Address::repeat_byte(2), U256::from(5u64)),
            ],
            U256::from(10u64),
            U256::one(),
        );
        assert_eq!(direct_only.operation_count(), 2);
        assert_eq!(
            direct_only
                .into_plan(PlanDirection::ExactPoolOut, Address::repeat_byte(1))
                .operation_count(),
            2
        );
        assert_eq!(plan.unconverted_legs().count(), 1);
        assert!(plan.is_proportional());
    }

    #[test]
    fn test_gas_penalty_adjustment() {
        let mut candidate = StrategyCandidate::proportional(Vec::new(), U256::from(100u64), U256::one());
        assert_eq!(candidate.adjusted_cost(), U256::from(100u64));
        candidate.gas_penalty = Some(U256::from(7u64));
        assert_eq!(candidate.adjusted_cost(), U256::from(107u64));
        assert_eq!(candidate.adjusted_output(), U256::from(93u64));
    }
}
