//! # Weighted AMM Library - Contract-Exact Pool Mathematics
//!
//! ## Purpose
//!
//! Off-chain reproduction of a weighted multi-asset pool's invariant math.
//! Every preview of a swap, single-asset join/exit or proportional
//! join/exit is computed with the same 18-decimal fixed-point operations and
//! the same order of operations as the pool contract, so a caller can check
//! a trade before submitting it.
//!
//! ## Integration Points
//!
//! - **Input Sources**: [`PoolState`] snapshots from a pool state provider, amounts from callers
//! - **Output Destinations**: mint/burn strategy optimizer, UI and transaction builders
//! - **Precision**: `U256` balances scaled by 10^18, half-up rounding on every multiply/divide
//! - **Validation**: trade-size limits checked before any fractional power is evaluated
//!
//! ## Architecture Role
//!
//! The pure-math layer under the strategy optimizer. Nothing here performs I/O,
//! holds state between calls or mutates its inputs.
//!
//! See [`architecture_diagram()`] for visual representation of the data flow.
//!
//! ## Performance Profile
//!
//! - **Integer Powers**: O(log n) fixed-point multiplications
//! - **Fractional Powers**: binomial series, converges to 10^-10 in tens of terms
//! - **Allocations**: only the per-asset vectors of proportional joins and exits

pub mod errors;
pub mod limits;
pub mod pool_state;
pub mod preview;
pub mod weighted_math;

pub use errors::PoolMathError;
pub use limits::{ensure_within_max_in, ensure_within_max_out, MAX_IN_RATIO, MAX_OUT_RATIO, MIN_WEIGHT};
pub use pool_state::{ramp_weight, PoolAssetState, PoolState};
pub use preview::{ExitPreview, JoinPreview, PoolPreview, SwapPreview, TokenAmount, WalletSnapshot};
pub use weighted_math::WeightedMath;

/// Common types for pool calculations
pub use types::{FixedPoint18, BONE};

/// Architecture diagram showing how previews flow through the pool math
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Input["📊 Snapshot"]
///         PS[PoolState]
///         WS[WalletSnapshot]
///     end
///
///     subgraph Math["🧮 Weighted Math"]
///         LM[Trade Size Limits]
///         WM[Invariant Formulas]
///         FP[FixedPoint18 pow/mul/div]
///     end
///
///     subgraph Output["🎯 Previews"]
///         SW[Swap Previews]
///         JN[Join Previews]
///         EX[Exit Previews]
///     end
///
///     PS --> LM
///     LM --> WM
///     WM --> FP
///     WM --> SW
///     WM --> JN
///     WM --> EX
///     WS --> JN
///
///     style Input fill:#e1f5fe
///     style Math fill:#fff3e0
///     style Output fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // This function exists solely for documentation purposes
    // The diagram is rendered by aquamarine in rustdoc
}
