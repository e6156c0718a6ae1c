//! # Pool State Cache - Snapshot Lifetimes Made Explicit
//!
//! ## Purpose
//!
//! Typed access to pool snapshots for the strategy layer. Snapshots are values
//! with an explicit TTL; refreshing a stale one is a future the caller awaits,
//! and concurrent refreshes of the same pool collapse into a single upstream
//! request.
//!
//! ## Integration Points
//!
//! - **Input Sources**: any [`PoolStateProvider`] (batched contract reads, subgraph, fixtures)
//! - **Output Destinations**: strategy optimizer, previews, UI layers
//! - **Configuration**: TTLs from `pool_config::CacheSettings`, never hard-coded
//! - **Validation**: fetched snapshots are checked with `PoolState::validate` before caching
//!
//! ## Architecture Role
//!
//! ```text
//! Caller → [CachedPoolStateProvider] → fresh? → cached PoolState
//!                     ↓ stale
//!              [SnapshotCache] → [SingleFlight] → PoolStateProvider (one request)
//! ```

pub mod pool_cache;
pub mod single_flight;
pub mod snapshot_cache;
pub mod traits;

pub use pool_cache::{CachedPoolStateProvider, PoolCacheStats};
pub use single_flight::{SharedFetch, SingleFlight};
pub use snapshot_cache::{Snapshot, SnapshotCache};

// Re-export core traits for convenience
pub use traits::{PoolStateProvider, StateError};
