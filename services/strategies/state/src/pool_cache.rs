//! Cached pool state provider
//!
//! Wraps any [`PoolStateProvider`] with one TTL [`SnapshotCache`] per pool
//! address. Concurrent reads of a stale pool share a single upstream fetch,
//! and every fetched snapshot is validated before it is cached.

use crate::snapshot_cache::SnapshotCache;
use crate::traits::{PoolStateProvider, StateError};
use async_trait::async_trait;
use dashmap::DashMap;
use ethers_core::types::Address;
use pool_config::CacheSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use weighted_amm::PoolState;

/// Pool cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolCacheStats {
    pub cached_pools: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct CachedPoolStateProvider<P> {
    inner: Arc<P>,
    ttl: Duration,
    caches: DashMap<Address, Arc<SnapshotCache<PoolState>>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl<P> CachedPoolStateProvider<P>
where
    P: PoolStateProvider + 'static,
{
    pub fn new(inner: P, settings: &CacheSettings) -> Self {
        Self::with_ttl(inner, settings.pool_state_ttl())
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            ttl,
            caches: DashMap::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    fn cache_for(&self, pool: Address) -> Arc<SnapshotCache<PoolState>> {
        self.caches
            .entry(pool)
            .or_insert_with(|| Arc::new(SnapshotCache::new(self.ttl)))
            .clone()
    }

    /// Snapshot of `pool`, refreshed from the wrapped provider when stale
    pub async fn pool_state(&self, pool: Address) -> Result<PoolState, StateError> {
        let cache = self.cache_for(pool);
        if cache.is_stale() {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
            debug!("Pool cache miss for {:?}", pool);
        } else {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }

        let inner = Arc::clone(&self.inner);
        cache
            .refresh_if_stale(move || async move {
                let state = inner
                    .fetch_pool_state(pool)
                    .await
                    .map_err(StateError::refresh_failed)?;
                state.validate().map_err(|e| {
                    warn!("Rejecting snapshot for {:?}: {}", pool, e);
                    StateError::InvalidSnapshot {
                        reason: e.to_string(),
                    }
                })?;
                Ok(state)
            })
            .await
    }

    /// Mark one pool stale, e.g. after a transaction the caller submitted
    pub fn invalidate(&self, pool: Address) {
        if let Some(cache) = self.caches.get(&pool) {
            cache.invalidate();
        }
    }

    pub fn stats(&self) -> PoolCacheStats {
        PoolCacheStats {
            cached_pools: self.caches.len(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<P> PoolStateProvider for CachedPoolStateProvider<P>
where
    P: PoolStateProvider + 'static,
{
    async fn fetch_pool_state(&self, pool: Address) -> anyhow::Result<PoolState> {
        Ok(self.pool_state(pool).await?)
    }
}
