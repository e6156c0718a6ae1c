//! TTL snapshot cache with explicit refresh-if-stale
//!
//! The cache holds one `(value, fetched_at)` slot. Staleness is a property of
//! the slot and the configured TTL, and refreshing is a future the caller
//! awaits; concurrent refreshes are collapsed by [`SingleFlight`].

use crate::single_flight::SingleFlight;
use crate::traits::StateError;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A fetched value and when it was fetched
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub value: T,
    pub fetched_at: Instant,
}

impl<T> Snapshot<T> {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

pub struct SnapshotCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    ttl: Duration,
    slot: RwLock<Option<Snapshot<T>>>,
    flight: SingleFlight<T>,
}

impl<T> SnapshotCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
            flight: SingleFlight::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Latest snapshot, stale or not
    pub fn current(&self) -> Option<Snapshot<T>> {
        self.slot.read().clone()
    }

    /// Latest value if it is still within the TTL
    pub fn fresh(&self) -> Option<T> {
        self.slot
            .read()
            .as_ref()
            .filter(|snapshot| snapshot.age() < self.ttl)
            .map(|snapshot| snapshot.value.clone())
    }

    /// True when empty or when the snapshot has outlived the TTL
    pub fn is_stale(&self) -> bool {
        self.fresh().is_none()
    }

    /// True while a refresh started by [`Self::refresh_if_stale`] is pending
    pub fn is_refreshing(&self) -> bool {
        self.flight.is_in_flight()
    }

    pub fn store(&self, value: T) {
        *self.slot.write() = Some(Snapshot {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Drop the snapshot so the next read refreshes
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }

    /// Resolve to the cached value if fresh, otherwise to the result of a
    /// single shared refresh that stores its value on success
    pub fn refresh_if_stale<F, Fut>(self: &Arc<Self>, fetch: F) -> BoxFuture<'static, Result<T, StateError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StateError>> + Send + 'static,
    {
        if let Some(value) = self.fresh() {
            return future::ready(Ok(value)).boxed();
        }

        let cache = Arc::clone(self);
        self.flight
            .run(move || {
                let pending = fetch();
                async move {
                    debug!("Refreshing stale snapshot");
                    let value = pending.await?;
                    cache.store(value.clone());
                    Ok(value)
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<usize, StateError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_is_served_without_fetching() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(cache.is_stale());
        assert_eq!(cache.refresh_if_stale(counting_fetch(&calls)).await, Ok(1));
        assert!(!cache.is_stale());
        assert_eq!(cache.refresh_if_stale(counting_fetch(&calls)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_expires_after_ttl() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(120)));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.refresh_if_stale(counting_fetch(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(!cache.is_stale());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.is_stale());
        // stale values remain readable until replaced
        assert_eq!(cache.current().map(|s| s.value), Some(1));

        assert_eq!(cache.refresh_if_stale(counting_fetch(&calls)).await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_fetch_once() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let refreshes: Vec<_> = (0..5)
            .map(|_| cache.refresh_if_stale(counting_fetch(&calls)))
            .collect();
        let results = futures::future::join_all(refreshes).await;

        assert!(results.iter().all(|r| *r == Ok(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_refreshing_tracks_pending_fetch() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));
        assert!(!cache.is_refreshing());

        let mut pending = cache.refresh_if_stale(counting_fetch(&calls));
        assert!(futures::poll!(&mut pending).is_pending());
        assert!(cache.is_refreshing());

        assert_eq!(pending.await, Ok(1));
        assert!(!cache.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refresh() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.refresh_if_stale(counting_fetch(&calls)).await.unwrap();
        cache.invalidate();
        assert!(cache.current().is_none());
        assert_eq!(cache.refresh_if_stale(counting_fetch(&calls)).await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let cache = Arc::new(SnapshotCache::new(Duration::from_secs(1)));
        cache.store(10usize);
        tokio::time::advance(Duration::from_secs(2)).await;

        let result = cache
            .refresh_if_stale(|| async {
                Err(StateError::RefreshFailed {
                    reason: "timeout".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.current().map(|s| s.value), Some(10));
    }
}
