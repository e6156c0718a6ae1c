//! Single-flight request deduplication
//!
//! At most one request runs at a time; callers arriving while it is in flight
//! receive a clone of the same shared future and therefore the same result.
//! Once it completes the next call starts a fresh request.

use crate::traits::StateError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;

/// Shared handle to an in-flight request
pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, StateError>>>;

pub struct SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    in_flight: Mutex<Option<SharedFetch<T>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(None),
        }
    }

    /// Join the current request, or start one with `start` if none is running
    pub fn run<F, Fut>(&self, start: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StateError>> + Send + 'static,
    {
        let mut slot = self.in_flight.lock();
        if let Some(pending) = slot.as_ref() {
            if pending.peek().is_none() {
                return pending.clone();
            }
        }

        let shared = start().boxed().shared();
        *slot = Some(shared.clone());
        shared
    }

    /// True while a started request has not yet completed
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .lock()
            .as_ref()
            .is_some_and(|pending| pending.peek().is_none())
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
