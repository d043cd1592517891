//! Keyed call deduplication
//!
//! Only one unit of work per key runs at a time; callers arriving while it is
//! in flight await the same shared outcome. The work runs on its own tokio
//! task, so it completes even if every waiting caller is dropped.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// Failure of the in-flight task itself, as opposed to its output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    #[error("in-flight task panicked")]
    Panicked,

    #[error("in-flight task was cancelled")]
    Cancelled,
}

type Flight<T> = Shared<BoxFuture<'static, Result<T, FlightError>>>;
type Calls<T> = Arc<Mutex<HashMap<String, Flight<T>>>>;

pub struct SingleFlight<T> {
    calls: Calls<T>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &lock(&self.calls).len())
            .finish()
    }
}

/// Removes the flight from the map once its task ends, even on panic
struct FlightGuard<T> {
    calls: Calls<T>,
    key: String,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}

fn lock<T>(calls: &Calls<T>) -> MutexGuard<'_, HashMap<String, Flight<T>>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key` unless a call for the same key is already in
    /// flight, in which case the existing outcome is awaited instead.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T, FlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut calls = lock(&self.calls);

            match calls.get(key) {
                Some(existing) => existing.clone(),
                None => {
                    // The guard needs this lock to remove the entry, so the
                    // insert below always happens before the removal.
                    let guard = FlightGuard {
                        calls: Arc::clone(&self.calls),
                        key: key.to_string(),
                    };
                    let task = work();
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        task.await
                    });

                    let flight: Flight<T> = handle
                        .map(|joined| {
                            joined.map_err(|e| {
                                if e.is_panic() {
                                    FlightError::Panicked
                                } else {
                                    FlightError::Cancelled
                                }
                            })
                        })
                        .boxed()
                        .shared();

                    calls.insert(key.to_string(), flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Number of keys with work currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}
