//! Duplicate-load suppression.
//!
//! A [`FlightGroup`] collapses concurrent loads for the same key onto a
//! single in-flight future. The first caller becomes the leader and runs
//! the work; everyone else waits on the flight and receives a clone of the
//! same result. The flight is deregistered before waiters are released, so
//! a caller arriving after completion starts a fresh load.

use std::collections::HashMap;
use std::pin::pin;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::Error;

struct Flight<T> {
    done: Notify,
    slot: OnceLock<Result<T, Error>>,
}

impl<T> Flight<T> {
    fn new() -> Self {
        Self {
            done: Notify::new(),
            slot: OnceLock::new(),
        }
    }
}

/// A namespace of keyed flights.
pub struct FlightGroup<T> {
    flights: Mutex<HashMap<String, Arc<Flight<T>>>>,
}

enum Role<T> {
    Leader(Arc<Flight<T>>),
    Waiter(Arc<Flight<T>>),
}

impl<T: Clone> FlightGroup<T> {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Run `fut` for `key`, collapsing concurrent callers.
    ///
    /// For any overlapping set of callers with the same key the future is
    /// driven at most once; the others block until it completes and then
    /// receive the identical result. A waiter whose `ctx` fires returns
    /// [`Error::Canceled`] immediately without cancelling the flight for
    /// the remaining waiters.
    pub async fn work<F>(
        &self,
        ctx: &CancellationToken,
        key: &str,
        fut: F,
    ) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let role = {
            let mut flights = self.flights.lock();
            match flights.get(key) {
                Some(flight) => Role::Waiter(flight.clone()),
                None => {
                    let flight = Arc::new(Flight::new());
                    flights.insert(key.to_string(), flight.clone());
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Leader(flight) => {
                let result = fut.await;
                // Deregister before waking so the next caller starts a
                // fresh flight instead of observing this one.
                self.flights.lock().remove(key);
                let _ = flight.slot.set(result.clone());
                flight.done.notify_waiters();
                result
            }
            Role::Waiter(flight) => loop {
                let mut notified = pin!(flight.done.notified());
                notified.as_mut().enable();
                if let Some(result) = flight.slot.get() {
                    return result.clone();
                }
                tokio::select! {
                    _ = ctx.cancelled() => return Err(Error::Canceled),
                    _ = &mut notified => {}
                }
            },
        }
    }

    /// Number of flights currently in progress.
    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }
}

impl<T: Clone> Default for FlightGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}
