//! Single-flight memoization cell.
//!
//! A cell is always in one of three states: empty, in-flight, or settled
//! on an immutable snapshot. A caller that arrives while a fetch is in
//! flight attaches to the same shared future instead of issuing a second
//! fetch; a failed fetch empties the cell so the next caller retries from
//! scratch, and the failure is delivered to every attached waiter.
//!
//! Invalidation is unconditional: it resets the cell to empty, and a fetch
//! that is still in flight at that point has its eventual value discarded
//! rather than installed (tracked by a generation counter).

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use nomenclab_core::RemoteError;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, Arc<RemoteError>>>>;

enum CellState<T> {
    Empty,
    InFlight {
        generation: u64,
        fetch: SharedFetch<T>,
    },
    Settled(Arc<T>),
}

/// Memoized value with single-flight population.
pub struct SingleFlightCell<T> {
    state: Mutex<CellState<T>>,
    next_generation: AtomicU64,
}

impl<T: Send + Sync + 'static> SingleFlightCell<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CellState::Empty),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Return the settled snapshot, or run `fetch` to produce it.
    ///
    /// At most one fetch runs at a time; concurrent callers share its
    /// outcome. The snapshot is only installed if the cell has not been
    /// invalidated while the fetch was in flight.
    pub async fn get_or_fetch<F>(&self, fetch: F) -> Result<Arc<T>, Arc<RemoteError>>
    where
        F: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        let (generation, shared) = {
            let mut state = self.state.lock().expect("cache lock poisoned");
            match &*state {
                CellState::Settled(value) => return Ok(value.clone()),
                CellState::InFlight { generation, fetch } => (*generation, fetch.clone()),
                CellState::Empty => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let shared = fetch
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    *state = CellState::InFlight {
                        generation,
                        fetch: shared.clone(),
                    };
                    (generation, shared)
                }
            }
        };

        let result = shared.await;

        let mut state = self.state.lock().expect("cache lock poisoned");
        let still_current = matches!(
            &*state,
            CellState::InFlight { generation: current, .. } if *current == generation
        );
        if still_current {
            *state = match &result {
                Ok(value) => CellState::Settled(value.clone()),
                Err(_) => CellState::Empty,
            };
        }
        result
    }

    /// Reset the cell to empty, discarding any settled or in-flight value.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        *state = CellState::Empty;
    }

    /// The settled snapshot, if there is one right now.
    pub fn peek(&self) -> Option<Arc<T>> {
        let state = self.state.lock().expect("cache lock poisoned");
        match &*state {
            CellState::Settled(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Send + Sync + 'static> Default for SingleFlightCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures_util::future::join_all;

    fn slow_fetch(
        counter: Arc<AtomicUsize>,
        value: u32,
    ) -> impl Future<Output = Result<u32, RemoteError>> + Send + 'static {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let cell = SingleFlightCell::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let calls = (0..5).map(|_| cell.get_or_fetch(slow_fetch(counter.clone(), 7)));
        let results = join_all(calls).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(*result.unwrap(), 7);
        }
    }

    #[tokio::test]
    async fn settled_value_is_reused_without_fetching() {
        let cell = SingleFlightCell::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = cell
            .get_or_fetch(slow_fetch(counter.clone(), 1))
            .await
            .unwrap();
        let second = cell
            .get_or_fetch(slow_fetch(counter.clone(), 2))
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn failure_empties_the_cell_and_reaches_every_waiter() {
        let cell: SingleFlightCell<u32> = SingleFlightCell::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let failing = |counter: Arc<AtomicUsize>| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>(RemoteError::network("down"))
        };

        let results = join_all([
            cell.get_or_fetch(failing(counter.clone())),
            cell.get_or_fetch(failing(counter.clone())),
        ])
        .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(Result::is_err));
        assert!(cell.peek().is_none());

        // Retry starts a fresh fetch.
        let value = cell.get_or_fetch(slow_fetch(counter.clone(), 9)).await;
        assert_eq!(*value.unwrap(), 9);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_mid_flight_discards_the_settling_value() {
        let cell = Arc::new(SingleFlightCell::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let pending = {
            let cell = cell.clone();
            let counter = counter.clone();
            tokio::spawn(async move { cell.get_or_fetch(slow_fetch(counter, 1)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        cell.invalidate();

        // The waiter still receives the value it was attached to...
        assert_eq!(*pending.await.unwrap().unwrap(), 1);
        // ...but the cell did not keep it.
        assert!(cell.peek().is_none());

        let fresh = cell.get_or_fetch(slow_fetch(counter.clone(), 2)).await;
        assert_eq!(*fresh.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_clears_a_settled_value() {
        let cell = SingleFlightCell::new();
        let counter = Arc::new(AtomicUsize::new(0));

        cell.get_or_fetch(slow_fetch(counter.clone(), 1)).await.unwrap();
        assert!(cell.peek().is_some());

        cell.invalidate();
        assert!(cell.peek().is_none());

        cell.get_or_fetch(slow_fetch(counter.clone(), 2)).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
