//! Request coalescing for remote fetches.
//!
//! Concurrent misses for the same key share one remote call: the first caller
//! becomes the leader and runs the fetch while holding the slot's lock, later
//! callers wait on that lock and read the published result.
//!
//! A leader whose future is dropped before finishing leaves an empty slot
//! behind. The next waiter to see it removes the orphan and retries, possibly
//! becoming the leader itself.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use arnoldb_core::RemoteError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

type Slot<V> = Arc<Mutex<Option<Result<V, RemoteError>>>>;

/// How a caller obtained its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// This caller ran the fetch.
    Leader,
    /// This caller waited for another caller's fetch.
    Follower,
}

/// Per-key in-flight registry.
#[derive(Debug)]
pub struct SingleFlight<K, V>
where
    K: Eq + Hash,
{
    in_flight: DashMap<K, Slot<V>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a fetch currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run `fetch` for `key` unless a fetch for the same key is already running,
    /// in which case wait for it and share its result.
    pub async fn run<F, Fut>(&self, key: K, fetch: F) -> (Result<V, RemoteError>, Flight)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RemoteError>>,
    {
        let (slot, mut guard) = loop {
            let slot = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let slot: Slot<V> = Arc::new(Mutex::new(None));
                    // A fresh mutex is always free; lock it before publishing
                    // so followers block until the result is in.
                    match Arc::clone(&slot).try_lock_owned() {
                        Ok(guard) => {
                            entry.insert(Arc::clone(&slot));
                            break (slot, guard);
                        }
                        Err(_) => continue,
                    }
                }
            };

            let guard = slot.lock().await;
            if let Some(result) = guard.as_ref() {
                return (result.clone(), Flight::Follower);
            }
            drop(guard);
            self.in_flight
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
        };

        let result = fetch().await;
        *guard = Some(result.clone());
        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
        drop(guard);
        (result, Flight::Leader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sequential_calls_each_fetch() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let (first, role) = flights.run("a".to_string(), || async { Ok(1) }).await;
        assert_eq!(first, Ok(1));
        assert_eq!(role, Flight::Leader);

        let (second, role) = flights.run("a".to_string(), || async { Ok(2) }).await;
        assert_eq!(second, Ok(2));
        assert_eq!(role, Flight::Leader);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_share_one_fetch() {
        let flights: Arc<SingleFlight<String, u32>> = Arc::new(SingleFlight::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let flights = Arc::clone(&flights);
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                flights
                    .run("hot".to_string(), || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        let mut leaders = 0;
        for handle in handles {
            let (result, role) = handle.await.unwrap();
            assert_eq!(result, Ok(42));
            if role == Flight::Leader {
                leaders += 1;
            }
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_not_sticky() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let (result, _) = flights
            .run("k".to_string(), || async {
                Err(RemoteError::unavailable(
                    arnoldb_core::RemoteOperation::FetchObjectTypeTitle,
                    "",
                    "down",
                ))
            })
            .await;
        assert!(result.is_err());

        let (result, _) = flights.run("k".to_string(), || async { Ok(5) }).await;
        assert_eq!(result, Ok(5));
    }

    #[tokio::test]
    async fn test_orphaned_leader_is_recovered() {
        let flights: Arc<SingleFlight<String, u32>> = Arc::new(SingleFlight::new());

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run("k".to_string(), || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(flights.in_flight(), 1);
        leader.abort();
        let _ = leader.await;

        let (result, role) = flights.run("k".to_string(), || async { Ok(2) }).await;
        assert_eq!(result, Ok(2));
        assert_eq!(role, Flight::Leader);
    }
}
