//! Cached query layer.
//!
//! [`QueryCache`] maps a [`QueryKey`] to the last JSON response fetched for
//! it and coordinates concurrent requests. It is the only shared mutable
//! store in the engine; every change goes through [`QueryCache::fetch`],
//! [`QueryCache::refetch`], [`QueryCache::set_data`] or the invalidation
//! methods.
//!
//! # Guarantees
//!
//! - **Deduplication**: concurrent fetches of one key share a single request.
//!   The first caller becomes the leader and stores a pending marker with a
//!   [`Notify`] handle; later callers park on it and read the settled result.
//! - **Staleness**: data younger than the caller's `stale_time` (and not
//!   invalidated) is served without a request. Failed entries always refetch.
//! - **Refetch**: [`QueryCache::refetch`] always issues a new request and
//!   supersedes any request in flight.
//! - **Last request wins**: every request takes an id when it starts. A result
//!   is only written if its id is still the entry's in-flight id, so an older
//!   response that arrives late is discarded.
//! - **Invalidation**: [`QueryCache::invalidate_prefix`] marks matching entries
//!   stale; the next fetch of each goes to the network.
//!
//! # State Transitions
//!
//! ```text
//! (absent) --fetch--> Pending(id) --settle(id)--> Ready(data) | Failed(error)
//! Ready --stale/invalidated + fetch--> Pending(id')
//! Pending(id) --refetch--> Pending(id') (result of id is discarded)
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use klabis_hal::query::{QueryCache, QueryKey};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), klabis_hal::core::HalError> {
//! let cache = QueryCache::new();
//! let key = QueryKey::new("/members/1");
//! let data = cache
//!     .fetch(&key, Duration::from_secs(300), || async { Ok(json!({"id": 1})) })
//!     .await?;
//! assert_eq!(data["id"], 1);
//! # Ok(())
//! # }
//! ```

mod key;

pub use key::QueryKey;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::constants::PENDING_STATE_TIMEOUT;
use crate::core::HalError;

/// A request currently running for a key.
#[derive(Debug, Clone)]
struct InFlight {
    id: u64,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<Arc<Value>>,
    error: Option<HalError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<InFlight>,
    /// Id of the last request whose result was applied.
    settled: u64,
}

impl CacheEntry {
    fn fresh_data(&self, stale_time: Duration) -> Option<Arc<Value>> {
        if self.invalidated || self.error.is_some() {
            return None;
        }
        let updated_at = self.updated_at?;
        if updated_at.elapsed() < stale_time { self.data.clone() } else { None }
    }

    /// What a caller should get without issuing a request, if anything.
    fn outcome(
        &self,
        stale_time: Duration,
        waited_for: Option<u64>,
    ) -> Option<Result<Arc<Value>, HalError>> {
        if waited_for.is_some_and(|id| self.settled >= id) {
            if let Some(error) = &self.error {
                return Some(Err(error.clone()));
            }
            if let Some(data) = &self.data {
                return Some(Ok(Arc::clone(data)));
            }
        }
        self.fresh_data(stale_time).map(Ok)
    }
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    /// Last successfully fetched data, kept across later failures.
    pub data: Option<Arc<Value>>,
    /// Error of the most recent settled request, if it failed.
    pub error: Option<HalError>,
    /// Whether a request is in flight.
    pub is_fetching: bool,
    /// Whether the entry was invalidated since its last success.
    pub is_invalidated: bool,
    pub updated_at: Option<Instant>,
}

impl QueryState {
    /// Fetching with nothing to show yet.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_fetching && self.data.is_none()
    }
}

/// Clears a leader's pending marker if its future is dropped before settling.
struct FlightGuard<'a> {
    entries: &'a DashMap<QueryKey, CacheEntry>,
    key: &'a QueryKey,
    id: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(mut state) = self.entries.get_mut(self.key) {
            if state.in_flight.as_ref().is_some_and(|f| f.id == self.id) {
                if let Some(flight) = state.in_flight.take() {
                    drop(state);
                    debug!(target: "query", "Request {} for {} abandoned", self.id, self.key);
                    flight.notify.notify_waiters();
                }
            }
        }
    }
}

/// Shared keyed response cache. Cloning shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<DashMap<QueryKey, CacheEntry>>,
    next_request: Arc<AtomicU64>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cached data if fresh, else the result of `fetcher` (shared with any
    /// concurrent caller of the same key).
    ///
    /// # Errors
    ///
    /// Returns the error of the request this call led or waited on.
    pub async fn fetch<F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetcher: F,
    ) -> Result<Arc<Value>, HalError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, HalError>>,
    {
        let mut waited_for: Option<u64> = None;

        loop {
            match self.entries.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    if let Some(outcome) = entry.get().outcome(stale_time, waited_for) {
                        return outcome;
                    }

                    let pending =
                        entry.get().in_flight.as_ref().map(|f| (Arc::clone(&f.notify), f.id));
                    match pending {
                        Some((notify, id)) => {
                            // Register before releasing the shard lock so a
                            // settle between drop() and await cannot be missed.
                            let notified = notify.notified();
                            drop(entry);
                            waited_for = Some(id);
                            debug!(target: "query", "Waiting on request {id} for {key}");

                            let timed_out = tokio::select! {
                                () = notified => false,
                                () = tokio::time::sleep(PENDING_STATE_TIMEOUT) => true,
                            };
                            if timed_out {
                                warn!(target: "query", "Timed out waiting for request {id} for {key}, refetching");
                                return self.refetch(key, fetcher).await;
                            }
                        }
                        None => {
                            let id = self.next_id();
                            entry.get_mut().in_flight = Some(InFlight {
                                id,
                                notify: Arc::new(Notify::new()),
                            });
                            drop(entry);
                            return self.lead(key, id, fetcher).await;
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let id = self.next_id();
                    entry.insert(CacheEntry {
                        in_flight: Some(InFlight {
                            id,
                            notify: Arc::new(Notify::new()),
                        }),
                        ..CacheEntry::default()
                    });
                    return self.lead(key, id, fetcher).await;
                }
            }
        }
    }

    /// Always issue a new request, superseding any in flight for `key`.
    ///
    /// Callers parked on the superseded request are woken by this one.
    ///
    /// # Errors
    ///
    /// Returns the error of the new request.
    pub async fn refetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<Value>, HalError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, HalError>>,
    {
        let id = self.next_id();
        {
            let mut state = self.entries.entry(key.clone()).or_default();
            let notify = match state.in_flight.take() {
                Some(previous) => {
                    debug!(target: "query", "Request {id} supersedes {} for {key}", previous.id);
                    previous.notify
                }
                None => Arc::new(Notify::new()),
            };
            state.in_flight = Some(InFlight {
                id,
                notify,
            });
        }
        self.lead(key, id, fetcher).await
    }

    async fn lead<F, Fut>(&self, key: &QueryKey, id: u64, fetcher: F) -> Result<Arc<Value>, HalError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, HalError>>,
    {
        debug!(target: "query", "Request {id} for {key}");
        let mut guard = FlightGuard {
            entries: self.entries.as_ref(),
            key,
            id,
            armed: true,
        };
        let result = fetcher().await;
        guard.armed = false;
        self.settle(key, id, result)
    }

    /// Apply a finished request if it is still the current one.
    ///
    /// A superseded request's result is returned to its own caller but not
    /// written to the cache.
    fn settle(
        &self,
        key: &QueryKey,
        id: u64,
        result: Result<Value, HalError>,
    ) -> Result<Arc<Value>, HalError> {
        let result = result.map(Arc::new);

        let Some(mut state) = self.entries.get_mut(key) else {
            return result;
        };
        if !state.in_flight.as_ref().is_some_and(|f| f.id == id) {
            debug!(target: "query", "Discarding superseded result of request {id} for {key}");
            return result;
        }

        let flight = state.in_flight.take();
        match &result {
            Ok(data) => {
                state.data = Some(Arc::clone(data));
                state.error = None;
                state.updated_at = Some(Instant::now());
                state.invalidated = false;
            }
            Err(error) => {
                debug!(target: "query", "Request {id} for {key} failed: {error}");
                state.error = Some(error.clone());
            }
        }
        state.settled = id;
        drop(state);

        if let Some(flight) = flight {
            flight.notify.notify_waiters();
        }
        result
    }

    /// Write data directly, as if a request had just succeeded.
    ///
    /// Any request in flight for the key is superseded.
    pub fn set_data(&self, key: &QueryKey, data: Value) {
        let id = self.next_id();
        let mut state = self.entries.entry(key.clone()).or_default();
        let flight = state.in_flight.take();
        state.data = Some(Arc::new(data));
        state.error = None;
        state.updated_at = Some(Instant::now());
        state.invalidated = false;
        state.settled = id;
        drop(state);
        if let Some(flight) = flight {
            flight.notify.notify_waiters();
        }
    }

    /// Mark every entry whose key has `prefix` (segment-aware) as stale.
    ///
    /// Returns the number of entries marked.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().has_prefix(prefix) {
                entry.value_mut().invalidated = true;
                count += 1;
            }
        }
        debug!(target: "query", "Invalidated {count} entries under '{prefix}'");
        count
    }

    /// Mark every entry stale.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate_prefix("")
    }

    /// Current state of `key`; an unknown key yields an empty state.
    #[must_use]
    pub fn snapshot(&self, key: &QueryKey) -> QueryState {
        self.entries
            .get(key)
            .map(|state| QueryState {
                data: state.data.clone(),
                error: state.error.clone(),
                is_fetching: state.in_flight.is_some(),
                is_invalidated: state.invalidated,
                updated_at: state.updated_at,
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
