//! Target data resolution.
//!
//! A form edits the resource its template targets. When the target is the
//! resource already on screen (or the template has no target), its data is
//! used directly. Otherwise the target is fetched, always fresh by default,
//! and the result decides the phase:
//!
//! ```text
//! NoTemplate | UseCurrent            (no fetch)
//! Fetching -> Ready                  (target data)
//!          -> SuppressedError        (404/405: current data, no error)
//!          -> Error                  (current data + error, retry via refetch)
//! ```
//!
//! Each `resolve` takes a generation number; when a newer `resolve` or
//! `refetch` has started by the time a fetch completes, the older result is
//! not applied.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::constants::TARGET_DATA_STALE_TIME;
use crate::core::HalError;
use crate::hal::{ApiPaths, HalFormsTemplate};
use crate::http::AuthorizedFetch;
use crate::query::{QueryCache, QueryKey};

/// Statuses meaning "this target cannot be read", not worth an error.
const SUPPRESSED_STATUSES: &[u16] = &[404, 405];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPhase {
    #[default]
    NoTemplate,
    UseCurrent,
    Fetching,
    Ready,
    SuppressedError,
    Error,
}

/// Data a form should start from, and how it was obtained.
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    pub phase: TargetPhase,
    /// Target data when `Ready`, otherwise the current resource's data.
    pub data: Option<Arc<Value>>,
    /// Set only in the `Error` phase.
    pub error: Option<HalError>,
}

impl TargetState {
    fn with(phase: TargetPhase, data: Option<Arc<Value>>) -> Self {
        Self {
            phase,
            data,
            error: None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == TargetPhase::Fetching
    }
}

#[derive(Debug, Clone)]
struct TargetRequest {
    href: String,
    fallback: Option<Arc<Value>>,
}

/// What a state change does to the remembered target request.
enum RequestUpdate {
    Keep,
    Replace(TargetRequest),
    Clear,
}

#[derive(Debug, Default)]
struct Inner {
    state: TargetState,
    request: Option<TargetRequest>,
}

/// Resolves the data a form template should be initialized from.
#[derive(Debug, Clone)]
pub struct TargetDataResolver {
    fetch: AuthorizedFetch,
    cache: QueryCache,
    paths: ApiPaths,
    stale_time: Duration,
    generation: Arc<AtomicU64>,
    inner: Arc<Mutex<Inner>>,
}

impl TargetDataResolver {
    #[must_use]
    pub fn new(fetch: AuthorizedFetch, cache: QueryCache, paths: ApiPaths) -> Self {
        Self {
            fetch,
            cache,
            paths,
            stale_time: TARGET_DATA_STALE_TIME,
            generation: Arc::new(AtomicU64::new(0)),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Latest applied state.
    pub async fn state(&self) -> TargetState {
        self.inner.lock().await.state.clone()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `state` if `generation` is still the newest; return the state in effect.
    async fn apply(&self, generation: u64, request: RequestUpdate, state: TargetState) -> TargetState {
        let mut inner = self.inner.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(target: "forms", "Discarding target result of superseded generation {generation}");
            return inner.state.clone();
        }
        inner.state = state.clone();
        match request {
            RequestUpdate::Keep => {}
            RequestUpdate::Replace(request) => inner.request = Some(request),
            RequestUpdate::Clear => inner.request = None,
        }
        state
    }

    /// Resolve the starting data for `template` shown at `current_path`.
    pub async fn resolve(
        &self,
        template: Option<&HalFormsTemplate>,
        current_path: &str,
        current_data: Option<Arc<Value>>,
    ) -> TargetState {
        let generation = self.next_generation();

        let Some(template) = template else {
            return self.apply(generation, RequestUpdate::Clear, TargetState::default()).await;
        };

        let href = match template.target() {
            Some(target) if self.paths.should_fetch_target(Some(target), current_path) => target.to_string(),
            _ => {
                return self
                    .apply(
                        generation,
                        RequestUpdate::Clear,
                        TargetState::with(TargetPhase::UseCurrent, current_data),
                    )
                    .await;
            }
        };

        let request = TargetRequest {
            href,
            fallback: current_data,
        };
        self.run(generation, request, false).await
    }

    /// Re-run the current target fetch, ignoring staleness.
    ///
    /// When the latest `resolve` needed no fetch the current state is returned.
    pub async fn refetch(&self) -> TargetState {
        let generation = self.next_generation();
        let request = self.inner.lock().await.request.clone();
        match request {
            Some(request) => self.run(generation, request, true).await,
            None => self.state().await,
        }
    }

    async fn run(&self, generation: u64, request: TargetRequest, force: bool) -> TargetState {
        let fetching = TargetState::with(TargetPhase::Fetching, request.fallback.clone());
        self.apply(generation, RequestUpdate::Replace(request.clone()), fetching).await;

        let key = QueryKey::new(&self.paths.normalize(&request.href));
        let request_path = self.paths.request_path(&request.href);
        let fetch = self.fetch.clone();
        let fetcher = move || async move { Ok(fetch.get_json(&request_path).await?.unwrap_or(Value::Null)) };

        debug!(target: "forms", "Fetching form target {}", request.href);
        let result = if force {
            self.cache.refetch(&key, fetcher).await
        } else {
            self.cache.fetch(&key, self.stale_time, fetcher).await
        };

        let state = match result {
            Ok(data) => TargetState::with(TargetPhase::Ready, Some(data)),
            Err(error) if error.is_status(SUPPRESSED_STATUSES) => {
                debug!(target: "forms", "Target {} not readable ({error}), using current data", request.href);
                TargetState::with(TargetPhase::SuppressedError, request.fallback.clone())
            }
            Err(error) => {
                warn!(target: "forms", "Failed to load form target {}: {error}", request.href);
                TargetState {
                    phase: TargetPhase::Error,
                    data: request.fallback.clone(),
                    error: Some(error),
                }
            }
        };
        self.apply(generation, RequestUpdate::Keep, state).await
    }
}
