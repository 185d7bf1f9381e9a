//! Global constants used throughout the client engine.
//!
//! This module contains staleness windows, timeouts, media types and path
//! prefixes that are shared across the query, form and route layers.
//! Defining them centrally keeps the defaults discoverable and lets
//! [`crate::config::ClientConfig`] override them in one place.

use std::time::Duration;

/// Default API path prefix segment (`/api`).
///
/// Deployments that serve the API behind this prefix keep it in request
/// paths; navigation paths never carry it.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Staleness window for the resource bound to the current route (5 minutes).
pub const RESOURCE_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Staleness window for link-based option lists (5 minutes).
///
/// Option sets rarely change while a form is open.
pub const OPTIONS_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Staleness window for paginated collection queries (30 seconds).
pub const COLLECTION_STALE_TIME: Duration = Duration::from_secs(30);

/// Staleness window for form target-data fetches.
///
/// Zero means every form open refetches its target.
pub const TARGET_DATA_STALE_TIME: Duration = Duration::ZERO;

/// Maximum time a waiter parks on another request for the same cache key (30 seconds).
///
/// After this the waiter issues its own request instead of waiting forever on
/// a leader that may have hung.
pub const PENDING_STATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Media type for JSON request and response bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media type of RFC 7807 problem responses carrying field validation errors.
pub const PROBLEM_JSON_CONTENT_TYPE: &str = "application/problem+json";

/// Default `Accept` header: HAL-FORMS first, then plain HAL and JSON.
pub const ACCEPT_MEDIA_TYPES: &str =
    "application/prs.hal-forms+json, application/hal+json;q=0.9, application/json;q=0.8";

/// Navigation path prefixes that never have a backing HAL resource.
pub const UNFETCHED_ROUTE_PREFIXES: &[&str] = &["/login", "/auth/callback"];

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "KLABIS_CONFIG_PATH";

/// Environment variable that disables the CLI spinner when set.
pub const NO_PROGRESS_ENV: &str = "KLABIS_NO_PROGRESS";
