//! klabis-hal - HAL-FORMS client engine
//!
//! A client for hypermedia APIs that speak HAL with HAL-FORMS templates. The
//! server decides which actions are available; this crate discovers them from
//! `_links` and `_templates`, turns templates into validated form state and
//! submits the result back through the link graph.
//!
//! # Architecture Overview
//!
//! Every component shares three things: an [`http::AuthorizedFetch`] that
//! attaches bearer tokens, a [`query::QueryCache`] that deduplicates and
//! caches GET requests, and [`hal::ApiPaths`] that map hrefs between the
//! navigation namespace and the request namespace.
//!
//! - A [`route::RouteResource`] binds the current navigation path to the
//!   resource behind it.
//! - A [`forms::FormRequestController`] holds which template (if any) is open.
//! - A [`forms::FormDisplay`] reacts to that request: it resolves options and
//!   target data, builds a [`forms::FormSession`], renders fields through a
//!   [`forms::FieldRegistry`] and submits via [`forms::SubmissionPipeline`].
//!
//! # Core Modules
//!
//! - [`hal`] - HAL and HAL-FORMS document model, path normalization
//! - [`http`] - authorized JSON requests and error classification
//! - [`query`] - keyed request cache with in-flight deduplication
//! - [`forms`] - options, validation, field rendering, target data, submission
//! - [`route`] - route-bound resource context and collection queries
//! - [`client`] - wiring of the shared pieces
//!
//! ## Supporting Modules
//! - [`config`] - TOML client configuration
//! - [`core`] - error types and user-facing error context
//! - [`constants`] - staleness windows and media types
//! - [`cli`] - the `klabis` command-line interface
//! - [`utils`] - terminal progress
//!
//! # Logging
//!
//! Components log through `tracing` under the targets `http`, `query`,
//! `hal`, `forms` and `route`:
//!
//! ```bash
//! RUST_LOG=query=debug,forms=trace klabis show /members
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod forms;
pub mod hal;
pub mod http;
pub mod query;
pub mod route;
pub mod utils;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
