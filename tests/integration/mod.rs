//! Integration test suite for klabis-hal
//!
//! Every test runs the engine against a `wiremock` server, so real HTTP
//! requests, headers and status codes are exercised without a backend.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=query=debug,forms=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **authorized_fetch**: bearer tokens, status errors, body handling
//! - **config_file**: configuration persistence
//! - **form_submission**: submit ordering, server validation errors
//! - **member_registration**: full open, fill, submit flow
//! - **option_resolution**: linked options and request deduplication
//! - **route_resource**: route-bound loading, subresources, collections
//! - **target_data**: target fetches and error suppression

mod common;

mod authorized_fetch;
mod config_file;
mod form_submission;
mod member_registration;
mod option_resolution;
mod route_resource;
mod target_data;
