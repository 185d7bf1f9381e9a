//! Test utilities for klabis-hal
//!
//! This module provides helpers shared by unit and integration tests:
//! logging setup, HAL document fixtures and a token provider that records
//! how often it was asked.
//!
//! # Example
//!
//! ```rust,no_run
//! use klabis_hal::test_utils::{fixtures, init_test_logging};
//!
//! init_test_logging(None);
//! let members = fixtures::member_collection("http://localhost:8080");
//! assert!(members["_templates"]["create"].is_object());
//! ```

pub mod fixtures;

use async_trait::async_trait;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::HalError;
use crate::http::AccessTokenProvider;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=query=debug,forms=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show targets like "query" and "forms"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Token provider that counts lookups.
#[derive(Debug, Default)]
pub struct MockTokenProvider {
    token: Option<String>,
    calls: AtomicUsize,
}

impl MockTokenProvider {
    #[must_use]
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenProvider for MockTokenProvider {
    async fn access_token(&self) -> Result<Option<String>, HalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}
