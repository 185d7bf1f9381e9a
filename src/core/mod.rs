//! Core error types for the HAL-FORMS client
//!
//! Every layer of the engine reports failures through [`HalError`]. The CLI
//! boundary converts any [`anyhow::Error`] into an [`ErrorContext`] with
//! [`user_friendly_error`], which adds colored details and suggestions.
//!
//! ## Propagation policy
//!
//! - Fetch and query primitives return `Err(HalError)`
//! - Option resolution, target-data resolution and submission fold errors into
//!   state values (`{data, error}`) instead of failing
//! - Only the top-level driver turns errors into a process exit

pub mod error;

pub use error::{ErrorContext, HalError, HttpError, ValidationProblem, user_friendly_error};

/// Result alias used throughout the library.
pub type HalResult<T> = std::result::Result<T, HalError>;
