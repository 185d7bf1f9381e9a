//! Utility modules for the command-line surface.
//!
//! - [`progress`] - spinner shown while requests are in flight

pub mod progress;

pub use progress::Spinner;
