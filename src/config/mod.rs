//! Configuration for the HAL-FORMS client.
//!
//! A single TOML file ([`ClientConfig`]) describes where the API lives, how
//! the deployment lays out its path prefix and how long cached queries stay
//! fresh. Command-line flags override individual fields at startup.
//!
//! See [`client`] for the file format and location rules.

pub mod client;

pub use client::{ClientConfig, ClientConfigManager, StaleTimes};
