//! Command-line interface for klabis-hal.
//!
//! The `klabis` binary drives the engine against a live API: it loads the
//! resource behind a navigation path, opens HAL-FORMS templates, fills and
//! submits them, and inspects option lists.
//!
//! # Available Commands
//!
//! - `show` - Load a resource (or a page of a collection) and print it
//! - `form` - Open a template, optionally fill and submit it
//! - `options` - Resolve the option lists of a template
//! - `config` - Manage the client configuration file
//!
//! # Examples
//!
//! ```bash
//! klabis show /members
//! klabis show /members --collection memberList --page 1 --sort lastName
//! klabis form /members create --set firstName=Jan --set lastName=Novák --submit
//! klabis --token "$TOKEN" options /members create
//! klabis config init
//! ```
//!
//! # Global Options
//!
//! - `--config` - Alternate configuration file
//! - `--base-url` / `--token` - Override configured connection settings
//! - `--verbose` / `--quiet` - Log level
//! - `--no-progress` - Disable the spinner

mod config;
mod form;
mod options;
mod output;
mod show;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::client::HalClient;
use crate::config::ClientConfig;
use crate::utils::Spinner;

pub use config::ConfigCommand;
pub use form::FormCommand;
pub use options::OptionsCommand;
pub use show::ShowCommand;

/// Settings derived from global flags, handed to each command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps `RUST_LOG` or stays silent.
    pub log_level: Option<String>,

    /// Disable the spinner.
    pub no_progress: bool,

    /// Alternate configuration file.
    pub config_path: Option<PathBuf>,

    /// Overrides [`ClientConfig::base_url`].
    pub base_url: Option<String>,

    /// Overrides [`ClientConfig::access_token`].
    pub token: Option<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_no_progress(mut self, no_progress: bool) -> Self {
        self.no_progress = no_progress;
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Install the global tracing subscriber.
    ///
    /// Silently does nothing when a subscriber is already set.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
            None => return,
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    }

    /// Load the configuration file and apply flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub async fn load_client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load_with_optional(self.config_path.clone()).await?;
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(token) = &self.token {
            config.access_token = Some(token.clone());
        }
        Ok(config)
    }

    /// Client built from the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable or invalid configuration.
    pub async fn client(&self) -> Result<HalClient> {
        let config = self.load_client_config().await?;
        HalClient::from_config(&config, None).context("Failed to set up the API client")
    }

    #[must_use]
    pub fn spinner(&self) -> Spinner {
        Spinner::new(self.no_progress)
    }
}

/// Hypermedia client for HAL-FORMS APIs.
#[derive(Parser)]
#[command(
    name = "klabis",
    about = "HAL-FORMS client - browse resources and submit server-described forms",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternate configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API server base URL, overriding the configuration.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token, overriding the configuration.
    #[arg(long, global = true, env = "KLABIS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Disable the progress spinner.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the resource behind a navigation path
    Show(ShowCommand),

    /// Open a form template, optionally fill and submit it
    Form(FormCommand),

    /// Resolve the option lists of a form template
    Options(OptionsCommand),

    /// Manage the configuration file
    Config(ConfigCommand),
}

impl Cli {
    /// Run the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the failing command's error.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
        }
    }

    /// Run the command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the failing command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Show(cmd) => cmd.execute(&config).await,
            Commands::Form(cmd) => cmd.execute(&config).await,
            Commands::Options(cmd) => cmd.execute(&config).await,
            Commands::Config(cmd) => cmd.execute(&config).await,
        }
    }
}
