//! Manage the client configuration file.
//!
//! ```bash
//! klabis config init --base-url https://api.klabis.example
//! klabis config set access-token "$TOKEN"
//! klabis config show
//! klabis config path
//! ```
//!
//! `show` masks the access token.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::CliConfig;
use crate::config::{ClientConfig, ClientConfigManager};

/// Arguments for `klabis config`. Defaults to `show`.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Write a configuration file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// API server base URL to record
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the effective configuration
    Show,

    /// Change one setting
    Set {
        /// One of: base-url, api-prefix, behind-api-prefix, access-token, request-timeout-secs
        key: String,
        value: String,
    },

    /// Print the configuration file location
    Path,
}

const TOKEN_MASK: &str = "********";

fn resolve_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => ClientConfig::default_path(),
    }
}

impl ConfigCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let path = resolve_path(cli.config_path.as_deref())?;
        match self.command {
            Some(ConfigSubcommands::Init {
                force,
                base_url,
            }) => Self::init(&path, force, base_url).await,
            Some(ConfigSubcommands::Show) | None => Self::show(&path).await,
            Some(ConfigSubcommands::Set {
                key,
                value,
            }) => Self::set(&path, &key, &value).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
        }
    }

    async fn init(path: &Path, force: bool, base_url: Option<String>) -> Result<()> {
        if path.exists() && !force {
            println!("❌ Config already exists at: {}", path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let mut config = ClientConfig::default();
        if let Some(base_url) = base_url {
            config.base_url = base_url;
        }
        config.validate()?;
        config.save_to(path).await?;

        println!("✅ Created config at: {}", path.display());
        println!("\n{}", toml::to_string_pretty(&config)?);
        println!("{}", "Next steps:".yellow());
        println!("  Set a token with: klabis config set access-token <TOKEN>");
        Ok(())
    }

    async fn show(path: &Path) -> Result<()> {
        let mut config = ClientConfig::load_with_optional(Some(path.to_path_buf())).await?;
        if config.access_token.is_some() {
            config.access_token = Some(TOKEN_MASK.to_string());
        }

        println!("{}", "Client Configuration".bold());
        println!("Location: {}", path.display());
        if !path.exists() {
            println!("{}", "(file not found, showing defaults)".dimmed());
        }
        println!("\n{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    async fn set(path: &Path, key: &str, value: &str) -> Result<()> {
        let mut manager = ClientConfigManager::with_path(path.to_path_buf());
        let config = manager.get_mut().await?;
        apply_setting(config, key, value)?;
        config.validate()?;
        manager.save().await?;

        let shown = if key == "access-token" { TOKEN_MASK } else { value };
        println!("✅ Set {} = {}", key.green(), shown);
        Ok(())
    }
}

fn apply_setting(config: &mut ClientConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "base-url" => config.base_url = value.to_string(),
        "api-prefix" => config.api_prefix = value.to_string(),
        "behind-api-prefix" => {
            config.behind_api_prefix = value.parse().with_context(|| format!("Expected true or false, got '{value}'"))?;
        }
        "access-token" => config.access_token = Some(value.to_string()).filter(|t| !t.is_empty()),
        "request-timeout-secs" => {
            config.request_timeout_secs =
                value.parse().with_context(|| format!("Expected a number of seconds, got '{value}'"))?;
        }
        other => bail!("Unknown setting '{other}'"),
    }
    Ok(())
}
