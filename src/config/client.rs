//! Client configuration management.
//!
//! The client configuration file stores the API location, the path prefix
//! layout of the deployment, an optional static access token and staleness
//! overrides for the query cache. It lives outside any project directory
//! because it may contain credentials.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.klabis/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\klabis\config.toml`
//! - **Override**: the `KLABIS_CONFIG_PATH` environment variable
//!
//! # File Format
//!
//! ```toml
//! base_url = "https://klabis.example.org"
//! api_prefix = "/api"
//! behind_api_prefix = true
//! access_token = "eyJhbGciOi..."
//! request_timeout_secs = 30
//!
//! [stale]
//! resource_secs = 300
//! options_secs = 300
//! collection_secs = 30
//! target_secs = 0
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use klabis_hal::config::ClientConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::load().await?;
//! let paths = config.api_paths();
//! println!("requests go to {}", paths.request_path("/members"));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    COLLECTION_STALE_TIME, CONFIG_PATH_ENV, DEFAULT_API_PREFIX, DEFAULT_REQUEST_TIMEOUT_SECS,
    OPTIONS_STALE_TIME, RESOURCE_STALE_TIME, TARGET_DATA_STALE_TIME,
};
use crate::core::HalError;
use crate::hal::ApiPaths;

/// Client configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the API server.
    pub base_url: String,

    /// Path prefix segment under which the API is mounted.
    pub api_prefix: String,

    /// Whether request paths keep the API prefix.
    ///
    /// `false` is the "production" layout where the API is served at the
    /// root and prefixed hrefs must be stripped before requesting them.
    pub behind_api_prefix: bool,

    /// Static bearer token, used when no other token provider is supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Staleness windows for the query cache.
    pub stale: StaleTimes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            behind_api_prefix: true,
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stale: StaleTimes::default(),
        }
    }
}

/// Per-query-kind staleness windows, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StaleTimes {
    pub resource_secs: u64,
    pub options_secs: u64,
    pub collection_secs: u64,
    pub target_secs: u64,
}

impl Default for StaleTimes {
    fn default() -> Self {
        Self {
            resource_secs: RESOURCE_STALE_TIME.as_secs(),
            options_secs: OPTIONS_STALE_TIME.as_secs(),
            collection_secs: COLLECTION_STALE_TIME.as_secs(),
            target_secs: TARGET_DATA_STALE_TIME.as_secs(),
        }
    }
}

impl StaleTimes {
    #[must_use]
    pub const fn resource(&self) -> Duration {
        Duration::from_secs(self.resource_secs)
    }

    #[must_use]
    pub const fn options(&self) -> Duration {
        Duration::from_secs(self.options_secs)
    }

    #[must_use]
    pub const fn collection(&self) -> Duration {
        Duration::from_secs(self.collection_secs)
    }

    #[must_use]
    pub const fn target(&self) -> Duration {
        Duration::from_secs(self.target_secs)
    }
}

impl ClientConfig {
    /// Load from the default location, or return defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, else from the default location.
    ///
    /// A missing file yields [`ClientConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        Self::load_or_default(&path).await
    }

    async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            tracing::debug!(target: "config", "No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML or
    /// fails [`ClientConfig::validate`].
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read client config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse client config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration, creating parent directories.
    ///
    /// On Unix the file is restricted to the owner (0600) since it may hold a
    /// token.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize client config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write client config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform default config path, honoring `KLABIS_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("klabis")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".klabis")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Check that the base URL parses and the prefix is a path segment.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidUrl`] or [`HalError::Config`].
    pub fn validate(&self) -> Result<(), HalError> {
        self.parsed_base_url()?;
        if !self.api_prefix.is_empty()
            && (!self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/'))
        {
            return Err(HalError::Config {
                message: format!(
                    "api_prefix must start with '/' and not end with '/', got '{}'",
                    self.api_prefix
                ),
            });
        }
        Ok(())
    }

    /// Parsed [`ClientConfig::base_url`].
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidUrl`] when the URL does not parse.
    pub fn parsed_base_url(&self) -> Result<reqwest::Url, HalError> {
        reqwest::Url::parse(&self.base_url).map_err(|e| HalError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Path translation rules for this deployment.
    #[must_use]
    pub fn api_paths(&self) -> ApiPaths {
        ApiPaths::new(self.api_prefix.clone(), self.behind_api_prefix)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Lazily loads and caches a [`ClientConfig`] for one file path.
pub struct ClientConfigManager {
    config: Option<ClientConfig>,
    path: PathBuf,
}

impl ClientConfigManager {
    /// Manager for the default config path.
    ///
    /// # Errors
    ///
    /// Returns an error if the default path cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: None,
            path: ClientConfig::default_path()?,
        })
    }

    #[must_use]
    pub const fn with_path(path: PathBuf) -> Self {
        Self {
            config: None,
            path,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached configuration, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub async fn get(&mut self) -> Result<&ClientConfig> {
        Ok(&*self.get_mut().await?)
    }

    /// Mutable cached configuration, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub async fn get_mut(&mut self) -> Result<&mut ClientConfig> {
        let config = match self.config.take() {
            Some(config) => config,
            None => ClientConfig::load_or_default(&self.path).await?,
        };
        Ok(self.config.insert(config))
    }

    /// Persist the cached configuration, if one was loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn save(&self) -> Result<()> {
        if let Some(config) = &self.config {
            config.save_to(&self.path).await?;
        }
        Ok(())
    }

    /// Drop the cached value and read the file again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub async fn reload(&mut self) -> Result<()> {
        self.config = Some(ClientConfig::load_or_default(&self.path).await?);
        Ok(())
    }
}
