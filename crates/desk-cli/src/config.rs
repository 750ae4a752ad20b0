//! Console configuration.
//!
//! Resolved in order: built-in defaults, then the optional TOML file, then
//! command-line flags and environment variables.

use std::path::Path;
use std::time::Duration;

use desk_collection::CollectionConfig;
use desk_tail::TailConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;
use crate::error::CliError;

/// Main console configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Console API base URL (`http://` or `https://`).
    pub server: String,
    /// API token sent as a bearer token.
    pub token: Option<String>,
    /// Rows per page for list commands.
    pub page_size: u32,
    /// Deadline for one page request, in seconds.
    pub request_timeout_secs: u64,
    /// Wait before reopening a dropped live stream, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Maximum entries kept by a live tail (unbounded if unset).
    pub buffer_capacity: Option<usize>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            token: None,
            page_size: desk_collection::config::DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            reconnect_delay_ms: 1000,
            buffer_capacity: None,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration for a parsed command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or the result is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(server) = &cli.server {
            config.server.clone_from(server);
        }
        if let Some(token) = &cli.token {
            config.token = Some(token.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.server.is_empty() {
            return Err(CliError::Config("server cannot be empty".to_string()));
        }

        let url = Url::parse(&self.server)
            .map_err(|e| CliError::Config(format!("invalid server URL '{}': {e}", self.server)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CliError::Config(
                "server must start with http:// or https://".to_string(),
            ));
        }

        if self.page_size == 0 {
            return Err(CliError::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_delay_ms == 0 {
            return Err(CliError::Config(
                "reconnect_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.buffer_capacity == Some(0) {
            return Err(CliError::Config(
                "buffer_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL does not parse.
    pub fn server_url(&self) -> Result<Url, CliError> {
        Url::parse(&self.server)
            .map_err(|e| CliError::Config(format!("invalid server URL '{}': {e}", self.server)))
    }

    /// WebSocket base URL derived from the server URL (`ws://` or `wss://`).
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL does not parse.
    pub fn websocket_url(&self) -> Result<Url, CliError> {
        let mut url = self.server_url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| CliError::Config(format!("cannot derive websocket URL from '{}'", self.server)))?;
        Ok(url)
    }

    /// Request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Collection controller configuration for list commands.
    #[must_use]
    pub fn collection_config(&self) -> CollectionConfig {
        CollectionConfig::default().with_page_size(self.page_size)
    }

    /// Live tail configuration.
    #[must_use]
    pub fn tail_config(&self) -> TailConfig {
        let config =
            TailConfig::default().with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms));
        match self.buffer_capacity {
            Some(capacity) => config.with_buffer_capacity(capacity),
            None => config,
        }
    }
}
