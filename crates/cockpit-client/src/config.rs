//! Session configuration loaded from TOML.
//!
//! ```toml
//! url = "wss://server:9090/cockpit/socket"
//! no_verification = true
//! connect_timeout_secs = 10
//! bus = "system"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;
use crate::remote::Bus;
use crate::transport::WebSocketOptions;

/// Where and how to connect. Only `url` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub url: String,
    /// Skip TLS certificate validation.
    #[serde(default)]
    pub no_verification: bool,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default)]
    pub bus: Bus,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        SessionConfig {
            url: url.into(),
            no_verification: false,
            connect_timeout_secs: None,
            read_timeout_secs: None,
            bus: Bus::default(),
        }
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<SessionConfig, ClientError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<SessionConfig, ClientError> {
        let config: SessionConfig = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse configuration: {}", e)))?;
        cockpit_http::parse_url(&config.url)?;
        Ok(config)
    }

    /// Transport options for this configuration. Zero timeouts mean none.
    pub fn websocket_options(&self) -> WebSocketOptions {
        let secs = |s: Option<u64>| s.filter(|&s| s > 0).map(Duration::from_secs);
        WebSocketOptions {
            verify_tls: !self.no_verification,
            connect_timeout: secs(self.connect_timeout_secs),
            read_timeout: secs(self.read_timeout_secs),
        }
    }
}
