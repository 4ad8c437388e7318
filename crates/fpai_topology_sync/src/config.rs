// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sync configuration, stored as RON.
//!
//! ```ron
//! (
//!     base_url: "http://localhost:8080/system/console/fpai-connection-manager/",
//!     poll_interval_ms: 1000,
//!     retry_interval_ms: 10000,
//! )
//! ```
//!
//! Missing fields take their defaults, a missing file yields the default
//! configuration, and `FPAI_BASE_URL` overrides `base_url`.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`SyncConfig::base_url`]
pub const BASE_URL_ENV: &str = "FPAI_BASE_URL";

/// Server routes of the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Topology graph for the viewer
    Graph,
    /// Endpoint/port state for the editor
    State,
    /// Automatic wiring command
    Autoconnect,
    /// Connect two ports
    Connect,
    /// Disconnect two ports
    Disconnect,
}

impl Route {
    /// All routes
    pub fn all() -> &'static [Route] {
        &[
            Route::Graph,
            Route::State,
            Route::Autoconnect,
            Route::Connect,
            Route::Disconnect,
        ]
    }
}

/// Connection settings of the sync client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL every route path is resolved against
    pub base_url: String,
    /// Path of the topology graph
    pub graph_path: String,
    /// Path of the editor state
    pub state_path: String,
    /// Path of the autoconnect command
    pub autoconnect_path: String,
    /// Path of the connect command
    pub connect_path: String,
    /// Path of the disconnect command
    pub disconnect_path: String,
    /// Delay between polls after a successful fetch
    pub poll_interval_ms: u64,
    /// Delay between polls after a failed fetch
    pub retry_interval_ms: u64,
    /// Per-request timeout
    pub request_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/system/console/fpai-connection-manager/".to_string(),
            graph_path: "getGraph.json".to_string(),
            state_path: "currentState".to_string(),
            autoconnect_path: "autoconnect.json".to_string(),
            connect_path: "connect".to_string(),
            disconnect_path: "disconnect".to_string(),
            poll_interval_ms: 1000,
            retry_interval_ms: 10_000,
            request_timeout_ms: 5000,
        }
    }
}

impl SyncConfig {
    /// Load from a RON file, falling back to defaults when the file does not
    /// exist, then apply the environment override and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_ron(&content).map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no sync config found, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.override_base_url(std::env::var(BASE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a RON document
    pub fn from_ron(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|e| e.to_string())
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Replace `base_url` when an override is given
    pub fn override_base_url(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!(base_url = %url, "base url overridden from environment");
            self.base_url = url;
        }
    }

    /// Check intervals and that every route resolves to a URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_ms"));
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("retry_interval_ms"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("request_timeout_ms"));
        }
        for route in Route::all() {
            self.url(*route)?;
        }
        Ok(())
    }

    /// Path configured for a route
    pub fn path(&self, route: Route) -> &str {
        match route {
            Route::Graph => &self.graph_path,
            Route::State => &self.state_path,
            Route::Autoconnect => &self.autoconnect_path,
            Route::Connect => &self.connect_path,
            Route::Disconnect => &self.disconnect_path,
        }
    }

    /// Absolute URL of a route
    pub fn url(&self, route: Route) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        // Without a trailing slash `join` would replace the last segment
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        base.join(self.path(route)).map_err(|e| invalid(e.to_string()))
    }

    /// Delay between polls after success
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay between polls after failure
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Error loading or validating the sync configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file exists but cannot be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid RON
    #[error("Failed to parse {}: {message}", path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Base URL or a route path does not form a valid URL
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending base URL
        url: String,
        /// Reason
        reason: String,
    },

    /// An interval is zero
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.retry_interval(), Duration::from_secs(10));
        assert_eq!(
            config.url(Route::Graph).unwrap().as_str(),
            "http://localhost:8080/system/console/fpai-connection-manager/getGraph.json"
        );
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = SyncConfig::from_ron(r#"(base_url: "http://fpai.local/cm", poll_interval_ms: 250)"#).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.retry_interval_ms, 10_000);
        // Base without trailing slash still appends the path
        assert_eq!(
            config.url(Route::Connect).unwrap().as_str(),
            "http://fpai.local/cm/connect"
        );
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SyncConfig {
            poll_interval_ms: 500,
            ..Default::default()
        };
        let ron = config.to_ron().unwrap();
        assert_eq!(SyncConfig::from_ron(&ron).unwrap(), config);
    }

    #[test]
    fn test_override_base_url() {
        let mut config = SyncConfig::default();
        config.override_base_url(None);
        config.override_base_url(Some("  ".to_string()));
        assert_eq!(config.base_url, SyncConfig::default().base_url);

        config.override_base_url(Some("http://other:9000/".to_string()));
        assert_eq!(config.base_url, "http://other:9000/");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = SyncConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval("poll_interval_ms"))));

        let config = SyncConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("fpai_topology_missing_sync_config.ron");
        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = std::env::temp_dir().join(format!("fpai_topology_bad_{}.ron", std::process::id()));
        std::fs::write(&path, "(poll_interval_ms: \"fast\")").unwrap();
        let result = SyncConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
