// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transport seam between the sync client and the connection manager.

use crate::config::{ConfigError, Route, SyncConfig};
use async_trait::async_trait;
use fpai_topology_graph::port::PortRef;
use fpai_topology_graph::snapshot::{CurrentState, GraphSnapshot};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Body of the connect and disconnect commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Source port, `endpointId:portId`
    pub source: PortRef,
    /// Target port, `endpointId:portId`
    pub target: PortRef,
}

/// Reads and commands against the connection manager
#[async_trait]
pub trait TopologyTransport: Send + Sync {
    /// Fetch the topology graph
    async fn fetch_graph(&self) -> Result<GraphSnapshot, TransportError>;

    /// Fetch the endpoint/port state
    async fn fetch_state(&self) -> Result<CurrentState, TransportError>;

    /// Ask the server to wire every unambiguous pair; returns the raw answer
    async fn autoconnect(&self) -> Result<String, TransportError>;

    /// Connect two ports; `false` when the server refused
    async fn connect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError>;

    /// Disconnect two ports; `false` when the server refused
    async fn disconnect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError>;
}

/// Error talking to the connection manager
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("status: {status} {reason}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Status reason text
        reason: String,
    },

    /// Request could not be sent or the body not received
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Body is not the expected JSON
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport could not be configured
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
struct Routes {
    graph: Url,
    state: Url,
    autoconnect: Url,
    connect: Url,
    disconnect: Url,
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    routes: Routes,
}

impl HttpTransport {
    /// Build a transport; every route URL is resolved up front
    pub fn new(config: &SyncConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let routes = Routes {
            graph: config.url(Route::Graph)?,
            state: config.url(Route::State)?,
            autoconnect: config.url(Route::Autoconnect)?,
            connect: config.url(Route::Connect)?,
            disconnect: config.url(Route::Disconnect)?,
        };
        tracing::debug!(base_url = %config.base_url, "http transport ready");
        Ok(Self { client, routes })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        let body = checked_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_connection(&self, url: &Url, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
        let info = ConnectionInfo {
            source: source.clone(),
            target: target.clone(),
        };
        let response = self.client.post(url.clone()).json(&info).send().await?;
        let body = checked_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Body text of a successful response, or the status as error
async fn checked_body(response: reqwest::Response) -> Result<String, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    Ok(response.text().await?)
}

#[async_trait]
impl TopologyTransport for HttpTransport {
    async fn fetch_graph(&self) -> Result<GraphSnapshot, TransportError> {
        self.get_json(&self.routes.graph).await
    }

    async fn fetch_state(&self) -> Result<CurrentState, TransportError> {
        self.get_json(&self.routes.state).await
    }

    async fn autoconnect(&self) -> Result<String, TransportError> {
        let response = self.client.post(self.routes.autoconnect.clone()).send().await?;
        checked_body(response).await
    }

    async fn connect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
        self.post_connection(&self.routes.connect, source, target).await
    }

    async fn disconnect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
        self.post_connection(&self.routes.disconnect, source, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_wire_form() {
        let info = ConnectionInfo {
            source: PortRef::new("org.example.PowerManager.pm", "timeshifter"),
            target: PortRef::new("org.example.Dishwasher.dw", "controller"),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": "org.example.PowerManager.pm:timeshifter",
                "target": "org.example.Dishwasher.dw:controller",
            })
        );
    }

    #[test]
    fn test_status_error_message() {
        let error = TransportError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(error.to_string(), "status: 503 Service Unavailable");
    }

    #[test]
    fn test_http_transport_rejects_bad_base_url() {
        let config = SyncConfig {
            base_url: "::".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::Config(ConfigError::InvalidUrl { .. }))
        ));
    }
}
