// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the topology.

use crate::port::PortRef;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// `sourceUuid-targetUuid`, each side `endpointId:portId` with a word-character port
static CONNECTION_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+:\w+)-(.+:\w+)$").expect("connection key pattern is valid")
});

/// Identifier of a connection, its wire key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wire key for the connection between two ports
    pub fn between(source: &PortRef, target: &PortRef) -> Self {
        Self(format!("{source}-{target}"))
    }

    /// Raw key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connection between two ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Wire key
    pub id: ConnectionId,
    /// Source port
    pub source: PortRef,
    /// Target port
    pub target: PortRef,
    /// Whether the server reports the connection as live
    pub is_connected: bool,
}

impl Connection {
    /// Create a new connection
    pub fn new(source: PortRef, target: PortRef, is_connected: bool) -> Self {
        Self {
            id: ConnectionId::between(&source, &target),
            source,
            target,
            is_connected,
        }
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, port: &PortRef) -> bool {
        self.source == *port || self.target == *port
    }

    /// Check if this connection joins the two ports, in either direction
    pub fn joins(&self, a: &PortRef, b: &PortRef) -> bool {
        (self.source == *a && self.target == *b) || (self.source == *b && self.target == *a)
    }
}

/// Split an active-connection key into its two port references
pub fn parse_connection_key(key: &str) -> Result<(PortRef, PortRef), ConnectionKeyError> {
    let caps = CONNECTION_KEY_PATTERN
        .captures(key)
        .ok_or_else(|| ConnectionKeyError(key.to_string()))?;
    let source = caps[1].parse().map_err(|_| ConnectionKeyError(key.to_string()))?;
    let target = caps[2].parse().map_err(|_| ConnectionKeyError(key.to_string()))?;
    Ok((source, target))
}

/// An active-connection key that is not `endpoint:port-endpoint:port`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed connection key: {0:?}")]
pub struct ConnectionKeyError(pub String);
