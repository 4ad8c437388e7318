// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions: connection points on an endpoint.

use crate::endpoint_id::EndpointId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of a port, `endpointId:portId` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRef {
    /// Owning endpoint
    pub endpoint: EndpointId,
    /// Port name, unique within the endpoint
    pub port: String,
}

impl PortRef {
    /// Create a new port reference
    pub fn new(endpoint: impl Into<EndpointId>, port: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint, self.port)
    }
}

impl FromStr for PortRef {
    type Err = PortRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Endpoint ids may contain ':' themselves, ports never do
        let (endpoint, port) = s
            .rsplit_once(':')
            .ok_or_else(|| PortRefError(s.to_string()))?;
        if endpoint.is_empty() || port.is_empty() {
            return Err(PortRefError(s.to_string()));
        }
        Ok(Self::new(endpoint, port))
    }
}

impl TryFrom<String> for PortRef {
    type Error = PortRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortRef> for String {
    fn from(value: PortRef) -> Self {
        value.to_string()
    }
}

/// A port reference that is not of the form `endpointId:portId`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed port reference: {0:?}")]
pub struct PortRefError(pub String);

/// Connection cap of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MaxConnections {
    /// Any number of connections (`-1` on the wire)
    Unbounded,
    /// At most one connection
    #[default]
    Single,
    /// At most this many connections
    Limited(u32),
}

impl MaxConnections {
    /// Cap derived from the server's `isMultiple` flag
    pub fn from_multiple(is_multiple: bool) -> Self {
        if is_multiple {
            Self::Unbounded
        } else {
            Self::Single
        }
    }

    /// Whether `count` existing connections leave room for one more
    pub fn allows(&self, count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Single => count < 1,
            Self::Limited(max) => count < *max as usize,
        }
    }
}

impl From<i32> for MaxConnections {
    fn from(value: i32) -> Self {
        match value {
            v if v < 0 => Self::Unbounded,
            0 | 1 => Self::Single,
            v => Self::Limited(v.unsigned_abs()),
        }
    }
}

impl From<MaxConnections> for i32 {
    fn from(value: MaxConnections) -> Self {
        match value {
            MaxConnections::Unbounded => -1,
            MaxConnections::Single => 1,
            MaxConnections::Limited(max) => i32::try_from(max).unwrap_or(i32::MAX),
        }
    }
}

/// Paint attributes of a port (not business relevant)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortStyle {
    /// Fill color
    pub fill: [u8; 3],
    /// Stroke color
    pub stroke: [u8; 3],
    /// Dot radius
    pub radius: f32,
    /// Stroke width
    pub line_width: f32,
}

impl Default for PortStyle {
    fn default() -> Self {
        Self {
            fill: [122, 193, 3],
            stroke: [122, 193, 3],
            radius: 7.5,
            line_width: 3.0,
        }
    }
}

/// Transient visual type applied to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortVisualType {
    /// Port cannot accept the connection currently being dragged
    Disabled,
}

impl PortVisualType {
    /// Stroke color override for this type
    pub fn stroke(&self) -> [u8; 3] {
        match self {
            Self::Disabled => [220, 40, 40],
        }
    }
}

/// A port on an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Address of this port
    pub key: PortRef,
    /// Ports this one may legally connect to; fixed for the endpoint's lifetime
    potential_targets: IndexSet<PortRef>,
    /// Connection cap
    pub max_connections: MaxConnections,
    /// Paint attributes
    pub style: PortStyle,
    /// Whether the port currently accepts drags and drops
    pub enabled: bool,
    /// Transient visual type, cleared when a drag ends
    pub visual_type: Option<PortVisualType>,
}

impl Port {
    /// Create a new port with the given potential targets
    pub fn new(
        key: PortRef,
        potential_targets: impl IntoIterator<Item = PortRef>,
        max_connections: MaxConnections,
    ) -> Self {
        Self {
            key,
            potential_targets: potential_targets.into_iter().collect(),
            max_connections,
            style: PortStyle::default(),
            enabled: true,
            visual_type: None,
        }
    }

    /// Set the paint attributes
    pub fn with_style(mut self, style: PortStyle) -> Self {
        self.style = style;
        self
    }

    /// Ports this one may connect to
    pub fn potential_targets(&self) -> &IndexSet<PortRef> {
        &self.potential_targets
    }

    /// Check if a connection to another port is declared legal
    pub fn can_connect(&self, other: &PortRef) -> bool {
        self.potential_targets.contains(other)
    }

    /// Enable the port and drop any transient visual type
    pub fn reset(&mut self) {
        self.enabled = true;
        self.visual_type = None;
    }

    /// Effective stroke color, taking the visual type into account
    pub fn stroke(&self) -> [u8; 3] {
        self.visual_type.map_or(self.style.stroke, |t| t.stroke())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ref_round_trip() {
        let port: PortRef = "org.example.Manager.1:controller".parse().unwrap();
        assert_eq!(port.endpoint.as_str(), "org.example.Manager.1");
        assert_eq!(port.port, "controller");
        assert_eq!(port.to_string(), "org.example.Manager.1:controller");
    }

    #[test]
    fn test_port_ref_splits_at_last_colon() {
        let port: PortRef = "host:8080:driver".parse().unwrap();
        assert_eq!(port.endpoint.as_str(), "host:8080");
        assert_eq!(port.port, "driver");
    }

    #[test]
    fn test_malformed_port_ref() {
        assert!("no-colon".parse::<PortRef>().is_err());
        assert!(":port".parse::<PortRef>().is_err());
        assert!("endpoint:".parse::<PortRef>().is_err());
    }

    #[test]
    fn test_max_connections_wire_values() {
        assert_eq!(MaxConnections::from(-1), MaxConnections::Unbounded);
        assert_eq!(MaxConnections::from(1), MaxConnections::Single);
        assert_eq!(MaxConnections::from(3), MaxConnections::Limited(3));
        assert_eq!(i32::from(MaxConnections::Unbounded), -1);
        assert_eq!(MaxConnections::from_multiple(false), MaxConnections::Single);
    }

    #[test]
    fn test_max_connections_allows() {
        assert!(MaxConnections::Unbounded.allows(100));
        assert!(MaxConnections::Single.allows(0));
        assert!(!MaxConnections::Single.allows(1));
        assert!(MaxConnections::Limited(2).allows(1));
        assert!(!MaxConnections::Limited(2).allows(2));
    }

    #[test]
    fn test_port_reset_clears_disabled_type() {
        let mut port = Port::new(PortRef::new("a", "out"), [], MaxConnections::Single);
        port.enabled = false;
        port.visual_type = Some(PortVisualType::Disabled);
        assert_eq!(port.stroke(), PortVisualType::Disabled.stroke());

        port.reset();
        assert!(port.enabled);
        assert_eq!(port.visual_type, None);
        assert_eq!(port.stroke(), PortStyle::default().stroke);
    }
}
