// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire formats of the topology endpoints.
//!
//! - `getGraph` returns a [`GraphSnapshot`] for the read-only viewer.
//! - `currentState` returns a [`CurrentState`] for the connection editor.

use crate::endpoint::{EndpointSpec, EndpointStyle, PortSpec};
use crate::endpoint_id::EndpointId;
use crate::port::{MaxConnections, PortRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Wrapper used by the graph format around every element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element<T> {
    /// Element payload
    pub data: T,
}

impl<T> Element<T> {
    /// Wrap a payload
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Node payload of the graph format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Node id
    pub id: String,
    /// Display name; the id when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Any other attributes, shown in the details panel
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
    /// Create a node payload
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Name to display
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Edge payload of the graph format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Edge id
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Whether the server reports the edge as an active connection
    #[serde(default)]
    pub isconnected: bool,
    /// Any other attributes
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EdgeData {
    /// Create an edge payload
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        isconnected: bool,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            isconnected,
            extra: serde_json::Map::new(),
        }
    }
}

/// `getGraph` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<Element<NodeData>>,
    /// Edges
    #[serde(default)]
    pub edges: Vec<Element<EdgeData>>,
}

/// Port entry of the `currentState` format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortState {
    /// Port name
    pub id: String,
    /// `endpointId:portId` of every port this one may connect to
    #[serde(default)]
    pub potential_connections: Vec<String>,
    /// Whether the port accepts more than one connection
    #[serde(default)]
    pub is_multiple: bool,
}

/// Endpoint entry of the `currentState` format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointState {
    /// Endpoint id
    pub id: String,
    /// Ports
    #[serde(default)]
    pub ports: Vec<PortState>,
    /// `key = value` lines
    #[serde(default)]
    pub properties: Vec<String>,
    /// Style attributes
    #[serde(default)]
    pub style: IndexMap<String, String>,
}

/// `currentState` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    /// Endpoints
    #[serde(default)]
    pub endpoints: Vec<EndpointState>,
    /// Connection keys `sourceUuid-targetUuid` the server reports as live
    #[serde(default)]
    pub active_connections: Vec<String>,
}

impl CurrentState {
    /// Validate potential-target references and convert every endpoint into
    /// a registry declaration.
    ///
    /// A reference that is not `endpointId:portId`, or that names a port not
    /// declared in this snapshot, rejects the whole snapshot.
    pub fn validate(&self) -> Result<Vec<EndpointSpec>, SnapshotError> {
        let declared: HashSet<(&str, &str)> = self
            .endpoints
            .iter()
            .flat_map(|e| e.ports.iter().map(move |p| (e.id.as_str(), p.id.as_str())))
            .collect();

        let mut specs = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let mut spec = EndpointSpec::new(EndpointId::new(endpoint.id.clone()));
            spec.properties = endpoint.properties.clone();
            spec.style = endpoint
                .style
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<EndpointStyle>();

            for port in &endpoint.ports {
                let mut targets = Vec::with_capacity(port.potential_connections.len());
                for raw in &port.potential_connections {
                    let target: PortRef = raw.parse().map_err(|_| SnapshotError::MalformedTarget {
                        port: PortRef::new(endpoint.id.as_str(), port.id.as_str()),
                        target: raw.clone(),
                    })?;
                    if !declared.contains(&(target.endpoint.as_str(), target.port.as_str())) {
                        return Err(SnapshotError::DanglingTarget {
                            port: PortRef::new(endpoint.id.as_str(), port.id.as_str()),
                            target,
                        });
                    }
                    targets.push(target);
                }
                spec.ports.push(PortSpec::new(
                    port.id.clone(),
                    targets,
                    MaxConnections::from_multiple(port.is_multiple),
                ));
            }
            specs.push(spec);
        }
        Ok(specs)
    }
}

/// Error when a snapshot cannot be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Potential target is not `endpointId:portId`
    #[error("Port {port} lists malformed potential target {target:?}")]
    MalformedTarget {
        /// Port declaring the target
        port: PortRef,
        /// Raw reference
        target: String,
    },

    /// Potential target names a port missing from the snapshot
    #[error("Port {port} lists unknown potential target {target}")]
    DanglingTarget {
        /// Port declaring the target
        port: PortRef,
        /// Unknown reference
        target: PortRef,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE_JSON: &str = r#"{
        "endpoints": [
            {
                "id": "org.example.PowerManager.pm",
                "ports": [
                    {"id": "timeshifter", "potentialConnections": ["org.example.Dishwasher.dw:controller"], "isMultiple": true}
                ],
                "properties": ["mode = auto"],
                "style": {"width": "160px", "height": "80px"}
            },
            {
                "id": "org.example.Dishwasher.dw",
                "ports": [
                    {"id": "controller", "potentialConnections": ["org.example.PowerManager.pm:timeshifter"], "isMultiple": false}
                ]
            }
        ],
        "activeConnections": ["org.example.PowerManager.pm:timeshifter-org.example.Dishwasher.dw:controller"]
    }"#;

    #[test]
    fn test_parse_graph_snapshot() {
        let json = r#"{
            "nodes": [{"data": {"id": "n1", "name": "Manager", "kind": "manager"}}, {"data": {"id": "n2"}}],
            "edges": [{"data": {"id": "e1", "source": "n1", "target": "n2", "isconnected": true}},
                      {"data": {"id": "e2", "source": "n2", "target": "n1"}}]
        }"#;
        let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].data.display_name(), "Manager");
        assert_eq!(snapshot.nodes[0].data.extra["kind"], "manager");
        assert_eq!(snapshot.nodes[1].data.display_name(), "n2");
        assert!(snapshot.edges[0].data.isconnected);
        assert!(!snapshot.edges[1].data.isconnected);
    }

    #[test]
    fn test_parse_current_state() {
        let state: CurrentState = serde_json::from_str(STATE_JSON).unwrap();
        assert_eq!(state.endpoints.len(), 2);
        assert_eq!(state.active_connections.len(), 1);
        assert!(state.endpoints[0].ports[0].is_multiple);

        let specs = state.validate().unwrap();
        assert_eq!(specs[0].properties, vec!["mode = auto"]);
        assert_eq!(specs[0].style.px("width"), Some(160.0));
        assert_eq!(specs[0].ports[0].max_connections, MaxConnections::Unbounded);
        assert_eq!(specs[1].ports[0].max_connections, MaxConnections::Single);
        assert_eq!(
            specs[1].ports[0].potential_targets,
            vec![PortRef::new("org.example.PowerManager.pm", "timeshifter")]
        );
    }

    #[test]
    fn test_validate_rejects_malformed_target() {
        let mut state: CurrentState = serde_json::from_str(STATE_JSON).unwrap();
        state.endpoints[0].ports[0].potential_connections = vec!["garbage".to_string()];
        assert!(matches!(
            state.validate(),
            Err(SnapshotError::MalformedTarget { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_target() {
        let mut state: CurrentState = serde_json::from_str(STATE_JSON).unwrap();
        state.endpoints[0].ports[0].potential_connections = vec!["ghost:port".to_string()];
        assert_eq!(
            state.validate(),
            Err(SnapshotError::DanglingTarget {
                port: PortRef::new("org.example.PowerManager.pm", "timeshifter"),
                target: PortRef::new("ghost", "port"),
            })
        );
    }
}
