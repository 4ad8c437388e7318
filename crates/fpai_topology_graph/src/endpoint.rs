// SPDX-License-Identifier: MIT OR Apache-2.0
//! Endpoint (node) definitions for the topology.

use crate::endpoint_id::{EndpointId, IdentifierParts};
use crate::port::{MaxConnections, Port, PortRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default endpoint width for endpoints with up to two ports
pub const SMALL_WIDTH: f32 = 160.0;
/// Default endpoint width for endpoints with more than two ports
pub const BIG_WIDTH: f32 = 320.0;
/// Default endpoint height
pub const HEIGHT: f32 = 80.0;

/// CSS-like style attributes of an endpoint (`width`, `left`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointStyle(IndexMap<String, String>);

impl EndpointStyle {
    /// Create an empty style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set an attribute (builder form)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Get an attribute
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Get a pixel attribute such as `"120px"` as a number
    pub fn px(&self, key: &str) -> Option<f32> {
        let value = self.get(key)?.trim();
        value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
    }

    /// All attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for EndpointStyle {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Declaration of one port of an endpoint being added
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    /// Port name
    pub id: String,
    /// Ports it may connect to
    pub potential_targets: Vec<PortRef>,
    /// Connection cap
    pub max_connections: MaxConnections,
}

impl PortSpec {
    /// Create a new port declaration
    pub fn new(
        id: impl Into<String>,
        potential_targets: impl IntoIterator<Item = PortRef>,
        max_connections: MaxConnections,
    ) -> Self {
        Self {
            id: id.into(),
            potential_targets: potential_targets.into_iter().collect(),
            max_connections,
        }
    }
}

/// Declaration of an endpoint being added to the registry
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSpec {
    /// Endpoint id
    pub id: EndpointId,
    /// Ports in display order
    pub ports: Vec<PortSpec>,
    /// `key = value` lines shown under the label
    pub properties: Vec<String>,
    /// Style attributes
    pub style: EndpointStyle,
}

impl EndpointSpec {
    /// Create a declaration without ports, properties or style
    pub fn new(id: impl Into<EndpointId>) -> Self {
        Self {
            id: id.into(),
            ports: Vec::new(),
            properties: Vec::new(),
            style: EndpointStyle::new(),
        }
    }

    /// Add a port
    pub fn with_port(mut self, port: PortSpec) -> Self {
        self.ports.push(port);
        self
    }

    /// Set the style
    pub fn with_style(mut self, style: EndpointStyle) -> Self {
        self.style = style;
        self
    }
}

/// An endpoint in the topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint id
    pub id: EndpointId,
    /// Ports in display order, keyed by port name
    ports: IndexMap<String, Port>,
    /// `key = value` lines shown under the label
    pub properties: Vec<String>,
    /// Style attributes
    pub style: EndpointStyle,
    /// Top-left position in canvas space
    pub position: [f32; 2],
}

impl Endpoint {
    /// Create an endpoint from its declaration
    pub fn new(spec: EndpointSpec) -> Self {
        let ports = spec
            .ports
            .into_iter()
            .map(|p| {
                let key = PortRef::new(spec.id.clone(), p.id.clone());
                (p.id, Port::new(key, p.potential_targets, p.max_connections))
            })
            .collect();

        let position = match (spec.style.px("left"), spec.style.px("top")) {
            (Some(x), Some(y)) => [x, y],
            _ => [0.0, 0.0],
        };

        Self {
            id: spec.id,
            ports,
            properties: spec.properties,
            style: spec.style,
            position,
        }
    }

    /// Label lines: namespace, name and instance
    pub fn label(&self) -> IdentifierParts {
        self.id.parts()
    }

    /// Whether the style pins the endpoint to an explicit position
    pub fn has_explicit_position(&self) -> bool {
        self.style.px("left").is_some() && self.style.px("top").is_some()
    }

    /// Width and height, from style or defaults by port count
    pub fn size(&self) -> [f32; 2] {
        let default_width = if self.ports.len() > 2 { BIG_WIDTH } else { SMALL_WIDTH };
        [
            self.style.px("width").unwrap_or(default_width),
            self.style.px("height").unwrap_or(HEIGHT),
        ]
    }

    /// Get a port by name
    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.get(port_id)
    }

    /// Get a mutable port by name
    pub fn port_mut(&mut self, port_id: &str) -> Option<&mut Port> {
        self.ports.get_mut(port_id)
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Get all ports mutably
    pub fn ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.values_mut()
    }

    /// Get the number of ports
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_pixels() {
        let style = EndpointStyle::new()
            .with("width", "320px")
            .with("top", " 60 px")
            .with("left", "bogus");
        assert_eq!(style.px("width"), Some(320.0));
        assert_eq!(style.px("top"), Some(60.0));
        assert_eq!(style.px("left"), None);
        assert_eq!(style.px("height"), None);
    }

    #[test]
    fn test_endpoint_from_spec() {
        let spec = EndpointSpec::new("org.example.Manager.1")
            .with_port(PortSpec::new(
                "driver",
                [PortRef::new("dw", "controller")],
                MaxConnections::Unbounded,
            ))
            .with_style(EndpointStyle::new().with("left", "50px").with("top", "60px"));
        let endpoint = Endpoint::new(spec);

        assert_eq!(endpoint.position, [50.0, 60.0]);
        assert!(endpoint.has_explicit_position());
        assert_eq!(endpoint.size(), [SMALL_WIDTH, HEIGHT]);
        assert_eq!(endpoint.label().name, "Manager");

        let port = endpoint.port("driver").unwrap();
        assert_eq!(port.key, PortRef::new("org.example.Manager.1", "driver"));
        assert!(port.can_connect(&PortRef::new("dw", "controller")));
        assert!(endpoint.port("missing").is_none());
    }

    #[test]
    fn test_big_width_for_many_ports() {
        let spec = ["a", "b", "c"]
            .into_iter()
            .fold(EndpointSpec::new("hub"), |spec, p| {
                spec.with_port(PortSpec::new(p, [], MaxConnections::Single))
            });
        assert_eq!(Endpoint::new(spec).size()[0], BIG_WIDTH);
    }
}
