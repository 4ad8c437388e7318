// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory registry of endpoints, their ports and the live connection set.

use crate::connection::{Connection, ConnectionId};
use crate::endpoint::{Endpoint, EndpointSpec};
use crate::endpoint_id::EndpointId;
use crate::port::{Port, PortRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Endpoints, ports and connections of one editing session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyRegistry {
    /// Endpoints in insertion order
    endpoints: IndexMap<EndpointId, Endpoint>,
    /// Connections between ports
    connections: IndexMap<ConnectionId, Connection>,
}

impl TopologyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint and register its ports.
    ///
    /// Idempotent by id: returns `false` and changes nothing when an endpoint
    /// with the same id already exists.
    pub fn add_endpoint(&mut self, spec: EndpointSpec) -> bool {
        if self.endpoints.contains_key(&spec.id) {
            tracing::trace!(endpoint = %spec.id, "endpoint already present, skipping");
            return false;
        }
        let endpoint = Endpoint::new(spec);
        tracing::debug!(
            endpoint = %endpoint.id,
            ports = endpoint.port_count(),
            "added endpoint"
        );
        self.endpoints.insert(endpoint.id.clone(), endpoint);
        true
    }

    /// Remove an endpoint and its connections
    pub fn remove_endpoint(&mut self, id: &EndpointId) -> Option<Endpoint> {
        self.connections
            .retain(|_, c| c.source.endpoint != *id && c.target.endpoint != *id);
        self.endpoints.shift_remove(id)
    }

    /// Remove all endpoints and connections
    pub fn clear(&mut self) {
        self.endpoints.clear();
        self.connections.clear();
    }

    /// Get an endpoint by id
    pub fn endpoint(&self, id: &EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(id)
    }

    /// Get a mutable endpoint by id
    pub fn endpoint_mut(&mut self, id: &EndpointId) -> Option<&mut Endpoint> {
        self.endpoints.get_mut(id)
    }

    /// Get all endpoints
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Get all endpoints mutably
    pub fn endpoints_mut(&mut self) -> impl Iterator<Item = &mut Endpoint> {
        self.endpoints.values_mut()
    }

    /// Get the number of endpoints
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Look up a port by endpoint id and port name
    pub fn get_port(&self, endpoint: &EndpointId, port: &str) -> Option<&Port> {
        self.endpoints.get(endpoint)?.port(port)
    }

    /// Look up a port by reference
    pub fn port(&self, key: &PortRef) -> Option<&Port> {
        self.get_port(&key.endpoint, &key.port)
    }

    /// Look up a port mutably by reference
    pub fn port_mut(&mut self, key: &PortRef) -> Option<&mut Port> {
        self.endpoints.get_mut(&key.endpoint)?.port_mut(&key.port)
    }

    /// Iterate over every port of every endpoint
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.endpoints.values().flat_map(Endpoint::ports)
    }

    /// Iterate mutably over every port of every endpoint
    pub fn ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.endpoints.values_mut().flat_map(Endpoint::ports_mut)
    }

    /// Add a connection between two registered ports
    pub fn connect(
        &mut self,
        source: PortRef,
        target: PortRef,
        is_connected: bool,
    ) -> Result<ConnectionId, RegistryError> {
        if self.port(&source).is_none() {
            return Err(RegistryError::PortNotFound(source));
        }
        if self.port(&target).is_none() {
            return Err(RegistryError::PortNotFound(target));
        }
        if source == target {
            return Err(RegistryError::SelfLoop(source));
        }
        if self.connections.values().any(|c| c.joins(&source, &target)) {
            return Err(RegistryError::AlreadyConnected(source, target));
        }

        let connection = Connection::new(source, target, is_connected);
        let id = connection.id.clone();
        self.connections.insert(id.clone(), connection);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(id)
    }

    /// Get a connection by id
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a port
    pub fn connections_for_port<'a>(
        &'a self,
        port: &'a PortRef,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_port(port))
    }

    /// Whether a port's connection cap leaves room for one more connection;
    /// `false` for unknown ports
    pub fn has_capacity(&self, key: &PortRef) -> bool {
        self.port(key).is_some_and(|port| {
            port.max_connections
                .allows(self.connections_for_port(key).count())
        })
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Error when looking up or wiring ports
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortRef),

    /// Self-loop not allowed
    #[error("Port cannot connect to itself: {0}")]
    SelfLoop(PortRef),

    /// The two ports are already connected
    #[error("Ports already connected: {0} and {1}")]
    AlreadyConnected(PortRef, PortRef),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::PortSpec;
    use crate::port::MaxConnections;

    fn pair() -> TopologyRegistry {
        let mut registry = TopologyRegistry::new();
        registry.add_endpoint(EndpointSpec::new("A").with_port(PortSpec::new(
            "out",
            [PortRef::new("B", "in")],
            MaxConnections::Unbounded,
        )));
        registry.add_endpoint(EndpointSpec::new("B").with_port(PortSpec::new(
            "in",
            [PortRef::new("A", "out")],
            MaxConnections::Single,
        )));
        registry
    }

    #[test]
    fn test_add_endpoint_is_idempotent() {
        let mut registry = pair();
        assert_eq!(registry.endpoint_count(), 2);

        let again = EndpointSpec::new("A").with_port(PortSpec::new("other", [], MaxConnections::Single));
        assert!(!registry.add_endpoint(again));
        assert_eq!(registry.endpoint_count(), 2);

        // The original ports survive
        let a = registry.endpoint(&EndpointId::new("A")).unwrap();
        assert!(a.port("out").is_some());
        assert!(a.port("other").is_none());
    }

    #[test]
    fn test_get_port_miss_is_none() {
        let registry = pair();
        assert!(registry.get_port(&EndpointId::new("A"), "out").is_some());
        assert!(registry.get_port(&EndpointId::new("A"), "nope").is_none());
        assert!(registry.get_port(&EndpointId::new("Z"), "out").is_none());
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut registry = pair();
        let id = registry
            .connect(PortRef::new("A", "out"), PortRef::new("B", "in"), true)
            .unwrap();
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.connection(&id).unwrap().is_connected);

        let dup = registry.connect(PortRef::new("B", "in"), PortRef::new("A", "out"), true);
        assert!(matches!(dup, Err(RegistryError::AlreadyConnected(..))));

        assert!(registry.disconnect(&id).is_some());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_connect_rejects_unknown_and_self() {
        let mut registry = pair();
        let missing = registry.connect(PortRef::new("A", "out"), PortRef::new("C", "in"), false);
        assert_eq!(missing, Err(RegistryError::PortNotFound(PortRef::new("C", "in"))));

        let self_loop = registry.connect(PortRef::new("A", "out"), PortRef::new("A", "out"), false);
        assert!(matches!(self_loop, Err(RegistryError::SelfLoop(_))));
    }

    #[test]
    fn test_remove_endpoint_drops_its_connections() {
        let mut registry = pair();
        registry
            .connect(PortRef::new("A", "out"), PortRef::new("B", "in"), true)
            .unwrap();
        assert!(registry.remove_endpoint(&EndpointId::new("B")).is_some());
        assert_eq!(registry.endpoint_count(), 1);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.ports().count(), 1);
    }

    #[test]
    fn test_has_capacity_follows_port_cap() {
        let mut registry = pair();
        let out = PortRef::new("A", "out");
        let input = PortRef::new("B", "in");
        assert!(registry.has_capacity(&out));
        assert!(registry.has_capacity(&input));

        registry.connect(out.clone(), input.clone(), true).unwrap();
        assert_eq!(registry.connections_for_port(&input).count(), 1);
        assert!(registry.has_capacity(&out));
        assert!(!registry.has_capacity(&input));
        assert!(!registry.has_capacity(&PortRef::new("C", "in")));
    }
}
