// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interactive port-to-port connection editor state.
//!
//! Binds the registry, the live connection set and the drag constraints
//! together. Completed drags do not create connections locally: they are
//! queued as [`ConnectRequest`]s for the server, and the connection shows
//! up once the server reports it in the next `currentState`.

use crate::connection::{parse_connection_key, ConnectionId};
use crate::constraint::{ConnectRequest, ConnectionConstraints, DragError, DragOutcome};
use crate::endpoint_id::EndpointId;
use crate::layout::{apply_layout, layered_positions};
use crate::port::{PortRef, PortVisualType};
use crate::registry::{RegistryError, TopologyRegistry};
use crate::snapshot::{CurrentState, SnapshotError};
use std::collections::HashSet;

/// Outcome of loading a `currentState` snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Endpoints created by this load
    pub added_endpoints: usize,
    /// Active connections present after the load
    pub connections: usize,
    /// Active connections skipped because a port was unknown or the key malformed
    pub skipped_connections: usize,
}

/// Connection editor state
#[derive(Debug, Default)]
pub struct ConnectionEditor {
    registry: TopologyRegistry,
    constraints: ConnectionConstraints,
    requests: Vec<ConnectRequest>,
}

impl ConnectionEditor {
    /// Create an empty editor
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of endpoints and connections
    pub fn registry(&self) -> &TopologyRegistry {
        &self.registry
    }

    /// Mutable registry, for layout changes such as endpoint dragging
    pub fn registry_mut(&mut self) -> &mut TopologyRegistry {
        &mut self.registry
    }

    /// Drag constraint engine
    pub fn constraints(&self) -> &ConnectionConstraints {
        &self.constraints
    }

    /// Load a `currentState` snapshot.
    ///
    /// Endpoints already present are kept as they are. The connection set is
    /// replaced by the snapshot's active connections. A snapshot with invalid
    /// potential-target references is rejected without touching the registry.
    pub fn load_state(&mut self, state: &CurrentState) -> Result<LoadSummary, SnapshotError> {
        let specs = state.validate()?;
        let mut summary = LoadSummary::default();

        let mut added = HashSet::new();
        for spec in specs {
            let id = spec.id.clone();
            if self.registry.add_endpoint(spec) {
                added.insert(id);
            }
        }
        summary.added_endpoints = added.len();

        if !added.is_empty() {
            self.place_new_endpoints(&added);
            self.constrain_new_ports(&added);
        }

        let existing: Vec<ConnectionId> = self.registry.connections().map(|c| c.id.clone()).collect();
        for id in existing {
            self.registry.disconnect(&id);
        }

        for key in &state.active_connections {
            match self.replay_connection(key) {
                Ok(()) => summary.connections += 1,
                Err(reason) => {
                    tracing::warn!(connection = %key, %reason, "skipping active connection");
                    summary.skipped_connections += 1;
                }
            }
        }

        tracing::debug!(
            endpoints = self.registry.endpoint_count(),
            added = summary.added_endpoints,
            connections = summary.connections,
            skipped = summary.skipped_connections,
            "connection state loaded"
        );
        Ok(summary)
    }

    /// Remove an endpoint and its connections
    pub fn remove_endpoint(&mut self, id: &EndpointId) -> bool {
        if self.constraints.is_dragging() {
            self.constraints.end_drag(&mut self.registry, DragOutcome::Cancelled);
        }
        self.registry.remove_endpoint(id).is_some()
    }

    /// Drop every endpoint and connection and lay out from scratch on next load
    pub fn reset(&mut self) {
        if self.constraints.is_dragging() {
            self.constraints.end_drag(&mut self.registry, DragOutcome::Cancelled);
        }
        self.registry.clear();
        self.requests.clear();
    }

    /// Recompute the layered layout for every endpoint without explicit position
    pub fn relayout(&mut self) {
        apply_layout(&mut self.registry);
    }

    /// Start dragging a new connection from `source`
    pub fn begin_drag(&mut self, source: &PortRef) -> Result<(), DragError> {
        self.constraints.begin_drag(&mut self.registry, source)
    }

    /// End the current drag; queues and returns the requested connection if
    /// the drop landed on an allowed port
    pub fn end_drag(&mut self, outcome: DragOutcome) -> Option<ConnectRequest> {
        let request = self.constraints.end_drag(&mut self.registry, outcome)?;
        self.requests.push(request.clone());
        Some(request)
    }

    /// Drain connection requests not yet sent to the server
    pub fn take_requests(&mut self) -> Vec<ConnectRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Move an endpoint by a canvas-space delta
    pub fn move_endpoint(&mut self, id: &EndpointId, delta: [f32; 2]) {
        if let Some(endpoint) = self.registry.endpoint_mut(id) {
            endpoint.position[0] += delta[0];
            endpoint.position[1] += delta[1];
        }
    }

    fn replay_connection(&mut self, key: &str) -> Result<(), String> {
        let (source, target) = parse_connection_key(key).map_err(|e| e.to_string())?;
        match self.registry.connect(source, target, true) {
            Ok(_) => Ok(()),
            // Both directions of one wiring may be reported
            Err(RegistryError::AlreadyConnected(..)) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn place_new_endpoints(&mut self, added: &HashSet<EndpointId>) {
        let positions = layered_positions(&self.registry);
        for endpoint in self.registry.endpoints_mut() {
            if !added.contains(&endpoint.id) || endpoint.has_explicit_position() {
                continue;
            }
            if let Some(position) = positions.get(&endpoint.id) {
                endpoint.position = *position;
            }
        }
    }

    /// Ports added while a drag is active follow that drag's constraints
    fn constrain_new_ports(&mut self, added: &HashSet<EndpointId>) {
        let Some(session) = self.constraints.session() else {
            return;
        };
        let allowed = session.allowed().clone();
        for endpoint in self.registry.endpoints_mut() {
            if !added.contains(&endpoint.id) {
                continue;
            }
            for port in endpoint.ports_mut() {
                if !allowed.contains(&port.key) {
                    port.enabled = false;
                    port.visual_type = Some(PortVisualType::Disabled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{EndpointState, PortState};

    fn endpoint(id: &str, ports: &[(&str, &[&str])]) -> EndpointState {
        EndpointState {
            id: id.to_string(),
            ports: ports
                .iter()
                .map(|(port, targets)| PortState {
                    id: port.to_string(),
                    potential_connections: targets.iter().map(|t| t.to_string()).collect(),
                    is_multiple: false,
                })
                .collect(),
            properties: Vec::new(),
            style: Default::default(),
        }
    }

    fn state(active: &[&str]) -> CurrentState {
        CurrentState {
            endpoints: vec![
                endpoint("A", &[("out", &["B:in"])]),
                endpoint("B", &[("in", &["A:out"])]),
            ],
            active_connections: active.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_active_connection_replayed_once() {
        let mut editor = ConnectionEditor::new();
        let summary = editor.load_state(&state(&["A:out-B:in"])).unwrap();
        assert_eq!(summary.added_endpoints, 2);
        assert_eq!(summary.connections, 1);

        let connections: Vec<_> = editor.registry().connections().collect();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].source, PortRef::new("A", "out"));
        assert_eq!(connections[0].target, PortRef::new("B", "in"));
        assert!(connections[0].is_connected);
    }

    #[test]
    fn test_reload_is_idempotent_and_syncs_connections() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&["A:out-B:in"])).unwrap();
        editor.move_endpoint(&EndpointId::new("A"), [10.0, 0.0]);
        let moved = editor.registry().endpoint(&EndpointId::new("A")).unwrap().position;

        let summary = editor.load_state(&state(&["A:out-B:in", "B:in-A:out"])).unwrap();
        assert_eq!(summary.added_endpoints, 0);
        assert_eq!(editor.registry().endpoint_count(), 2);
        assert_eq!(editor.registry().connection_count(), 1);
        // Existing endpoints keep their position
        assert_eq!(editor.registry().endpoint(&EndpointId::new("A")).unwrap().position, moved);

        editor.load_state(&state(&[])).unwrap();
        assert_eq!(editor.registry().connection_count(), 0);
    }

    #[test]
    fn test_unknown_ports_in_active_connections_are_skipped() {
        let mut editor = ConnectionEditor::new();
        let summary = editor
            .load_state(&state(&["A:out-C:in", "garbage", "A:out-B:in"]))
            .unwrap();
        assert_eq!(summary.connections, 1);
        assert_eq!(summary.skipped_connections, 2);
    }

    #[test]
    fn test_invalid_snapshot_leaves_registry_untouched() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&["A:out-B:in"])).unwrap();

        let mut bad = state(&[]);
        bad.endpoints.push(endpoint("C", &[("x", &["nowhere"])]));
        assert!(editor.load_state(&bad).is_err());
        assert_eq!(editor.registry().endpoint_count(), 2);
        assert_eq!(editor.registry().connection_count(), 1);
    }

    #[test]
    fn test_drag_queues_request() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&[])).unwrap();

        editor.begin_drag(&PortRef::new("A", "out")).unwrap();
        let request = editor.end_drag(DragOutcome::Dropped(PortRef::new("B", "in")));
        assert!(request.is_some());
        // Nothing is connected locally until the server reports it
        assert_eq!(editor.registry().connection_count(), 0);

        let requests = editor.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, PortRef::new("B", "in"));
        assert!(editor.take_requests().is_empty());
    }

    #[test]
    fn test_ports_loaded_mid_drag_are_constrained() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&[])).unwrap();
        editor.begin_drag(&PortRef::new("A", "out")).unwrap();

        let mut more = state(&[]);
        more.endpoints.push(endpoint("C", &[("in", &[])]));
        editor.load_state(&more).unwrap();

        let c = editor.registry().port(&PortRef::new("C", "in")).unwrap();
        assert!(!c.enabled);
        assert!(editor.registry().port(&PortRef::new("B", "in")).unwrap().enabled);

        editor.end_drag(DragOutcome::Cancelled);
        assert!(editor.registry().ports().all(|p| p.enabled && p.visual_type.is_none()));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&["A:out-B:in"])).unwrap();
        editor.begin_drag(&PortRef::new("A", "out")).unwrap();
        editor.reset();
        assert_eq!(editor.registry().endpoint_count(), 0);
        assert!(!editor.constraints().is_dragging());
        assert!(!editor.remove_endpoint(&EndpointId::new("A")));
    }

    #[test]
    fn test_relayout_restores_layered_positions() {
        let mut editor = ConnectionEditor::new();
        editor.load_state(&state(&[])).unwrap();
        let a = EndpointId::new("A");
        let laid_out = editor.registry().endpoint(&a).unwrap().position;

        editor.move_endpoint(&a, [40.0, -25.0]);
        assert_ne!(editor.registry().endpoint(&a).unwrap().position, laid_out);

        editor.relayout();
        assert_eq!(editor.registry().endpoint(&a).unwrap().position, laid_out);
    }
}
