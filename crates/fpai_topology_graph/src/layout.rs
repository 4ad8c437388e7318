// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layered layout for endpoints without an explicit position.
//!
//! Each connected component is laid out top to bottom: the endpoint with the
//! most ports forms the first layer, every following layer holds the
//! not-yet-placed endpoints reachable through potential targets of the
//! previous one. Layers are centred on the widest layer and components are
//! placed left to right.

use crate::endpoint::HEIGHT;
use crate::endpoint_id::EndpointId;
use crate::registry::TopologyRegistry;
use std::collections::{BTreeMap, BTreeSet};

/// Horizontal gap between endpoints and between components
pub const MARGIN_HOR: f32 = 80.0;
/// Vertical gap between layers
pub const MARGIN_VER: f32 = 120.0;
/// Left edge of the first component
pub const LEFT_START: f32 = 50.0;

/// Compute layered positions for every endpoint, keyed by id
pub fn layered_positions(registry: &TopologyRegistry) -> BTreeMap<EndpointId, [f32; 2]> {
    let widths: BTreeMap<EndpointId, f32> = registry
        .endpoints()
        .map(|e| (e.id.clone(), e.size()[0]))
        .collect();
    let mut to_layout: BTreeSet<EndpointId> = widths.keys().cloned().collect();
    let mut positions = BTreeMap::new();

    let mut left_side = LEFT_START;
    while let Some(start) = component_root(registry, &to_layout) {
        to_layout.remove(&start);

        let mut layers = vec![BTreeSet::from([start])];
        while let Some(last) = layers.last() {
            let next = next_layer(registry, last, &mut to_layout);
            if next.is_empty() {
                break;
            }
            layers.push(next);
        }

        let layer_widths: Vec<f32> = layers
            .iter()
            .map(|layer| {
                layer.iter().map(|id| widths[id] + MARGIN_HOR).sum::<f32>() - MARGIN_HOR
            })
            .collect();
        let max_width = layer_widths.iter().copied().fold(0.0, f32::max);

        for (ix, layer) in layers.iter().enumerate() {
            let top = MARGIN_VER / 2.0 + ix as f32 * (MARGIN_VER + HEIGHT);
            let mut left = left_side + ((max_width - layer_widths[ix]) / 2.0).floor();
            for id in layer {
                positions.insert(id.clone(), [left, top]);
                left += widths[id] + MARGIN_HOR;
            }
        }

        left_side += max_width + MARGIN_HOR;
    }

    positions
}

/// Position every endpoint that has no explicit `left`/`top` style
pub fn apply_layout(registry: &mut TopologyRegistry) {
    let positions = layered_positions(registry);
    for endpoint in registry.endpoints_mut() {
        if endpoint.has_explicit_position() {
            continue;
        }
        if let Some(position) = positions.get(&endpoint.id) {
            endpoint.position = *position;
        }
    }
}

/// Unplaced endpoint with the most ports, first by id on ties
fn component_root(registry: &TopologyRegistry, to_layout: &BTreeSet<EndpointId>) -> Option<EndpointId> {
    let mut best: Option<(&EndpointId, usize)> = None;
    for id in to_layout {
        let ports = registry.endpoint(id).map_or(0, |e| e.port_count());
        if best.map_or(true, |(_, max)| ports > max) {
            best = Some((id, ports));
        }
    }
    best.map(|(id, _)| id.clone())
}

fn next_layer(
    registry: &TopologyRegistry,
    last_layer: &BTreeSet<EndpointId>,
    to_layout: &mut BTreeSet<EndpointId>,
) -> BTreeSet<EndpointId> {
    let mut next = BTreeSet::new();
    for id in last_layer {
        let Some(endpoint) = registry.endpoint(id) else {
            continue;
        };
        let mut ports: Vec<_> = endpoint.ports().collect();
        ports.sort_by(|a, b| a.key.port.cmp(&b.key.port));
        for port in ports {
            let mut targets: Vec<_> = port.potential_targets().iter().collect();
            targets.sort();
            for target in targets {
                if to_layout.remove(&target.endpoint) {
                    next.insert(target.endpoint.clone());
                }
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointSpec, EndpointStyle, PortSpec, SMALL_WIDTH};
    use crate::port::{MaxConnections, PortRef};

    fn spec(id: &str, ports: &[(&str, &[&str])]) -> EndpointSpec {
        ports.iter().fold(EndpointSpec::new(id), |spec, (port, targets)| {
            spec.with_port(PortSpec::new(
                *port,
                targets.iter().map(|t| t.parse::<PortRef>().unwrap()),
                MaxConnections::Single,
            ))
        })
    }

    #[test]
    fn test_manager_above_its_devices() {
        let mut registry = TopologyRegistry::new();
        registry.add_endpoint(spec("dw", &[("controller", &["pm:devices"])]));
        registry.add_endpoint(spec("pv", &[("controller", &["pm:devices"])]));
        registry.add_endpoint(spec(
            "pm",
            &[("devices", &["dw:controller", "pv:controller"]), ("ui", &[])],
        ));

        let positions = layered_positions(&registry);
        let pm = positions[&EndpointId::new("pm")];
        let dw = positions[&EndpointId::new("dw")];
        let pv = positions[&EndpointId::new("pv")];

        assert_eq!(pm[1], MARGIN_VER / 2.0);
        assert_eq!(dw[1], MARGIN_VER / 2.0 + MARGIN_VER + HEIGHT);
        assert_eq!(dw[1], pv[1]);
        assert_eq!(dw[0], LEFT_START);
        assert_eq!(pv[0], LEFT_START + SMALL_WIDTH + MARGIN_HOR);
        // Single-node layer centred over the two-node layer
        assert_eq!(pm[0], LEFT_START + ((SMALL_WIDTH + MARGIN_HOR) / 2.0).floor());
    }

    #[test]
    fn test_components_side_by_side() {
        let mut registry = TopologyRegistry::new();
        registry.add_endpoint(spec("a", &[]));
        registry.add_endpoint(spec("b", &[]));

        let positions = layered_positions(&registry);
        assert_eq!(positions[&EndpointId::new("a")], [LEFT_START, MARGIN_VER / 2.0]);
        assert_eq!(
            positions[&EndpointId::new("b")],
            [LEFT_START + SMALL_WIDTH + MARGIN_HOR, MARGIN_VER / 2.0]
        );
    }

    #[test]
    fn test_explicit_position_wins() {
        let mut registry = TopologyRegistry::new();
        registry.add_endpoint(
            spec("a", &[]).with_style(EndpointStyle::new().with("left", "500px").with("top", "10px")),
        );
        registry.add_endpoint(spec("b", &[]));
        apply_layout(&mut registry);

        assert_eq!(registry.endpoint(&EndpointId::new("a")).unwrap().position, [500.0, 10.0]);
        assert_eq!(
            registry.endpoint(&EndpointId::new("b")).unwrap().position,
            [LEFT_START + SMALL_WIDTH + MARGIN_HOR, MARGIN_VER / 2.0]
        );
    }
}
