// SPDX-License-Identifier: MIT OR Apache-2.0
//! Details panel - info about the tapped node or edge.

use fpai_topology_graph::viewer::TopologyViewer;
use fpai_topology_graph::{ConnectionEditor, SelectionEvent};
use fpai_topology_sync::Topology;

/// The details panel
pub struct DetailsPanel {
    /// Last selection event, for the header line
    last_event: Option<SelectionEvent>,
}

impl DetailsPanel {
    /// Create a new details panel
    pub fn new() -> Self {
        Self { last_event: None }
    }

    /// Record a selection event from the viewer
    pub fn on_selection(&mut self, event: SelectionEvent) {
        tracing::debug!(?event, "selection changed");
        self.last_event = Some(event);
    }

    /// Render the details panel
    pub fn ui(&mut self, ui: &mut egui::Ui, topology: &Topology) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            let viewer = topology.viewer();
            match &self.last_event {
                Some(SelectionEvent::NodeSelected(_)) => Self::node_section(ui, viewer),
                Some(SelectionEvent::EdgeSelected(_)) => Self::edge_section(ui, viewer),
                Some(SelectionEvent::NothingSelected) | None => {
                    ui.label("Tap a node or edge in the topology view");
                }
            }

            ui.separator();
            Self::drag_section(ui, topology.editor());
        });
    }

    fn node_section(ui: &mut egui::Ui, viewer: &TopologyViewer) {
        // Selection is gone after a refresh
        let Some(node) = viewer.selected_node() else {
            ui.label("Selection cleared by refresh");
            return;
        };

        ui.heading(node.data.display_name());
        egui::Grid::new("node_details").num_columns(2).striped(true).show(ui, |ui| {
            ui.label("Id");
            ui.label(&node.data.id);
            ui.end_row();

            for (key, value) in &node.data.extra {
                ui.label(key);
                ui.label(value.to_string());
                ui.end_row();
            }
        });
    }

    fn edge_section(ui: &mut egui::Ui, viewer: &TopologyViewer) {
        let Some(edge) = viewer.selected_edge() else {
            ui.label("Selection cleared by refresh");
            return;
        };
        let name = |id: &str| {
            viewer
                .node(id)
                .map_or_else(|| id.to_string(), |n| n.data.display_name().to_string())
        };

        ui.heading("Possible connection");
        egui::Grid::new("edge_details").num_columns(2).striped(true).show(ui, |ui| {
            ui.label("connects:");
            ui.label(name(&edge.source));
            ui.end_row();

            ui.label("with:");
            ui.label(name(&edge.target));
            ui.end_row();

            ui.label("Connected:");
            let (text, color) = if edge.isconnected {
                ("true", egui::Color32::from_rgb(0, 200, 0))
            } else {
                ("false", egui::Color32::GRAY)
            };
            ui.label(egui::RichText::new(text).color(color));
            ui.end_row();
        });
    }

    fn drag_section(ui: &mut egui::Ui, editor: &ConnectionEditor) {
        match editor.constraints().session() {
            Some(session) => {
                ui.label(format!("Dragging from {}", session.source()));
                let registry = editor.registry();
                for target in session.allowed() {
                    if registry.has_capacity(target) {
                        ui.label(format!("  \u{2192} {target}"));
                    } else {
                        ui.label(
                            egui::RichText::new(format!("  \u{2192} {target} (full)"))
                                .color(egui::Color32::GRAY),
                        );
                    }
                }
            }
            None => {
                let registry = editor.registry();
                ui.label(format!(
                    "{} endpoints, {} active connections",
                    registry.endpoint_count(),
                    registry.connection_count()
                ));
            }
        }
    }
}

impl Default for DetailsPanel {
    fn default() -> Self {
        Self::new()
    }
}
