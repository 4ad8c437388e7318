// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui draw step for the topology viewer and the connection editor.
//!
//! Features:
//! - Pan/zoom navigation shared by both canvases
//! - Viewer: node/edge drawing, tap selection, neighborhood fading
//! - Editor: endpoint boxes with stacked labels, port dots, bezier
//!   connections, drag-to-connect with disabled-port marking, endpoint dragging
//!
//! All state transitions go through [`TopologyViewer`] and
//! [`ConnectionEditor`]; this module only maps pointer input onto them and
//! paints the result.

use crate::constraint::DragOutcome;
use crate::editor::ConnectionEditor;
use crate::endpoint::Endpoint;
use crate::endpoint_id::EndpointId;
use crate::port::{Port, PortRef};
use crate::viewer::{ElementRef, TopologyViewer};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

/// Viewer node radius
const NODE_RADIUS: f32 = 18.0;
/// Viewer edge widths
const EDGE_WIDTH: f32 = 5.0;
const CONNECTED_EDGE_WIDTH: f32 = 6.0;
/// Opacity of faded elements; never zero so the structure stays legible
const FADED_OPACITY: f32 = 0.35;

/// Editor visual parameters
const ENDPOINT_ROUNDING: f32 = 6.0;
const LABEL_LINE_HEIGHT: f32 = 14.0;
const BEZIER_CURVATURE: f32 = 50.0;
const CONNECTION_THICKNESS: f32 = 3.0;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

/// Viewer colors
const NODE_COLOR: Color32 = Color32::from_rgb(6, 128, 193);
const SELECTED_COLOR: Color32 = Color32::from_rgb(102, 153, 51);
const EDGE_COLOR: Color32 = Color32::from_rgb(150, 150, 150);
const CONNECTED_EDGE_COLOR: Color32 = Color32::from_rgb(0, 255, 0);

/// Pan/zoom state of a canvas
#[derive(Debug, Clone)]
pub struct Canvas {
    /// Current pan offset (graph space)
    pub pan: Vec2,
    /// Current zoom level
    pub zoom: f32,
    /// Show grid
    pub show_grid: bool,
    last_mouse_pos: Pos2,
}

impl Canvas {
    /// Create a canvas at the origin
    pub fn new() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_grid: true,
            last_mouse_pos: Pos2::ZERO,
        }
    }

    /// Convert screen position to graph position
    pub fn screen_to_graph(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (screen_pos.x - center.x) / self.zoom - self.pan.x,
            (screen_pos.y - center.y) / self.zoom - self.pan.y,
        )
    }

    /// Convert graph position to screen position
    pub fn graph_to_screen(&self, graph_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (graph_pos.x + self.pan.x) * self.zoom + center.x,
            (graph_pos.y + self.pan.y) * self.zoom + center.y,
        )
    }

    /// Track the pointer and apply scroll zoom; returns pointer position and delta
    fn track_pointer(&mut self, ui: &egui::Ui, rect: Rect) -> (Pos2, Vec2) {
        let mouse_pos = ui.input(|i| i.pointer.hover_pos().unwrap_or(self.last_mouse_pos));
        let delta = mouse_pos - self.last_mouse_pos;
        self.last_mouse_pos = mouse_pos;

        let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
        if rect.contains(mouse_pos) && scroll_delta != 0.0 {
            let old_zoom = self.zoom;
            self.zoom = (self.zoom * (1.0 + scroll_delta * 0.001)).clamp(0.1, 4.0);

            // Zoom toward mouse position
            if self.zoom != old_zoom {
                let mouse_graph = self.screen_to_graph(mouse_pos, rect);
                let zoom_ratio = self.zoom / old_zoom;
                self.pan.x += mouse_graph.x * (1.0 - zoom_ratio);
                self.pan.y += mouse_graph.y * (1.0 - zoom_ratio);
            }
        }

        (mouse_pos, delta)
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        if !self.show_grid {
            return;
        }
        let spacing = GRID_SPACING * self.zoom;
        if spacing < 4.0 {
            return;
        }
        let grid_color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let offset = (self.pan * self.zoom + rect.center().to_vec2()) - rect.min.to_vec2();

        let mut x = rect.left() + offset.x.rem_euclid(spacing);
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, grid_color),
            );
            x += spacing;
        }

        let mut y = rect.top() + offset.y.rem_euclid(spacing);
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, grid_color),
            );
            y += spacing;
        }
    }

    fn draw_status(&self, painter: &egui::Painter, rect: Rect, text: String) {
        painter.text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            format!("{text} | Zoom: {:.0}%", self.zoom * 100.0),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw adapter of the read-only topology viewer
#[derive(Debug, Clone, Default)]
pub struct TopologyViewerUi {
    /// Pan/zoom state
    pub canvas: Canvas,
    panning: bool,
}

impl TopologyViewerUi {
    /// Create a new viewer draw adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the viewer and route taps into it
    pub fn ui(&mut self, ui: &mut egui::Ui, viewer: &mut TopologyViewer) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.canvas.draw_grid(&painter, rect);
        let (mouse_pos, delta) = self.canvas.track_pointer(ui, rect);

        if response.drag_started() {
            self.panning = true;
        }
        if self.panning && response.dragged() {
            self.canvas.pan += delta / self.canvas.zoom;
        }
        if response.drag_stopped() {
            self.panning = false;
        }

        if response.clicked() {
            match self.hit_test(viewer, mouse_pos, rect) {
                Some(ElementRef::Node(id)) => {
                    viewer.tap_node(&id);
                }
                Some(ElementRef::Edge(id)) => {
                    viewer.tap_edge(&id);
                }
                None => {
                    viewer.tap_background();
                }
            }
        }

        self.draw_edges(&painter, rect, viewer);
        self.draw_nodes(&painter, rect, viewer);

        self.canvas.draw_status(
            &painter,
            rect,
            format!("Nodes: {} | Edges: {}", viewer.node_count(), viewer.edge_count()),
        );
    }

    fn node_screen_pos(&self, viewer: &TopologyViewer, id: &str, rect: Rect) -> Option<Pos2> {
        let node = viewer.node(id)?;
        Some(self.canvas.graph_to_screen(Pos2::new(node.position[0], node.position[1]), rect))
    }

    fn hit_test(&self, viewer: &TopologyViewer, mouse_pos: Pos2, rect: Rect) -> Option<ElementRef> {
        let radius = NODE_RADIUS * self.canvas.zoom;
        for node in viewer.nodes() {
            let pos = self.canvas.graph_to_screen(Pos2::new(node.position[0], node.position[1]), rect);
            if pos.distance(mouse_pos) <= radius {
                return Some(ElementRef::Node(node.data.id.clone()));
            }
        }

        let tolerance = (CONNECTED_EDGE_WIDTH * self.canvas.zoom).max(4.0);
        for edge in viewer.edges() {
            let from = self.node_screen_pos(viewer, &edge.source, rect);
            let to = self.node_screen_pos(viewer, &edge.target, rect);
            if let (Some(from), Some(to)) = (from, to) {
                if distance_to_segment(mouse_pos, from, to) <= tolerance {
                    return Some(ElementRef::Edge(edge.id.clone()));
                }
            }
        }
        None
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect, viewer: &TopologyViewer) {
        for edge in viewer.edges() {
            let from = self.node_screen_pos(viewer, &edge.source, rect);
            let to = self.node_screen_pos(viewer, &edge.target, rect);
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };

            let classes = viewer.classes(&ElementRef::Edge(edge.id.clone()));
            let (mut color, width) = if classes.isconnected {
                (CONNECTED_EDGE_COLOR, CONNECTED_EDGE_WIDTH)
            } else {
                (EDGE_COLOR, EDGE_WIDTH)
            };
            if classes.selected {
                color = SELECTED_COLOR;
            }
            if classes.faded {
                color = color.gamma_multiply(FADED_OPACITY);
            }
            painter.line_segment([from, to], Stroke::new(width * self.canvas.zoom, color));
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, viewer: &TopologyViewer) {
        let radius = NODE_RADIUS * self.canvas.zoom;
        for node in viewer.nodes() {
            let pos = self.canvas.graph_to_screen(Pos2::new(node.position[0], node.position[1]), rect);
            if !rect.expand(radius).contains(pos) {
                continue;
            }

            let classes = viewer.classes(&ElementRef::Node(node.data.id.clone()));
            let opacity = if classes.faded { FADED_OPACITY } else { 1.0 };
            let fill = if classes.selected { SELECTED_COLOR } else { NODE_COLOR };

            painter.circle_filled(pos, radius, fill.gamma_multiply(opacity));
            painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::BLACK.gamma_multiply(opacity)));
            painter.text(
                pos,
                egui::Align2::CENTER_CENTER,
                node.data.display_name(),
                egui::FontId::proportional(14.0 * self.canvas.zoom),
                Color32::WHITE.gamma_multiply(opacity),
            );
        }
    }
}

/// Editor interaction mode
#[derive(Debug, Clone, Default)]
enum EditorMode {
    /// Default mode
    #[default]
    Normal,
    /// Panning the view
    Panning,
    /// Dragging an endpoint box
    MovingEndpoint(EndpointId),
    /// Dragging a new connection; the constraint engine holds the session
    CreatingConnection,
}

/// Draw adapter of the connection editor
#[derive(Debug, Clone, Default)]
pub struct ConnectionEditorUi {
    /// Pan/zoom state
    pub canvas: Canvas,
    mode: EditorMode,
    hovered_port: Option<PortRef>,
}

impl ConnectionEditorUi {
    /// Create a new editor draw adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the editor and route drags into it
    pub fn ui(&mut self, ui: &mut egui::Ui, editor: &mut ConnectionEditor) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.canvas.draw_grid(&painter, rect);
        let (mouse_pos, delta) = self.canvas.track_pointer(ui, rect);
        self.hovered_port = self.port_at(editor, mouse_pos, rect);

        self.handle_drag(editor, &response, mouse_pos, delta, rect);

        self.draw_connections(&painter, rect, editor);
        self.draw_endpoints(&painter, rect, editor);

        if matches!(self.mode, EditorMode::CreatingConnection) {
            if let Some(session) = editor.constraints().session() {
                if let Some(from) = self.port_screen_pos(editor, session.source(), rect) {
                    self.draw_bezier(&painter, from, mouse_pos, Color32::from_rgb(122, 193, 3));
                }
            }
        }

        let registry = editor.registry();
        self.canvas.draw_status(
            &painter,
            rect,
            format!(
                "Endpoints: {} | Connections: {}",
                registry.endpoint_count(),
                registry.connection_count()
            ),
        );
    }

    fn handle_drag(
        &mut self,
        editor: &mut ConnectionEditor,
        response: &egui::Response,
        mouse_pos: Pos2,
        delta: Vec2,
        rect: Rect,
    ) {
        match &self.mode {
            EditorMode::Normal => {
                if response.dragged_by(egui::PointerButton::Middle) {
                    self.mode = EditorMode::Panning;
                } else if response.drag_started_by(egui::PointerButton::Primary) {
                    if let Some(port) = self.hovered_port.clone() {
                        match editor.begin_drag(&port) {
                            Ok(()) => self.mode = EditorMode::CreatingConnection,
                            Err(e) => tracing::warn!(port = %port, error = %e, "cannot start drag"),
                        }
                    } else if let Some(id) = self.endpoint_at(editor, mouse_pos, rect) {
                        self.mode = EditorMode::MovingEndpoint(id);
                    } else {
                        self.mode = EditorMode::Panning;
                    }
                }
            }

            EditorMode::Panning => {
                if response.dragged() {
                    self.canvas.pan += delta / self.canvas.zoom;
                }
                if response.drag_stopped() {
                    self.mode = EditorMode::Normal;
                }
            }

            EditorMode::MovingEndpoint(id) => {
                if response.dragged() {
                    let graph_delta = delta / self.canvas.zoom;
                    editor.move_endpoint(id, [graph_delta.x, graph_delta.y]);
                }
                if response.drag_stopped() {
                    self.mode = EditorMode::Normal;
                }
            }

            EditorMode::CreatingConnection => {
                if response.drag_stopped() {
                    let outcome = match self.hovered_port.clone() {
                        Some(port) => DragOutcome::Dropped(port),
                        None => DragOutcome::Cancelled,
                    };
                    // Always ends the session, even if the drop is refused
                    if let Some(request) = editor.end_drag(outcome) {
                        tracing::info!(
                            source = %request.source,
                            target = %request.target,
                            "connection requested"
                        );
                    }
                    self.mode = EditorMode::Normal;
                }
            }
        }
    }

    fn endpoint_screen_rect(&self, endpoint: &Endpoint, rect: Rect) -> Rect {
        let [w, h] = endpoint.size();
        let min = self
            .canvas
            .graph_to_screen(Pos2::new(endpoint.position[0], endpoint.position[1]), rect);
        Rect::from_min_size(min, Vec2::new(w, h) * self.canvas.zoom)
    }

    /// Ports sit evenly spaced on the bottom edge of their endpoint
    fn port_anchor(screen_rect: Rect, index: usize, count: usize) -> Pos2 {
        let step = screen_rect.width() / (count as f32 + 1.0);
        Pos2::new(screen_rect.left() + step * (index as f32 + 1.0), screen_rect.bottom())
    }

    fn port_screen_pos(&self, editor: &ConnectionEditor, key: &PortRef, rect: Rect) -> Option<Pos2> {
        let endpoint = editor.registry().endpoint(&key.endpoint)?;
        let index = endpoint.ports().position(|p| p.key == *key)?;
        let screen_rect = self.endpoint_screen_rect(endpoint, rect);
        Some(Self::port_anchor(screen_rect, index, endpoint.port_count()))
    }

    fn port_at(&self, editor: &ConnectionEditor, mouse_pos: Pos2, rect: Rect) -> Option<PortRef> {
        for endpoint in editor.registry().endpoints() {
            let screen_rect = self.endpoint_screen_rect(endpoint, rect);
            let count = endpoint.port_count();
            for (i, port) in endpoint.ports().enumerate() {
                let pos = Self::port_anchor(screen_rect, i, count);
                if pos.distance(mouse_pos) < port.style.radius * self.canvas.zoom * 1.5 {
                    return Some(port.key.clone());
                }
            }
        }
        None
    }

    fn endpoint_at(&self, editor: &ConnectionEditor, mouse_pos: Pos2, rect: Rect) -> Option<EndpointId> {
        // Last drawn is topmost
        editor
            .registry()
            .endpoints()
            .filter(|e| self.endpoint_screen_rect(e, rect).contains(mouse_pos))
            .last()
            .map(|e| e.id.clone())
    }

    fn draw_connections(&self, painter: &egui::Painter, rect: Rect, editor: &ConnectionEditor) {
        for connection in editor.registry().connections() {
            let from = self.port_screen_pos(editor, &connection.source, rect);
            let to = self.port_screen_pos(editor, &connection.target, rect);
            if let (Some(from), Some(to)) = (from, to) {
                let color = if connection.is_connected {
                    Color32::from_rgb(122, 193, 3)
                } else {
                    Color32::GRAY
                };
                self.draw_bezier(painter, from, to, color);
            }
        }
    }

    fn draw_bezier(&self, painter: &egui::Painter, from: Pos2, to: Pos2, color: Color32) {
        // Ports face downwards, so both control points hang below their anchor
        let curvature = BEZIER_CURVATURE * self.canvas.zoom;
        let ctrl1 = Pos2::new(from.x, from.y + curvature);
        let ctrl2 = Pos2::new(to.x, to.y + curvature);

        let points = bezier_points(from, ctrl1, ctrl2, to, 32);
        for pair in points.windows(2) {
            painter.line_segment(
                [pair[0], pair[1]],
                Stroke::new(CONNECTION_THICKNESS * self.canvas.zoom, color),
            );
        }
    }

    fn draw_endpoints(&self, painter: &egui::Painter, rect: Rect, editor: &ConnectionEditor) {
        for endpoint in editor.registry().endpoints() {
            let screen_rect = self.endpoint_screen_rect(endpoint, rect);
            if !screen_rect.expand(20.0).intersects(rect) {
                continue;
            }

            let rounding = ENDPOINT_ROUNDING * self.canvas.zoom;
            painter.rect_filled(screen_rect, rounding, Color32::from_rgb(45, 45, 48));
            painter.rect_stroke(screen_rect, rounding, Stroke::new(1.0, Color32::from_gray(90)));

            let label = endpoint.label();
            let mut y = screen_rect.top() + LABEL_LINE_HEIGHT * self.canvas.zoom;
            for (i, line) in label.label_lines().into_iter().enumerate() {
                let small = i != 1;
                if !line.is_empty() {
                    painter.text(
                        Pos2::new(screen_rect.center().x, y),
                        egui::Align2::CENTER_CENTER,
                        line,
                        egui::FontId::proportional(if small { 10.0 } else { 13.0 } * self.canvas.zoom),
                        if small { Color32::from_gray(170) } else { Color32::WHITE },
                    );
                }
                y += LABEL_LINE_HEIGHT * self.canvas.zoom;
            }
            for property in &endpoint.properties {
                painter.text(
                    Pos2::new(screen_rect.center().x, y),
                    egui::Align2::CENTER_CENTER,
                    property,
                    egui::FontId::proportional(9.0 * self.canvas.zoom),
                    Color32::from_gray(140),
                );
                y += LABEL_LINE_HEIGHT * self.canvas.zoom;
            }

            let count = endpoint.port_count();
            for (i, port) in endpoint.ports().enumerate() {
                let pos = Self::port_anchor(screen_rect, i, count);
                self.draw_port(painter, port, pos);
            }
        }
    }

    fn draw_port(&self, painter: &egui::Painter, port: &Port, pos: Pos2) {
        let radius = port.style.radius * self.canvas.zoom;
        let [r, g, b] = port.style.fill;
        let mut fill = Color32::from_rgb(r, g, b);
        if !port.enabled {
            fill = fill.gamma_multiply(FADED_OPACITY);
        }
        let is_hovered = self.hovered_port.as_ref() == Some(&port.key);

        painter.circle_filled(pos, if is_hovered { radius * 1.3 } else { radius }, fill);

        let [r, g, b] = port.stroke();
        painter.circle_stroke(
            pos,
            radius,
            Stroke::new(port.style.line_width * self.canvas.zoom * 0.5, Color32::from_rgb(r, g, b)),
        );

        // Port label
        painter.text(
            Pos2::new(pos.x, pos.y - radius - 6.0 * self.canvas.zoom),
            egui::Align2::CENTER_BOTTOM,
            &port.key.port,
            egui::FontId::proportional(10.0 * self.canvas.zoom),
            Color32::from_gray(200),
        );
    }
}

/// Distance from `p` to the segment `a`-`b`
fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Generate points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
        let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;

        points.push(Pos2::new(x, y));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_round_trip() {
        let mut canvas = Canvas::new();
        canvas.pan = Vec2::new(15.0, -40.0);
        canvas.zoom = 2.0;
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));

        let graph = Pos2::new(12.0, 34.0);
        let back = canvas.screen_to_graph(canvas.graph_to_screen(graph, rect), rect);
        assert!((back - graph).length() < 1e-4);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(1.0, 1.0), a, a), 2f32.sqrt());
    }

    #[test]
    fn test_bezier_endpoints() {
        let points = bezier_points(
            Pos2::new(0.0, 0.0),
            Pos2::new(0.0, 50.0),
            Pos2::new(100.0, 50.0),
            Pos2::new(100.0, 0.0),
            8,
        );
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], Pos2::new(0.0, 0.0));
        assert_eq!(points[8], Pos2::new(100.0, 0.0));
    }

    #[test]
    fn test_port_anchor_spacing() {
        let rect = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(160.0, 80.0));
        assert_eq!(ConnectionEditorUi::port_anchor(rect, 0, 1), Pos2::new(80.0, 80.0));
        assert_eq!(ConnectionEditorUi::port_anchor(rect, 1, 3), Pos2::new(80.0, 80.0));
    }
}
