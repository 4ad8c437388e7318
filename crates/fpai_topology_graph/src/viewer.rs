// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure state of the read-only topology viewer.
//!
//! Holds the node/edge collection from the last loaded [`GraphSnapshot`],
//! the current selection and the set of faded elements. Drawing lives in
//! [`crate::ui`]; everything here is testable without a rendering surface.

use crate::snapshot::{EdgeData, GraphSnapshot, NodeData};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Minimum radius of the circular node layout
const LAYOUT_MIN_RADIUS: f32 = 120.0;
/// Arc length reserved per node on the layout circle
const LAYOUT_NODE_SPACING: f32 = 90.0;

/// Reference to a node or edge by id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementRef {
    /// Node id
    Node(String),
    /// Edge id
    Edge(String),
}

/// What the user has tapped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Blank canvas
    #[default]
    Nothing,
    /// A node
    Node(String),
    /// An edge
    Edge(String),
}

/// Notification for surrounding widgets (details panel, action buttons)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// A node was tapped
    NodeSelected(String),
    /// An edge was tapped
    EdgeSelected(String),
    /// Blank canvas was tapped
    NothingSelected,
}

/// Enabled state of the connect/disconnect action pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    /// Connect the selected edge
    pub connect: bool,
    /// Disconnect the selected edge
    pub disconnect: bool,
}

/// Visual classes of one element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementClasses {
    /// Outside the selected neighborhood
    pub faded: bool,
    /// The element itself is selected
    pub selected: bool,
    /// Edge reported as an active connection
    pub isconnected: bool,
}

/// A node of the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerNode {
    /// Payload from the server
    pub data: NodeData,
    /// Position in canvas space
    pub position: [f32; 2],
}

/// Viewer state for one topology graph
#[derive(Debug, Clone, Default)]
pub struct TopologyViewer {
    nodes: IndexMap<String, ViewerNode>,
    edges: IndexMap<String, EdgeData>,
    selection: Selection,
    faded: HashSet<ElementRef>,
    actions: ActionState,
    events: Vec<SelectionEvent>,
}

impl TopologyViewer {
    /// Create an empty viewer
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole graph with `snapshot`.
    ///
    /// Selection and fading are cleared and both actions disabled. Edges
    /// whose endpoints are missing from the snapshot are skipped.
    pub fn load(&mut self, snapshot: GraphSnapshot) {
        self.nodes.clear();
        self.edges.clear();
        self.faded.clear();
        self.selection = Selection::Nothing;
        self.actions = ActionState::default();

        let count = snapshot.nodes.len();
        for (ix, element) in snapshot.nodes.into_iter().enumerate() {
            let position = circle_position(ix, count);
            self.nodes.insert(
                element.data.id.clone(),
                ViewerNode {
                    data: element.data,
                    position,
                },
            );
        }

        for element in snapshot.edges {
            let edge = element.data;
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                tracing::warn!(
                    edge = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "edge references unknown node, skipping"
                );
                continue;
            }
            self.edges.insert(edge.id.clone(), edge);
        }

        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            connected = self.edges.values().filter(|e| e.isconnected).count(),
            "topology graph loaded"
        );
    }

    /// Tap a node: select it and its direct neighborhood
    pub fn tap_node(&mut self, id: &str) -> Option<SelectionEvent> {
        if !self.nodes.contains_key(id) {
            return None;
        }

        let mut keep = HashSet::from([ElementRef::Node(id.to_string())]);
        for edge in self.edges.values().filter(|e| e.source == id || e.target == id) {
            keep.insert(ElementRef::Edge(edge.id.clone()));
            keep.insert(ElementRef::Node(edge.source.clone()));
            keep.insert(ElementRef::Node(edge.target.clone()));
        }
        self.fade_all_except(&keep);

        self.selection = Selection::Node(id.to_string());
        self.actions = ActionState::default();
        Some(self.emit(SelectionEvent::NodeSelected(id.to_string())))
    }

    /// Tap an edge: select it and its two endpoint nodes
    pub fn tap_edge(&mut self, id: &str) -> Option<SelectionEvent> {
        let edge = self.edges.get(id)?;
        let keep = HashSet::from([
            ElementRef::Edge(edge.id.clone()),
            ElementRef::Node(edge.source.clone()),
            ElementRef::Node(edge.target.clone()),
        ]);
        let isconnected = edge.isconnected;
        self.fade_all_except(&keep);

        self.selection = Selection::Edge(id.to_string());
        self.actions = ActionState {
            connect: !isconnected,
            disconnect: isconnected,
        };
        Some(self.emit(SelectionEvent::EdgeSelected(id.to_string())))
    }

    /// Tap blank canvas: clear selection and fading
    pub fn tap_background(&mut self) -> SelectionEvent {
        self.faded.clear();
        self.selection = Selection::Nothing;
        self.actions = ActionState::default();
        self.emit(SelectionEvent::NothingSelected)
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Enabled state of the connect/disconnect actions
    pub fn actions(&self) -> ActionState {
        self.actions
    }

    /// Currently selected edge, if any
    pub fn selected_edge(&self) -> Option<&EdgeData> {
        match &self.selection {
            Selection::Edge(id) => self.edges.get(id),
            _ => None,
        }
    }

    /// Currently selected node, if any
    pub fn selected_node(&self) -> Option<&ViewerNode> {
        match &self.selection {
            Selection::Node(id) => self.nodes.get(id),
            _ => None,
        }
    }

    /// Whether an element is faded
    pub fn is_faded(&self, element: &ElementRef) -> bool {
        self.faded.contains(element)
    }

    /// Visual classes of an element
    pub fn classes(&self, element: &ElementRef) -> ElementClasses {
        let (selected, isconnected) = match element {
            ElementRef::Node(id) => (self.selection == Selection::Node(id.clone()), false),
            ElementRef::Edge(id) => (
                self.selection == Selection::Edge(id.clone()),
                self.edges.get(id).is_some_and(|e| e.isconnected),
            ),
        };
        ElementClasses {
            faded: self.is_faded(element),
            selected,
            isconnected,
        }
    }

    /// Drain selection events not yet seen by the host
    pub fn take_events(&mut self) -> Vec<SelectionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get a node by id
    pub fn node(&self, id: &str) -> Option<&ViewerNode> {
        self.nodes.get(id)
    }

    /// Get a mutable node by id
    pub fn node_mut(&mut self, id: &str) -> Option<&mut ViewerNode> {
        self.nodes.get_mut(id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &ViewerNode> {
        self.nodes.values()
    }

    /// Get an edge by id
    pub fn edge(&self, id: &str) -> Option<&EdgeData> {
        self.edges.get(id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &EdgeData> {
        self.edges.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn fade_all_except(&mut self, keep: &HashSet<ElementRef>) {
        self.faded = self
            .nodes
            .keys()
            .map(|id| ElementRef::Node(id.clone()))
            .chain(self.edges.keys().map(|id| ElementRef::Edge(id.clone())))
            .filter(|element| !keep.contains(element))
            .collect();
    }

    fn emit(&mut self, event: SelectionEvent) -> SelectionEvent {
        self.events.push(event.clone());
        event
    }
}

fn circle_position(ix: usize, count: usize) -> [f32; 2] {
    if count <= 1 {
        return [0.0, 0.0];
    }
    let radius = (count as f32 * LAYOUT_NODE_SPACING / std::f32::consts::TAU).max(LAYOUT_MIN_RADIUS);
    let angle = ix as f32 / count as f32 * std::f32::consts::TAU;
    [radius * angle.cos(), radius * angle.sin()]
}
