// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topology session: the explicitly owned graph state of one dashboard.
//!
//! [`Topology`] holds the viewer and the connection editor. All mutations
//! coming from the server go through [`Topology::apply`], called on the UI
//! thread, so no two structural changes interleave.

use crate::client::{Operation, SyncEvent};
use crate::poller::PollerHandle;
use fpai_topology_graph::connection::parse_connection_key;
use fpai_topology_graph::constraint::ConnectRequest;
use fpai_topology_graph::editor::ConnectionEditor;
use fpai_topology_graph::port::PortRef;
use fpai_topology_graph::viewer::TopologyViewer;
use tokio::sync::mpsc;

/// Graph state of one dashboard plus its sync wiring
#[derive(Debug, Default)]
pub struct Topology {
    viewer: TopologyViewer,
    editor: ConnectionEditor,
    events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    poller: Option<PollerHandle>,
    last_error: Option<String>,
}

impl Topology {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the event stream of a sync client and its poller
    pub fn init(&mut self, events: mpsc::UnboundedReceiver<SyncEvent>, poller: Option<PollerHandle>) {
        if self.is_active() {
            tracing::debug!("re-initializing active topology session");
            self.dispose();
        }
        self.events = Some(events);
        self.poller = poller;
        tracing::info!("topology session initialized");
    }

    /// Stop polling, detach from the client and drop all graph state
    pub fn dispose(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.events = None;
        self.viewer = TopologyViewer::new();
        self.editor.reset();
        self.last_error = None;
        tracing::info!("topology session disposed");
    }

    /// Whether the session is attached to a client
    pub fn is_active(&self) -> bool {
        self.events.is_some()
    }

    /// Apply every pending event; returns how many were applied
    pub fn pump(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
        }
        let count = pending.len();
        for event in pending {
            self.apply(event);
        }
        count
    }

    /// Apply one server result to the graph state
    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::GraphLoaded(snapshot) => {
                self.viewer.load(snapshot);
                self.last_error = None;
            }
            SyncEvent::StateLoaded(state) => match self.editor.load_state(&state) {
                Ok(_) => self.last_error = None,
                Err(e) => {
                    tracing::warn!(error = %e, "rejected connection state, keeping previous");
                    self.last_error = Some(e.to_string());
                }
            },
            SyncEvent::CommandCompleted { operation, accepted } => {
                if !accepted {
                    self.last_error = Some(format!("{operation} refused by server"));
                }
            }
            SyncEvent::Failed { operation, error } => {
                // Previous graph stays until the next successful load
                self.last_error = Some(match operation {
                    Operation::Refresh | Operation::LoadState => error,
                    _ => format!("{operation}: {error}"),
                });
            }
        }
    }

    /// Viewer state
    pub fn viewer(&self) -> &TopologyViewer {
        &self.viewer
    }

    /// Mutable viewer state, for tap handling
    pub fn viewer_mut(&mut self) -> &mut TopologyViewer {
        &mut self.viewer
    }

    /// Connection editor state
    pub fn editor(&self) -> &ConnectionEditor {
        &self.editor
    }

    /// Mutable connection editor state, for drag handling
    pub fn editor_mut(&mut self) -> &mut ConnectionEditor {
        &mut self.editor
    }

    /// Last error reported by a load or command
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ports joined by the selected viewer edge; edge ids are connection keys
    pub fn selected_edge_ports(&self) -> Option<(PortRef, PortRef)> {
        let edge = self.viewer.selected_edge()?;
        match parse_connection_key(&edge.id) {
            Ok(ports) => Some(ports),
            Err(e) => {
                tracing::debug!(edge = %edge.id, error = %e, "selected edge has no port key");
                None
            }
        }
    }

    /// Drain connection requests produced by editor drags
    pub fn take_connect_requests(&mut self) -> Vec<ConnectRequest> {
        self.editor.take_requests()
    }
}
