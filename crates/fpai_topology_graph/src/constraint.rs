// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-time connection constraints.
//!
//! While the user drags a new connection out of a source port, only the
//! source's potential targets accept a drop. Every other port is disabled
//! and marked with [`PortVisualType::Disabled`]. Ending the drag, whatever
//! its outcome, re-enables every port.
//!
//! Connection caps are not checked here. The server decides whether a
//! finished connection is accepted.

use crate::port::{PortRef, PortVisualType};
use crate::registry::TopologyRegistry;
use indexmap::IndexSet;

/// An in-progress drag from a source port
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Port the drag started from
    source: PortRef,
    /// Every port disabled when the session started
    disabled_at_start: Vec<PortRef>,
    /// Ports that accept a drop
    allowed: IndexSet<PortRef>,
}

impl DragSession {
    /// Port the drag started from
    pub fn source(&self) -> &PortRef {
        &self.source
    }

    /// Ports that were disabled when the session started
    pub fn disabled_at_start(&self) -> &[PortRef] {
        &self.disabled_at_start
    }

    /// Ports that accept a drop
    pub fn allowed(&self) -> &IndexSet<PortRef> {
        &self.allowed
    }

    /// Whether a drop on `target` may complete a connection
    pub fn accepts(&self, target: &PortRef) -> bool {
        *target != self.source && self.allowed.contains(target)
    }
}

/// Constraint engine state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    /// No drag in progress
    #[default]
    Idle,
    /// A drag is in progress
    Dragging(DragSession),
}

/// How a drag ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Released over a port
    Dropped(PortRef),
    /// Released elsewhere or aborted
    Cancelled,
}

/// A connection the user asked for by completing a drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Port the drag started from
    pub source: PortRef,
    /// Port the drag was dropped on
    pub target: PortRef,
}

/// Error when starting a drag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    /// A drag from another port has not ended yet
    #[error("Drag from {0} still in progress")]
    SessionActive(PortRef),

    /// The source port is not registered
    #[error("Port not found: {0}")]
    PortNotFound(PortRef),
}

/// Enables and disables ports around a drag-to-connect gesture
#[derive(Debug, Clone, Default)]
pub struct ConnectionConstraints {
    state: DragState,
}

impl ConnectionConstraints {
    /// Create an idle constraint engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Active session, if dragging
    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Whether a drop on `target` would be accepted right now
    pub fn can_drop(&self, target: &PortRef) -> bool {
        self.session().is_some_and(|s| s.accepts(target))
    }

    /// Start dragging from `source`: disable every port, then re-enable the
    /// source's potential targets. The new session is available through
    /// [`Self::session`].
    pub fn begin_drag(&mut self, registry: &mut TopologyRegistry, source: &PortRef) -> Result<(), DragError> {
        if let DragState::Dragging(session) = &self.state {
            return Err(DragError::SessionActive(session.source.clone()));
        }

        let allowed = registry
            .port(source)
            .ok_or_else(|| DragError::PortNotFound(source.clone()))?
            .potential_targets()
            .clone();

        let mut disabled_at_start = Vec::new();
        for port in registry.ports_mut() {
            port.enabled = false;
            port.visual_type = Some(PortVisualType::Disabled);
            disabled_at_start.push(port.key.clone());
        }

        if let Some(port) = registry.port_mut(source) {
            port.visual_type = None;
        }

        for target in &allowed {
            match registry.port_mut(target) {
                Some(port) => port.reset(),
                None => tracing::warn!(
                    source = %source,
                    target = %target,
                    "potential target not registered, leaving it out"
                ),
            }
        }

        tracing::debug!(source = %source, allowed = allowed.len(), "drag started");

        self.state = DragState::Dragging(DragSession {
            source: source.clone(),
            disabled_at_start,
            allowed,
        });
        Ok(())
    }

    /// End the drag. Every port is re-enabled and its visual type cleared,
    /// whatever the outcome. Returns the requested connection if the drop
    /// landed on an allowed port.
    pub fn end_drag(
        &mut self,
        registry: &mut TopologyRegistry,
        outcome: DragOutcome,
    ) -> Option<ConnectRequest> {
        for port in registry.ports_mut() {
            port.reset();
        }

        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return None;
        };

        match outcome {
            DragOutcome::Dropped(target) if session.accepts(&target) && registry.port(&target).is_some() => {
                tracing::debug!(source = %session.source, target = %target, "drag dropped on allowed port");
                Some(ConnectRequest {
                    source: session.source,
                    target,
                })
            }
            DragOutcome::Dropped(target) => {
                tracing::debug!(source = %session.source, target = %target, "drop rejected");
                None
            }
            DragOutcome::Cancelled => {
                tracing::debug!(source = %session.source, "drag cancelled");
                None
            }
        }
    }
}
