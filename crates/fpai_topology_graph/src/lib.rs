// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection topology model for FPAI dashboards.
//!
//! This crate provides the client-side state behind two views:
//! - A read-only topology viewer (nodes, edges, tap selection)
//! - An interactive port-to-port connection editor
//!
//! ## Architecture
//!
//! The model is built from:
//! - Endpoint identifier parsing for display labels
//! - An endpoint/port registry with potential-target declarations
//! - A drag constraint engine that only enables legal drop targets
//! - Wire formats of the `getGraph` and `currentState` responses
//! - A layered layout for endpoints without explicit position
//! - egui draw adapters for both views

pub mod endpoint_id;
pub mod port;
pub mod connection;
pub mod endpoint;
pub mod registry;
pub mod constraint;
pub mod snapshot;
pub mod layout;
pub mod viewer;
pub mod editor;
pub mod ui;

pub use endpoint_id::{EndpointId, IdentifierParts};
pub use port::{MaxConnections, Port, PortRef, PortStyle, PortVisualType};
pub use connection::{Connection, ConnectionId};
pub use endpoint::{Endpoint, EndpointSpec, EndpointStyle, PortSpec};
pub use registry::{RegistryError, TopologyRegistry};
pub use constraint::{ConnectRequest, ConnectionConstraints, DragError, DragOutcome, DragState};
pub use snapshot::{CurrentState, GraphSnapshot, SnapshotError};
pub use viewer::{ActionState, ElementRef, Selection, SelectionEvent, TopologyViewer};
pub use editor::{ConnectionEditor, LoadSummary};
