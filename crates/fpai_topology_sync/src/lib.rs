// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keeps the client-side topology eventually consistent with the FPAI
//! connection manager.
//!
//! - [`config`]: RON configuration with environment override
//! - [`transport`]: transport trait and its HTTP implementation
//! - [`client`]: non-blocking fetches and commands delivered as events
//! - [`poller`]: two-tier interval polling task
//! - [`session`]: owned graph state applying those events

pub mod config;
pub mod transport;
pub mod client;
pub mod poller;
pub mod session;

pub use config::{ConfigError, Route, SyncConfig};
pub use transport::{ConnectionInfo, HttpTransport, TopologyTransport, TransportError};
pub use client::{Operation, PortCommand, SharedStatus, SyncClient, SyncEvent, SyncStatus};
pub use poller::{PollPolicy, Poller, PollerHandle};
pub use session::Topology;
