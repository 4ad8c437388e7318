// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sync client: runs fetches and commands off the UI thread and hands the
//! results back as [`SyncEvent`]s.
//!
//! The client never mutates graph state itself. Results are applied in the
//! order they complete, on whichever thread drains the event channel.

use crate::transport::{TopologyTransport, TransportError};
use fpai_topology_graph::port::PortRef;
use fpai_topology_graph::snapshot::{CurrentState, GraphSnapshot};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Server operation issued by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetch the topology graph
    Refresh,
    /// Fetch the editor state
    LoadState,
    /// Autoconnect command
    Autoconnect,
    /// Connect command
    Connect,
    /// Disconnect command
    Disconnect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Refresh => "refresh",
            Operation::LoadState => "load state",
            Operation::Autoconnect => "autoconnect",
            Operation::Connect => "connect",
            Operation::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

/// Port-to-port command the user can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCommand {
    /// Wire two ports together
    Connect,
    /// Remove the wiring between two ports
    Disconnect,
}

impl PortCommand {
    /// Operation reported in sync events for this command
    pub fn operation(self) -> Operation {
        match self {
            PortCommand::Connect => Operation::Connect,
            PortCommand::Disconnect => Operation::Disconnect,
        }
    }
}

/// Result delivered to the UI thread
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A fresh topology graph
    GraphLoaded(GraphSnapshot),
    /// A fresh editor state
    StateLoaded(CurrentState),
    /// A connect or disconnect command was answered
    CommandCompleted {
        /// Which command
        operation: Operation,
        /// Whether the server applied it
        accepted: bool,
    },
    /// A fetch or command failed; the previous graph stays in place
    Failed {
        /// Which operation
        operation: Operation,
        /// Error text
        error: String,
    },
}

/// Health of the connection to the server
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Completion time of the last successful operation
    pub last_success: Option<Instant>,
    /// Last error, cleared on success
    pub last_error: Option<String>,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

impl SyncStatus {
    fn record_success(&mut self) {
        self.last_success = Some(Instant::now());
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.consecutive_failures += 1;
    }

    /// Whether the last operation succeeded
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }
}

/// Status shared between the client tasks and the UI
pub type SharedStatus = Arc<RwLock<SyncStatus>>;

/// Cheaply clonable handle issuing server operations
#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn TopologyTransport>,
    events: mpsc::UnboundedSender<SyncEvent>,
    status: SharedStatus,
}

impl fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Create a client and the receiving end of its event channel
    pub fn new(transport: Arc<dyn TopologyTransport>) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let client = Self {
            transport,
            events,
            status: Arc::new(RwLock::new(SyncStatus::default())),
        };
        (client, rx)
    }

    /// Shared connection status
    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Fetch the topology graph; the viewer replaces its contents on arrival
    pub async fn refresh(&self) -> Result<(), TransportError> {
        match self.transport.fetch_graph().await {
            Ok(snapshot) => {
                self.succeeded();
                self.send(SyncEvent::GraphLoaded(snapshot));
                Ok(())
            }
            Err(e) => Err(self.failed(Operation::Refresh, e)),
        }
    }

    /// Fetch the endpoint/port state for the editor
    pub async fn load_state(&self) -> Result<(), TransportError> {
        match self.transport.fetch_state().await {
            Ok(state) => {
                self.succeeded();
                self.send(SyncEvent::StateLoaded(state));
                Ok(())
            }
            Err(e) => Err(self.failed(Operation::LoadState, e)),
        }
    }

    /// Fetch graph and state; fails if either fetch failed
    pub async fn refresh_all(&self) -> Result<(), TransportError> {
        let graph = self.refresh().await;
        let state = self.load_state().await;
        graph.and(state)
    }

    /// Run the autoconnect command, then refresh regardless of its outcome.
    ///
    /// Only the refresh result is returned.
    pub async fn autoconnect(&self) -> Result<(), TransportError> {
        match self.transport.autoconnect().await {
            Ok(result) => tracing::info!(%result, "autoconnect finished"),
            Err(e) => {
                self.failed(Operation::Autoconnect, e);
            }
        }
        self.refresh().await
    }

    /// Connect two ports, then resync both views
    pub async fn connect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
        let result = self.transport.connect(source, target).await;
        self.finish_command(Operation::Connect, source, target, result).await
    }

    /// Disconnect two ports, then resync both views
    pub async fn disconnect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
        let result = self.transport.disconnect(source, target).await;
        self.finish_command(Operation::Disconnect, source, target, result).await
    }

    /// Issue a port command, then resync both views
    pub async fn send_port_command(
        &self,
        command: PortCommand,
        source: &PortRef,
        target: &PortRef,
    ) -> Result<bool, TransportError> {
        match command {
            PortCommand::Connect => self.connect(source, target).await,
            PortCommand::Disconnect => self.disconnect(source, target).await,
        }
    }

    async fn finish_command(
        &self,
        operation: Operation,
        source: &PortRef,
        target: &PortRef,
        result: Result<bool, TransportError>,
    ) -> Result<bool, TransportError> {
        let accepted = match result {
            Ok(accepted) => accepted,
            Err(e) => return Err(self.failed(operation, e)),
        };

        self.succeeded();
        if accepted {
            tracing::info!(%operation, %source, %target, "command applied");
        } else {
            tracing::warn!(%operation, %source, %target, "command refused by server");
        }
        self.send(SyncEvent::CommandCompleted { operation, accepted });

        // Failures are already logged and reported as events
        let _ = self.refresh_all().await;
        Ok(accepted)
    }

    fn succeeded(&self) {
        self.status.write().record_success();
    }

    fn failed(&self, operation: Operation, error: TransportError) -> TransportError {
        tracing::warn!(%operation, error = %error, "operation failed");
        self.status.write().record_failure(error.to_string());
        self.send(SyncEvent::Failed {
            operation,
            error: error.to_string(),
        });
        error
    }

    fn send(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("sync event receiver dropped");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use fpai_topology_graph::snapshot::{EdgeData, Element, NodeData};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory transport counting calls
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub fail: AtomicBool,
        pub fail_autoconnect: AtomicBool,
        pub graph_fetches: AtomicUsize,
        pub state_fetches: AtomicUsize,
        pub autoconnects: AtomicUsize,
        pub commands: Mutex<Vec<(Operation, PortRef, PortRef)>>,
    }

    impl MockTransport {
        fn check(&self) -> Result<(), TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    status: 503,
                    reason: "Service Unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    pub(crate) fn sample_graph() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                Element::new(NodeData::new("pm", "PowerManager")),
                Element::new(NodeData::new("dw", "Dishwasher")),
            ],
            edges: vec![Element::new(EdgeData::new(
                "pm:timeshifter-dw:controller",
                "pm",
                "dw",
                false,
            ))],
        }
    }

    #[async_trait]
    impl TopologyTransport for MockTransport {
        async fn fetch_graph(&self) -> Result<GraphSnapshot, TransportError> {
            self.graph_fetches.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(sample_graph())
        }

        async fn fetch_state(&self) -> Result<CurrentState, TransportError> {
            self.state_fetches.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(CurrentState::default())
        }

        async fn autoconnect(&self) -> Result<String, TransportError> {
            self.autoconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_autoconnect.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    status: 500,
                    reason: "Internal Server Error".to_string(),
                });
            }
            Ok(String::new())
        }

        async fn connect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
            self.check()?;
            self.commands
                .lock()
                .push((Operation::Connect, source.clone(), target.clone()));
            Ok(true)
        }

        async fn disconnect(&self, source: &PortRef, target: &PortRef) -> Result<bool, TransportError> {
            self.check()?;
            self.commands
                .lock()
                .push((Operation::Disconnect, source.clone(), target.clone()));
            Ok(false)
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_refresh_delivers_graph() {
        let transport = Arc::new(MockTransport::default());
        let (client, mut rx) = SyncClient::new(transport.clone());

        client.refresh().await.unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SyncEvent::GraphLoaded(g) if g.nodes.len() == 2));
        assert!(client.status().read().is_healthy());
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_retried() {
        let transport = Arc::new(MockTransport::default());
        transport.fail.store(true, Ordering::SeqCst);
        let (client, mut rx) = SyncClient::new(transport.clone());

        let error = client.refresh().await.unwrap_err();
        assert!(matches!(error, TransportError::Status { status: 503, .. }));
        assert_eq!(transport.graph_fetches.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        assert!(matches!(
            &events[..],
            [SyncEvent::Failed { operation: Operation::Refresh, error }] if error.contains("503")
        ));
        let status = client.status();
        assert_eq!(status.read().consecutive_failures, 1);
        assert!(status.read().last_error.is_some());
    }

    #[tokio::test]
    async fn test_autoconnect_always_refreshes() {
        let transport = Arc::new(MockTransport::default());
        transport.fail_autoconnect.store(true, Ordering::SeqCst);
        let (client, mut rx) = SyncClient::new(transport.clone());

        client.autoconnect().await.unwrap();
        assert_eq!(transport.autoconnects.load(Ordering::SeqCst), 1);
        assert_eq!(transport.graph_fetches.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        assert!(matches!(
            &events[..],
            [SyncEvent::Failed { operation: Operation::Autoconnect, .. }, SyncEvent::GraphLoaded(_)]
        ));
        // Refresh succeeded after the failed command
        assert!(client.status().read().is_healthy());
    }

    #[tokio::test]
    async fn test_commands_post_ports_and_resync() {
        let transport = Arc::new(MockTransport::default());
        let (client, mut rx) = SyncClient::new(transport.clone());
        let source = PortRef::new("pm", "timeshifter");
        let target = PortRef::new("dw", "controller");

        assert!(client.connect(&source, &target).await.unwrap());
        assert!(!client.disconnect(&source, &target).await.unwrap());

        let commands = transport.commands.lock().clone();
        assert_eq!(
            commands,
            vec![
                (Operation::Connect, source.clone(), target.clone()),
                (Operation::Disconnect, source, target),
            ]
        );
        assert_eq!(transport.graph_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(transport.state_fetches.load(Ordering::SeqCst), 2);

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            SyncEvent::CommandCompleted { operation: Operation::Connect, accepted: true }
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_harmless() {
        let transport = Arc::new(MockTransport::default());
        let (client, rx) = SyncClient::new(transport);
        drop(rx);
        client.refresh_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_port_command_dispatches_by_kind() {
        let transport = Arc::new(MockTransport::default());
        let (client, mut rx) = SyncClient::new(transport.clone());
        let source = PortRef::new("pm", "timeshifter");
        let target = PortRef::new("dw", "controller");

        let accepted = client
            .send_port_command(PortCommand::Disconnect, &source, &target)
            .await
            .unwrap();
        assert!(!accepted);
        assert_eq!(
            transport.commands.lock().clone(),
            vec![(Operation::Disconnect, source, target)]
        );
        assert_eq!(PortCommand::Connect.operation(), Operation::Connect);

        let events = drain(&mut rx);
        assert!(matches!(
            events[0],
            SyncEvent::CommandCompleted { operation: Operation::Disconnect, accepted: false }
        ));
    }
}
