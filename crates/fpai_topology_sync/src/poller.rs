// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background polling task.
//!
//! Ticks fetch the topology graph until one load succeeds and the
//! connection state every time. Later graph reloads are left to explicit
//! refreshes and command resyncs, since loading a graph resets the viewer's
//! selection. Each tick sleeps for a delay that depends on whether its
//! fetches succeeded. A slow tick is never overlapped by the next.

use crate::client::SyncClient;
use crate::config::SyncConfig;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Two-tier polling interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after a successful poll
    pub interval: Duration,
    /// Delay after a failed poll
    pub retry_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            retry_interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    /// Take the intervals from the sync configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            retry_interval: config.retry_interval(),
        }
    }

    /// Delay before the next poll
    pub fn next_delay(&self, success: bool) -> Duration {
        if success {
            self.interval
        } else {
            self.retry_interval
        }
    }
}

/// Spawns polling tasks
pub struct Poller;

impl Poller {
    /// Start polling on the current Tokio runtime.
    ///
    /// The first poll runs immediately.
    pub fn spawn(client: SyncClient, policy: PollPolicy) -> PollerHandle {
        Self::spawn_on(&tokio::runtime::Handle::current(), client, policy)
    }

    /// Start polling on the given runtime
    pub fn spawn_on(runtime: &tokio::runtime::Handle, client: SyncClient, policy: PollPolicy) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = runtime.spawn(async move {
            tracing::info!(
                interval_ms = policy.interval.as_millis() as u64,
                retry_interval_ms = policy.retry_interval.as_millis() as u64,
                "poller started"
            );
            let mut graph_loaded = false;
            loop {
                let success = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    success = poll_once(&client, &mut graph_loaded) => success,
                };

                let delay = policy.next_delay(success);
                if !success {
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "poll failed, backing off");
                }

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            tracing::info!("poller shutting down");
        });

        PollerHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }
}

/// One tick; `graph_loaded` is set once a graph fetch succeeds
async fn poll_once(client: &SyncClient, graph_loaded: &mut bool) -> bool {
    let mut success = true;
    if !*graph_loaded {
        *graph_loaded = client.refresh().await.is_ok();
        success = *graph_loaded;
    }
    client.load_state().await.is_ok() && success
}

/// Handle to a running poller; dropping it stops the task
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the task to stop; an in-flight fetch is abandoned
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Task already gone when the receiver is dropped
            let _ = tx.send(());
        }
    }

    /// Stop the task and wait until it has exited
    pub async fn shutdown(mut self) {
        self.stop();
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "poller task failed");
        }
    }

    /// Whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
