// SPDX-License-Identifier: MIT OR Apache-2.0
//! FPAI connection topology dashboard
//!
//! A desktop host for the connection manager featuring:
//! - Topology viewer with neighborhood highlighting
//! - Port-to-port connection editor with drag constraints
//! - Details panel for the tapped node or edge
//! - Refresh, autoconnect, connect and disconnect commands
//!
//! ## Usage
//!
//! `fpai_topology [config.ron]`; the config defaults to `fpai_topology.ron`
//! in the working directory and `FPAI_BASE_URL` overrides the server URL.

mod app;
mod panel_types;
mod panels;

use app::TopologyApp;
use fpai_topology_sync::SyncConfig;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Config file used when none is given on the command line
const DEFAULT_CONFIG: &str = "fpai_topology.ron";

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fpai_topology=debug".parse().unwrap())
        .add_directive("wgpu=warn".parse().unwrap())
        .add_directive("naga=warn".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FPAI topology dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);

    let config = match SyncConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(base_url = %config.base_url, "sync configuration loaded");

    if let Err(e) = TopologyApp::run(&config) {
        tracing::error!("Dashboard stopped: {e}");
        std::process::exit(1);
    }
}
