// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared panel type definitions.

/// Panel types that can be docked in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelType {
    /// Read-only topology graph
    TopologyViewer,
    /// Port-to-port connection editor
    ConnectionEditor,
    /// Details of the current selection
    Details,
}

impl PanelType {
    /// Get the display name for this panel type
    pub fn name(&self) -> &'static str {
        match self {
            Self::TopologyViewer => "Topology",
            Self::ConnectionEditor => "Connections",
            Self::Details => "Details",
        }
    }

    /// Get the icon for this panel type
    pub fn icon(&self) -> &'static str {
        match self {
            Self::TopologyViewer => "\u{1f310}",   // globe
            Self::ConnectionEditor => "\u{1f50c}", // plug
            Self::Details => "\u{2139}",           // info
        }
    }
}
