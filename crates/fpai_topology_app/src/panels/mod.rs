// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dashboard panel implementations.

mod details;

pub use details::DetailsPanel;
