// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcsim-opcua
//!
//! OPC UA transports for the opcsim update and poll loops.
//!
//! - [`nodes`]: Address space layout and pre-listen staging
//! - [`settings`]: Application URIs and certificate store locations
//! - `OpcUaServerTransport` / `OpcUaClientTransport`: the `opcua`-backed
//!   implementations of the core transport traits
//!
//! ## Feature Flags
//!
//! - `real-transport`: Enables the `opcua`-backed transports. Without it the
//!   crate only provides the layout and settings types, and the loops run on
//!   the in-process loopback transport of `opcsim-core`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod nodes;
pub mod settings;

#[cfg(feature = "real-transport")]
pub mod client;
#[cfg(feature = "real-transport")]
pub mod convert;
#[cfg(feature = "real-transport")]
pub mod server;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use nodes::{find_namespace, node_identifier, NamespaceTable, NodeKey, StagedTags};
pub use settings::{OpcUaClientSettings, OpcUaServerSettings};

#[cfg(feature = "real-transport")]
pub use client::OpcUaClientTransport;
#[cfg(feature = "real-transport")]
pub use server::OpcUaServerTransport;
