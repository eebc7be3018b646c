// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcsim-core
//!
//! Core of the opcsim mock OPC UA tag server and poller.
//!
//! This crate provides everything that is independent of the wire protocol:
//!
//! - **Registry**: The in-memory tag store owned by the server
//! - **Server**: The update loop that redraws tag values once per tick
//! - **Client**: The poll loop that reads remote tags once per tick
//! - **Transport**: Traits for the protocol collaborator, plus an in-process
//!   loopback implementation
//! - **Shutdown**: Interrupt handling shared by both loops
//!
//! ## Example
//!
//! ```rust,ignore
//! use opcsim_core::{
//!     ClientConfig, LoopbackClient, LoopbackNetwork, LoopbackServer, PollLoop,
//!     ServerConfig, ShutdownCoordinator, UniformSource, UpdateLoop,
//! };
//!
//! let network = LoopbackNetwork::new();
//! let coordinator = ShutdownCoordinator::new();
//!
//! let mut server = UpdateLoop::new(
//!     ServerConfig::default(),
//!     LoopbackServer::new(network.clone()),
//!     UniformSource::from_entropy(),
//! )?;
//! let mut client = PollLoop::new(ClientConfig::default(), LoopbackClient::new(network))?;
//!
//! server.start().await?;
//! client.connect().await?;
//! let report = client.tick().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod address;
pub mod config;
pub mod error;
pub mod types;

// =============================================================================
// Registry & Loops
// =============================================================================

pub mod client;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod source;

// =============================================================================
// Transport
// =============================================================================

pub mod loopback;
pub mod transport;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use address::*;
pub use error::*;
pub use types::*;

pub use client::{CachedTag, PollLoop, PollState};
pub use config::{
    default_tags, ClientConfig, ServerConfig, TagRef, TagSpec, DEFAULT_CLIENT_ENDPOINT,
    DEFAULT_DEVICE_NAME, DEFAULT_NAMESPACE_URI, DEFAULT_SERVER_ENDPOINT, DEFAULT_SERVER_NAME,
    TICK_PERIOD,
};
pub use loopback::{LoopbackClient, LoopbackNetwork, LoopbackServer, LoopbackStats};
pub use registry::{SharedRegistry, TagAccessor, TagRegistry};
pub use server::{UpdateLoop, UpdateState};
pub use shutdown::{ShutdownCoordinator, ShutdownToken};
pub use source::{UniformSource, ValueSource};
pub use transport::{ClientTransport, ServerTransport, TransportResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
