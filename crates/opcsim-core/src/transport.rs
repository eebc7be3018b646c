// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport collaborator abstraction.
//!
//! The update and poll loops never speak the wire protocol themselves. They
//! drive a [`ServerTransport`] or [`ClientTransport`], which owns sessions,
//! namespace indexing, encoding and security. This keeps the loops testable
//! against the in-process [`loopback`](crate::loopback) transport and lets
//! the binaries plug in the real OPC UA stack.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync` so loops can run on any tokio
//! worker.

use async_trait::async_trait;

use crate::address::{Endpoint, TagHandle, TagPath};
use crate::error::TransportError;
use crate::registry::TagAccessor;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// ServerTransport
// =============================================================================

/// Server side of the protocol collaborator.
///
/// Expected call order: [`register_namespace`](Self::register_namespace),
/// [`publish`](Self::publish) for every tag, [`listen`](Self::listen),
/// and finally [`unlisten`](Self::unlisten).
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Registers a namespace URI and returns its index.
    async fn register_namespace(&mut self, uri: &str) -> TransportResult<u16>;

    /// Makes a tag visible for remote reads and writes at `path`.
    ///
    /// Remote reads go through `accessor.read()`, remote writes through
    /// `accessor.write()`, so the transport always serves the registry's
    /// current value.
    async fn publish(&mut self, path: &TagPath, accessor: TagAccessor) -> TransportResult<()>;

    /// Starts accepting remote sessions on `endpoint`.
    async fn listen(&mut self, endpoint: &Endpoint, server_name: &str) -> TransportResult<()>;

    /// Stops accepting sessions and releases the endpoint.
    async fn unlisten(&mut self) -> TransportResult<()>;

    /// Returns `true` while the transport is listening.
    fn is_listening(&self) -> bool;
}

// =============================================================================
// ClientTransport
// =============================================================================

/// Client side of the protocol collaborator.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    /// Establishes a session.
    ///
    /// # Errors
    ///
    /// [`TransportError::Connection`] if no session can be established.
    async fn connect(&mut self, endpoint: &Endpoint) -> TransportResult<()>;

    /// Looks up the index of a namespace URI on the connected server.
    ///
    /// # Errors
    ///
    /// [`TransportError::AddressNotFound`] if the server does not know the URI.
    async fn namespace_index(&self, uri: &str) -> TransportResult<u16>;

    /// Resolves a browse path to a handle.
    ///
    /// # Errors
    ///
    /// [`TransportError::AddressNotFound`] if the path does not resolve.
    async fn resolve(&self, path: &TagPath) -> TransportResult<TagHandle>;

    /// Reads the current value behind a handle.
    ///
    /// # Errors
    ///
    /// [`TransportError::Read`] if the value cannot be read.
    async fn read_value(&self, handle: &TagHandle) -> TransportResult<f64>;

    /// Writes a value behind a handle.
    ///
    /// # Errors
    ///
    /// [`TransportError::Write`] if the server rejects the write.
    async fn write_value(&self, handle: &TagHandle, value: f64) -> TransportResult<()>;

    /// Closes the session.
    async fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns `true` while a session is open.
    fn is_connected(&self) -> bool;
}
