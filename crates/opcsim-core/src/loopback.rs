// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process transport.
//!
//! [`LoopbackServer`] and [`LoopbackClient`] implement the transport traits
//! over a shared [`LoopbackNetwork`] instead of sockets. Endpoints are matched
//! with [`Endpoint::accepts`], so a server on `opc.tcp://0.0.0.0:4842` is
//! reachable as `opc.tcp://localhost:4842`, exactly as with the real stack.
//!
//! Sessions observe the server's lifecycle: once the server unlistens, reads
//! and writes on existing sessions fail and new connects are refused.
//!
//! # Examples
//!
//! ```
//! use opcsim_core::loopback::{LoopbackClient, LoopbackNetwork, LoopbackServer};
//!
//! let network = LoopbackNetwork::new();
//! let server = LoopbackServer::new(network.clone());
//! let client = LoopbackClient::new(network.clone());
//! assert!(!client.is_connected_to_any());
//! # drop(server);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::address::{Endpoint, TagHandle, TagPath};
use crate::error::TransportError;
use crate::registry::TagAccessor;
use crate::transport::{ClientTransport, ServerTransport, TransportResult};

/// Namespace 0, the OPC UA standard namespace.
const STANDARD_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Namespace 1, the server's local namespace.
const LOCAL_NAMESPACE_URI: &str = "urn:opcsim:loopback";

// =============================================================================
// LoopbackNetwork
// =============================================================================

/// A shared in-process "network" of listening loopback servers.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    sites: Arc<Mutex<Vec<Arc<Site>>>>,
    stats: Arc<Counters>,
}

/// Operation counters across all sites of a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    /// Sessions opened.
    pub sessions: u64,
    /// Successful path resolutions.
    pub resolves: u64,
    /// Successful reads.
    pub reads: u64,
    /// Successful writes.
    pub writes: u64,
}

#[derive(Default)]
struct Counters {
    sessions: AtomicU64,
    resolves: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl LoopbackNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> LoopbackStats {
        LoopbackStats {
            sessions: self.stats.sessions.load(Ordering::SeqCst),
            resolves: self.stats.resolves.load(Ordering::SeqCst),
            reads: self.stats.reads.load(Ordering::SeqCst),
            writes: self.stats.writes.load(Ordering::SeqCst),
        }
    }

    /// Returns the number of listening servers.
    pub fn listener_count(&self) -> usize {
        self.sites.lock().len()
    }

    fn find(&self, endpoint: &Endpoint) -> Option<Arc<Site>> {
        self.sites
            .lock()
            .iter()
            .find(|site| site.endpoint.accepts(endpoint))
            .cloned()
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("listeners", &self.listener_count())
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// AddressSpace / Site
// =============================================================================

struct AddressSpace {
    namespaces: RwLock<Vec<String>>,
    nodes: RwLock<HashMap<TagPath, TagAccessor>>,
}

impl AddressSpace {
    fn new() -> Self {
        Self {
            namespaces: RwLock::new(vec![
                STANDARD_NAMESPACE_URI.to_string(),
                LOCAL_NAMESPACE_URI.to_string(),
            ]),
            nodes: RwLock::new(HashMap::new()),
        }
    }
}

struct Site {
    endpoint: Endpoint,
    server_name: String,
    space: Arc<AddressSpace>,
    open: AtomicBool,
}

impl Site {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

// =============================================================================
// LoopbackServer
// =============================================================================

/// In-process [`ServerTransport`].
pub struct LoopbackServer {
    network: LoopbackNetwork,
    space: Arc<AddressSpace>,
    site: Option<Arc<Site>>,
}

impl LoopbackServer {
    /// Creates a server attached to `network`.
    pub fn new(network: LoopbackNetwork) -> Self {
        Self {
            network,
            space: Arc::new(AddressSpace::new()),
            site: None,
        }
    }

    /// Returns the number of published tags.
    pub fn published_count(&self) -> usize {
        self.space.nodes.read().len()
    }
}

#[async_trait]
impl ServerTransport for LoopbackServer {
    async fn register_namespace(&mut self, uri: &str) -> TransportResult<u16> {
        let mut namespaces = self.space.namespaces.write();
        let index = match namespaces.iter().position(|ns| ns == uri) {
            Some(existing) => existing,
            None => {
                namespaces.push(uri.to_string());
                namespaces.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| TransportError::publish(uri, "Namespace table full"))
    }

    async fn publish(&mut self, path: &TagPath, accessor: TagAccessor) -> TransportResult<()> {
        let namespace_count = self.space.namespaces.read().len();
        if let Some(unknown) = path
            .segments()
            .iter()
            .find(|s| usize::from(s.namespace_index) >= namespace_count)
        {
            return Err(TransportError::publish(
                path.to_string(),
                format!("Namespace index {} is not registered", unknown.namespace_index),
            ));
        }

        let mut nodes = self.space.nodes.write();
        if nodes.contains_key(path) {
            return Err(TransportError::publish(path.to_string(), "Already published"));
        }
        debug!(path = %path, tag = accessor.name(), "Published tag");
        nodes.insert(path.clone(), accessor);
        Ok(())
    }

    async fn listen(&mut self, endpoint: &Endpoint, server_name: &str) -> TransportResult<()> {
        if let Some(site) = &self.site {
            return Err(TransportError::AlreadyListening {
                endpoint: site.endpoint.url(),
            });
        }

        let mut sites = self.network.sites.lock();
        if sites
            .iter()
            .any(|s| s.endpoint.accepts(endpoint) || endpoint.accepts(&s.endpoint))
        {
            return Err(TransportError::connection(endpoint.url(), "Address already in use"));
        }

        let site = Arc::new(Site {
            endpoint: endpoint.clone(),
            server_name: server_name.to_string(),
            space: self.space.clone(),
            open: AtomicBool::new(true),
        });
        sites.push(site.clone());
        self.site = Some(site);
        debug!(endpoint = %endpoint, server = server_name, "Loopback server listening");
        Ok(())
    }

    async fn unlisten(&mut self) -> TransportResult<()> {
        let site = self.site.take().ok_or(TransportError::NotListening)?;
        site.open.store(false, Ordering::SeqCst);
        self.network.sites.lock().retain(|s| !Arc::ptr_eq(s, &site));
        debug!(endpoint = %site.endpoint, server = %site.server_name, "Loopback server closed");
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.site.is_some()
    }
}

// =============================================================================
// LoopbackClient
// =============================================================================

/// In-process [`ClientTransport`].
pub struct LoopbackClient {
    network: LoopbackNetwork,
    session: Option<Arc<Site>>,
}

impl LoopbackClient {
    /// Creates a client attached to `network`.
    pub fn new(network: LoopbackNetwork) -> Self {
        Self {
            network,
            session: None,
        }
    }

    /// Returns `true` if a session object exists, even if the server closed it.
    pub fn is_connected_to_any(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> TransportResult<&Arc<Site>> {
        self.session.as_ref().ok_or(TransportError::NotConnected)
    }

    fn open_session(&self) -> TransportResult<&Arc<Site>> {
        let site = self.session()?;
        if !site.is_open() {
            return Err(TransportError::connection(
                site.endpoint.url(),
                "Session closed by server",
            ));
        }
        Ok(site)
    }

    fn accessor(&self, handle: &TagHandle) -> Option<TagAccessor> {
        self.session
            .as_ref()
            .and_then(|site| site.space.nodes.read().get(handle.path()).cloned())
    }
}

#[async_trait]
impl ClientTransport for LoopbackClient {
    async fn connect(&mut self, endpoint: &Endpoint) -> TransportResult<()> {
        let site = self
            .network
            .find(endpoint)
            .filter(|site| site.is_open())
            .ok_or_else(|| TransportError::connection(endpoint.url(), "No server listening"))?;
        self.network.stats.sessions.fetch_add(1, Ordering::SeqCst);
        debug!(endpoint = %endpoint, server = %site.server_name, "Loopback session opened");
        self.session = Some(site);
        Ok(())
    }

    async fn namespace_index(&self, uri: &str) -> TransportResult<u16> {
        let site = self.open_session()?;
        let namespaces = site.space.namespaces.read();
        namespaces
            .iter()
            .position(|ns| ns == uri)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| TransportError::address_not_found(uri))
    }

    async fn resolve(&self, path: &TagPath) -> TransportResult<TagHandle> {
        let site = self.open_session()?;
        if !site.space.nodes.read().contains_key(path) {
            return Err(TransportError::address_not_found(path.to_string()));
        }
        self.network.stats.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(TagHandle::new(path.clone(), path.to_string()))
    }

    async fn read_value(&self, handle: &TagHandle) -> TransportResult<f64> {
        let site = self.session()?;
        if !site.is_open() {
            return Err(TransportError::read(handle.node(), "Session closed by server"));
        }
        let accessor = self
            .accessor(handle)
            .ok_or_else(|| TransportError::read(handle.node(), "Node no longer exists"))?;
        let value = accessor
            .read()
            .map_err(|e| TransportError::read(handle.node(), e.to_string()))?;
        self.network.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    async fn write_value(&self, handle: &TagHandle, value: f64) -> TransportResult<()> {
        let site = self.session()?;
        if !site.is_open() {
            return Err(TransportError::write(handle.node(), "Session closed by server"));
        }
        let accessor = self
            .accessor(handle)
            .ok_or_else(|| TransportError::write(handle.node(), "Node no longer exists"))?;
        accessor
            .write(value)
            .map_err(|e| TransportError::write(handle.node(), e.to_string()))?;
        self.network.stats.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        self.session.take().ok_or(TransportError::NotConnected)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().map(|s| s.is_open()).unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================
