// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The client-side poll loop.
//!
//! [`PollLoop`] connects once, resolves every tag path once and then reads
//! the cached handles once per tick. There is no reconnection: any connect,
//! resolve or read failure ends the loop.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()──► Connecting ──► Connected ──shutdown / error──► Stopped
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::address::TagHandle;
use crate::config::{ClientConfig, TICK_PERIOD};
use crate::error::{SimError, SimResult, TransportError};
use crate::shutdown::ShutdownToken;
use crate::transport::ClientTransport;
use crate::types::{RunSummary, TickReport};

// =============================================================================
// PollState
// =============================================================================

/// Lifecycle state of a [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Created, no session yet.
    Idle,
    /// Establishing the session and resolving handles.
    Connecting,
    /// Handles cached, ready to poll.
    Connected,
    /// Session closed.
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Idle => write!(f, "idle"),
            PollState::Connecting => write!(f, "connecting"),
            PollState::Connected => write!(f, "connected"),
            PollState::Stopped => write!(f, "stopped"),
        }
    }
}

/// A resolved tag handle with the names used for lookups and log lines.
#[derive(Debug, Clone)]
pub struct CachedTag {
    /// Tag name.
    pub name: String,
    /// Display name used in log lines.
    pub display_name: String,
    /// Resolved handle.
    pub handle: TagHandle,
}

// =============================================================================
// PollLoop
// =============================================================================

/// Periodically reads remote tags through a [`ClientTransport`].
pub struct PollLoop<T> {
    config: ClientConfig,
    transport: T,
    tags: Vec<CachedTag>,
    state: PollState,
    ticks: u64,
}

impl<T: ClientTransport> PollLoop<T> {
    /// Validates `config` and creates an idle loop.
    pub fn new(config: ClientConfig, transport: T) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            tags: Vec::new(),
            state: PollState::Idle,
            ticks: 0,
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Returns the number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns the cached handles in read order.
    pub fn tags(&self) -> &[CachedTag] {
        &self.tags
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Opens the session and resolves every configured tag once.
    ///
    /// If resolution fails after the session was opened, the session is
    /// closed before the error is returned.
    pub async fn connect(&mut self) -> SimResult<()> {
        if self.state != PollState::Idle {
            return Err(TransportError::connection(
                self.config.endpoint.url(),
                format!("Poll loop is {}", self.state),
            )
            .into());
        }
        self.state = PollState::Connecting;

        if let Err(e) = self.transport.connect(&self.config.endpoint).await {
            self.state = PollState::Stopped;
            return Err(e.into());
        }
        info!(endpoint = %self.config.endpoint, "Connected to OPC UA server");

        match self.resolve_tags().await {
            Ok(tags) => {
                self.tags = tags;
                self.state = PollState::Connected;
                Ok(())
            }
            Err(e) => {
                if let Err(close) = self.transport.disconnect().await {
                    warn!(error = %close, "Failed to close session after resolve error");
                }
                self.state = PollState::Stopped;
                Err(e)
            }
        }
    }

    async fn resolve_tags(&self) -> SimResult<Vec<CachedTag>> {
        let ns = self
            .transport
            .namespace_index(&self.config.namespace_uri)
            .await?;
        debug!(namespace = %self.config.namespace_uri, index = ns, "Resolved namespace");

        let mut tags = Vec::with_capacity(self.config.tags.len());
        for tag in &self.config.tags {
            let path = self.config.tag_path(ns, &tag.name)?;
            let handle = self.transport.resolve(&path).await?;
            debug!(tag = %tag.name, handle = %handle, "Resolved tag");
            tags.push(CachedTag {
                name: tag.name.clone(),
                display_name: tag.effective_display_name().to_string(),
                handle,
            });
        }
        Ok(tags)
    }

    fn ensure_connected(&self) -> SimResult<()> {
        if self.state == PollState::Connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected.into())
        }
    }

    /// Reads every cached handle in order and emits the tick's log line.
    pub async fn tick(&mut self) -> SimResult<TickReport> {
        self.ensure_connected()?;

        let mut report = TickReport::new();
        for tag in &self.tags {
            let value = self.transport.read_value(&tag.handle).await?;
            report.push(tag.display_name.as_str(), value);
        }

        self.ticks += 1;
        info!("{report}");
        Ok(report)
    }

    /// Reads a single tag by name.
    pub async fn read(&self, name: &str) -> SimResult<f64> {
        self.ensure_connected()?;
        let tag = self.cached(name)?;
        Ok(self.transport.read_value(&tag.handle).await?)
    }

    /// Writes a single tag by name.
    pub async fn write(&self, name: &str, value: f64) -> SimResult<()> {
        self.ensure_connected()?;
        let tag = self.cached(name)?;
        self.transport.write_value(&tag.handle, value).await?;
        debug!(tag = name, value, "Wrote tag");
        Ok(())
    }

    fn cached(&self, name: &str) -> SimResult<&CachedTag> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SimError::from(TransportError::address_not_found(name)))
    }

    /// Connects, then polls once per period until `shutdown` fires.
    ///
    /// The first read happens right after connecting. The session is closed
    /// on every exit path once connected.
    pub async fn run(&mut self, mut shutdown: ShutdownToken) -> SimResult<RunSummary> {
        self.connect().await?;

        let outcome = self.poll_until_shutdown(&mut shutdown).await;
        let closed = self.disconnect().await;

        outcome?;
        closed?;
        Ok(RunSummary { ticks: self.ticks })
    }

    async fn poll_until_shutdown(&mut self, shutdown: &mut ShutdownToken) -> SimResult<()> {
        loop {
            if shutdown.is_shutdown_requested() {
                break;
            }
            if let Err(e) = self.tick().await {
                e.log("poll tick");
                return Err(e);
            }
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep(TICK_PERIOD) => {}
            }
        }
        info!("Client stopped");
        Ok(())
    }

    /// Closes the session and emits the shutdown line.
    ///
    /// A no-op unless the loop is connected.
    pub async fn disconnect(&mut self) -> SimResult<()> {
        if self.state != PollState::Connected {
            return Ok(());
        }
        self.state = PollState::Stopped;
        self.tags.clear();

        let closed = self.transport.disconnect().await;
        if let Err(e) = &closed {
            warn!(error = %e, "Failed to close session");
        }

        info!("Disconnected from OPC UA server");
        closed.map_err(Into::into)
    }
}

impl<T> fmt::Debug for PollLoop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollLoop")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("tags", &self.tags.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
