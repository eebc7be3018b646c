// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process runtimes for the two binaries.
//!
//! Each runtime owns a [`ShutdownCoordinator`], watches OS signals on a
//! background task and drives its loop until shutdown:
//!
//! - [`ServerRuntime`] runs the [`UpdateLoop`]
//! - [`ClientRuntime`] runs the [`PollLoop`]

use std::io;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use opcsim_core::{
    ClientConfig, ClientTransport, PollLoop, RunSummary, ServerConfig, ServerTransport,
    SharedRegistry, ShutdownCoordinator, UpdateLoop, ValueSource,
};

use crate::error::{BinError, BinResult};

/// Spawns the signal watcher. A failure to install handlers also initiates
/// shutdown so the loop does not run unstoppable.
fn spawn_signal_watcher(coordinator: &ShutdownCoordinator) -> JoinHandle<io::Result<()>> {
    let coordinator = coordinator.clone();
    tokio::spawn(async move {
        let result = coordinator.wait_for_signal().await;
        if result.is_err() {
            coordinator.initiate_shutdown();
        }
        result
    })
}

/// Stops the watcher and surfaces a handler installation failure.
async fn finish_signal_watcher(watcher: JoinHandle<io::Result<()>>) -> BinResult<()> {
    if !watcher.is_finished() {
        watcher.abort();
        return Ok(());
    }
    match watcher.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(BinError::init(format!("Failed to install signal handlers: {}", e))),
        Err(e) => Err(BinError::runtime(format!("Signal task failed: {}", e))),
    }
}

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs the simulated server until interrupted.
pub struct ServerRuntime<T, S> {
    update: UpdateLoop<T, S>,
    shutdown: ShutdownCoordinator,
}

impl<T, S> ServerRuntime<T, S>
where
    T: ServerTransport,
    S: ValueSource,
{
    /// Creates the runtime. Fails on an invalid configuration.
    pub fn new(config: ServerConfig, transport: T, source: S) -> BinResult<Self> {
        let update = UpdateLoop::new(config, transport, source)?;
        Ok(Self {
            update,
            shutdown: ShutdownCoordinator::new(),
        })
    }

    /// Returns a handle that stops the runtime when shut down.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Returns the tag registry served by this runtime.
    pub fn registry(&self) -> &SharedRegistry {
        self.update.registry()
    }

    /// Serves tags until a signal or a programmatic shutdown.
    pub async fn run(mut self) -> BinResult<RunSummary> {
        info!(
            version = opcsim_core::VERSION,
            endpoint = %self.update.config().endpoint,
            "Starting opcsim server"
        );

        let watcher = spawn_signal_watcher(&self.shutdown);
        let outcome = self.update.run(self.shutdown.token()).await;
        let signals = finish_signal_watcher(watcher).await;

        let summary = outcome.map_err(|e| BinError::from(e).with_context("server"))?;
        signals?;
        debug!(ticks = summary.ticks, "Server runtime finished");
        Ok(summary)
    }
}

// =============================================================================
// ClientRuntime
// =============================================================================

/// Runs the polling client until interrupted.
pub struct ClientRuntime<T> {
    poll: PollLoop<T>,
    endpoint: String,
    shutdown: ShutdownCoordinator,
}

impl<T: ClientTransport> ClientRuntime<T> {
    /// Creates the runtime. Fails on an invalid configuration.
    pub fn new(config: ClientConfig, transport: T) -> BinResult<Self> {
        let endpoint = config.endpoint.url();
        let poll = PollLoop::new(config, transport)?;
        Ok(Self {
            poll,
            endpoint,
            shutdown: ShutdownCoordinator::new(),
        })
    }

    /// Returns a handle that stops the runtime when shut down.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Polls tags until a signal or a programmatic shutdown.
    pub async fn run(mut self) -> BinResult<RunSummary> {
        info!(
            version = opcsim_core::VERSION,
            endpoint = %self.endpoint,
            "Starting opcsim client"
        );

        let watcher = spawn_signal_watcher(&self.shutdown);
        let outcome = self.poll.run(self.shutdown.token()).await;
        let signals = finish_signal_watcher(watcher).await;

        let summary = outcome.map_err(|e| BinError::from(e).with_context("client"))?;
        signals?;
        debug!(ticks = summary.ticks, "Client runtime finished");
        Ok(summary)
    }
}

// =============================================================================
// Tests
// =============================================================================
