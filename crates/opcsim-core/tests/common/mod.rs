// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared helpers for opcsim-core integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use opcsim_core::{
    ClientConfig, LoopbackClient, LoopbackNetwork, LoopbackServer, PollLoop, RunSummary,
    ServerConfig, SharedRegistry, ShutdownCoordinator, SimResult, UniformSource, UpdateLoop,
};

// =============================================================================
// Log capture
// =============================================================================

/// Records the level and message of every event emitted while installed.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    /// Installs the capture as the thread's default subscriber.
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::registry().with(logs.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    /// Returns all captured messages.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    /// Number of events captured so far. Usable as a mark for
    /// [`CapturedLogs::messages_at_or_above`].
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Messages captured after the first `from` events whose level is
    /// `level` or more severe.
    pub fn messages_at_or_above(&self, level: Level, from: usize) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .skip(from)
            .filter(|(lvl, _)| *lvl <= level)
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Counts messages equal to `message`.
    pub fn count(&self, message: &str) -> usize {
        self.lines.lock().iter().filter(|(_, l)| l.as_str() == message).count()
    }

    /// Counts messages starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.lines.lock().iter().filter(|(_, l)| l.starts_with(prefix)).count()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.lines
            .lock()
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A server update loop running on a background task.
pub struct RunningServer {
    pub registry: SharedRegistry,
    pub coordinator: ShutdownCoordinator,
    pub handle: JoinHandle<SimResult<RunSummary>>,
}

impl RunningServer {
    /// Requests shutdown and waits for the loop to finish.
    pub async fn stop(self) -> SimResult<RunSummary> {
        self.coordinator.initiate_shutdown();
        self.handle.await.expect("server task panicked")
    }
}

/// Spawns a default-configured server on `network` and waits until it
/// listens.
pub async fn spawn_server(network: &LoopbackNetwork, seed: u64) -> RunningServer {
    let transport = LoopbackServer::new(network.clone());
    let mut update = UpdateLoop::new(
        ServerConfig::default(),
        transport,
        UniformSource::seeded(seed),
    )
    .expect("default config is valid");

    let registry = update.registry().clone();
    let coordinator = ShutdownCoordinator::new();
    let token = coordinator.token();
    let handle = tokio::spawn(async move { update.run(token).await });

    while network.listener_count() == 0 {
        tokio::task::yield_now().await;
    }

    RunningServer {
        registry,
        coordinator,
        handle,
    }
}

/// Creates a connected default-configured poll loop.
pub async fn connected_client(network: &LoopbackNetwork) -> PollLoop<LoopbackClient> {
    let mut client = PollLoop::new(ClientConfig::default(), LoopbackClient::new(network.clone()))
        .expect("default config is valid");
    client.connect().await.expect("server is listening");
    client
}
