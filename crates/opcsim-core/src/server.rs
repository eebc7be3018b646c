// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The server-side update loop.
//!
//! [`UpdateLoop`] owns the tag registry. It publishes every tag through a
//! [`ServerTransport`], then redraws the bounded tags once per tick until a
//! shutdown is requested.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start()──► Running ──shutdown / error──► Stopped
//! ```
//!
//! The listening endpoint is released on every exit path once `start`
//! succeeded.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut update = UpdateLoop::new(ServerConfig::default(), transport, UniformSource::from_entropy())?;
//! let summary = update.run(coordinator.token()).await?;
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{ServerConfig, TICK_PERIOD};
use crate::error::{SimResult, TransportError};
use crate::registry::{SharedRegistry, TagAccessor, TagRegistry};
use crate::shutdown::ShutdownToken;
use crate::source::ValueSource;
use crate::transport::ServerTransport;
use crate::types::{RunSummary, TickReport};

// =============================================================================
// UpdateState
// =============================================================================

/// Lifecycle state of an [`UpdateLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Created, nothing published yet.
    Idle,
    /// Tags published and the transport is listening.
    Running,
    /// The transport was released.
    Stopped,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateState::Idle => write!(f, "idle"),
            UpdateState::Running => write!(f, "running"),
            UpdateState::Stopped => write!(f, "stopped"),
        }
    }
}

// =============================================================================
// UpdateLoop
// =============================================================================

/// Periodically redraws tag values and serves them through a transport.
pub struct UpdateLoop<T, S> {
    config: ServerConfig,
    registry: SharedRegistry,
    transport: T,
    source: S,
    state: UpdateState,
    ticks: u64,
}

impl<T, S> UpdateLoop<T, S>
where
    T: ServerTransport,
    S: ValueSource,
{
    /// Validates `config` and creates the registry from its tag table.
    pub fn new(config: ServerConfig, transport: T, source: S) -> SimResult<Self> {
        config.validate()?;
        let registry = TagRegistry::from_specs(&config.tags)?.into_shared();

        Ok(Self {
            config,
            registry,
            transport,
            source,
            state: UpdateState::Idle,
            ticks: 0,
        })
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Returns the current state.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Returns the number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers the namespace, publishes every tag and starts listening.
    ///
    /// # Errors
    ///
    /// Fails if the loop was already started or if the transport rejects
    /// any step.
    pub async fn start(&mut self) -> SimResult<()> {
        if self.state != UpdateState::Idle {
            return Err(TransportError::AlreadyListening {
                endpoint: self.config.endpoint.url(),
            }
            .into());
        }

        let ns = self
            .transport
            .register_namespace(&self.config.namespace_uri)
            .await?;
        debug!(namespace = %self.config.namespace_uri, index = ns, "Registered namespace");

        let names = self.registry.read().names();
        for name in &names {
            let path = self.config.tag_path(ns, name)?;
            let accessor = TagAccessor::new(self.registry.clone(), name.as_str())?;
            self.transport.publish(&path, accessor).await?;
        }

        self.transport
            .listen(&self.config.endpoint, &self.config.server_name)
            .await?;
        self.state = UpdateState::Running;

        info!(
            tags = names.len(),
            "{} started at {}",
            self.config.server_name,
            self.config.endpoint.advertised()
        );
        Ok(())
    }

    /// Draws and stores a new value for every bounded tag.
    ///
    /// All draws happen before any set, in registry order, and the tick's
    /// log line is emitted after the last set.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        let report = {
            let mut registry = self.registry.write();
            let source = &mut self.source;
            let draws: Vec<(String, String, f64)> = registry
                .iter()
                .filter_map(|tag| {
                    tag.range().map(|range| {
                        (
                            tag.name().to_string(),
                            tag.display_name().to_string(),
                            source.draw(&range),
                        )
                    })
                })
                .collect();

            let mut report = TickReport::new();
            for (name, display_name, value) in draws {
                registry.set(&name, value)?;
                report.push(display_name, value);
            }
            report
        };

        self.ticks += 1;
        info!("{report}");
        Ok(report)
    }

    /// Starts the loop and ticks once per period until `shutdown` fires.
    ///
    /// The first tick happens one period after start. A shutdown observed
    /// during the sleep ends the loop without another tick. Errors from
    /// a tick end the loop and are returned after the transport has been
    /// released.
    pub async fn run(&mut self, mut shutdown: ShutdownToken) -> SimResult<RunSummary> {
        self.start().await?;

        let outcome = self.tick_until_shutdown(&mut shutdown).await;
        let released = self.stop().await;

        outcome?;
        released?;
        Ok(RunSummary { ticks: self.ticks })
    }

    async fn tick_until_shutdown(&mut self, shutdown: &mut ShutdownToken) -> SimResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep(TICK_PERIOD) => {}
            }
            if shutdown.is_shutdown_requested() {
                break;
            }
            if let Err(e) = self.tick() {
                e.log("update tick");
                return Err(e);
            }
        }
        debug!(ticks = self.ticks, "Shutdown requested, leaving update loop");
        Ok(())
    }

    /// Releases the listening endpoint and emits the shutdown line.
    ///
    /// Calling `stop` on an idle or already stopped loop is a no-op.
    pub async fn stop(&mut self) -> SimResult<()> {
        if self.state != UpdateState::Running {
            return Ok(());
        }
        self.state = UpdateState::Stopped;

        let released = if self.transport.is_listening() {
            self.transport.unlisten().await
        } else {
            Ok(())
        };
        if let Err(e) = &released {
            warn!(error = %e, "Failed to release endpoint");
        }

        info!("Server stopped");
        released.map_err(Into::into)
    }
}

impl<T, S> fmt::Debug for UpdateLoop<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateLoop")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagSpec;
    use crate::error::{RegistryError, SimError};
    use crate::loopback::{LoopbackNetwork, LoopbackServer};
    use crate::shutdown::ShutdownCoordinator;
    use crate::source::UniformSource;
    use crate::types::TagRange;

    /// Returns the midpoint of every range.
    struct Midpoint;

    impl ValueSource for Midpoint {
        fn draw(&mut self, range: &TagRange) -> f64 {
            (range.min() + range.max()) / 2.0
        }
    }

    fn update_loop() -> UpdateLoop<LoopbackServer, UniformSource> {
        let transport = LoopbackServer::new(LoopbackNetwork::new());
        UpdateLoop::new(ServerConfig::default(), transport, UniformSource::seeded(1)).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ServerConfig::default();
        config.tags.push(config.tags[0].clone());
        let transport = LoopbackServer::new(LoopbackNetwork::new());
        let result = UpdateLoop::new(config, transport, Midpoint);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_publishes_and_listens() {
        let mut update = update_loop();
        assert_eq!(update.state(), UpdateState::Idle);

        update.start().await.unwrap();
        assert_eq!(update.state(), UpdateState::Running);
        assert!(update.transport().is_listening());
        assert_eq!(update.transport().published_count(), 3);

        assert!(update.start().await.is_err());
    }

    #[test]
    fn test_tick_sets_every_bounded_tag() {
        let transport = LoopbackServer::new(LoopbackNetwork::new());
        let mut update = UpdateLoop::new(ServerConfig::default(), transport, Midpoint).unwrap();

        let report = update.tick().unwrap();
        assert_eq!(report.to_string(), "Temperature: 25.00, Pressure: 1000.00, Flow Rate: 10.00");
        assert_eq!(update.ticks(), 1);

        let snapshot = update.registry().read().snapshot();
        assert_eq!(snapshot, report);
    }

    #[test]
    fn test_tick_skips_unbounded_tags() {
        let mut config = ServerConfig::default();
        config.tags = vec![TagSpec::new("Level", 1.0, TagRange::new(0.0, 2.0).unwrap())];
        let transport = LoopbackServer::new(LoopbackNetwork::new());
        let mut update = UpdateLoop::new(config, transport, Midpoint).unwrap();
        update.registry().write().create("Static", 3.0, true).unwrap();

        let report = update.tick().unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(update.registry().read().get("Static").unwrap(), 3.0);
    }

    #[test]
    fn test_tick_fails_on_read_only_tag() {
        let transport = LoopbackServer::new(LoopbackNetwork::new());
        let config = ServerConfig {
            tags: vec![TagSpec::new("Locked", 1.0, TagRange::new(0.0, 2.0).unwrap())
                .with_writable(false)],
            ..ServerConfig::default()
        };
        let mut update = UpdateLoop::new(config, transport, Midpoint).unwrap();

        let err = update.tick().unwrap_err();
        assert!(matches!(
            err,
            SimError::Registry(RegistryError::NotWritable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_releases_endpoint_on_shutdown() {
        let network = LoopbackNetwork::new();
        let transport = LoopbackServer::new(network.clone());
        let mut update =
            UpdateLoop::new(ServerConfig::default(), transport, UniformSource::seeded(3)).unwrap();

        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
            trigger.initiate_shutdown();
        });

        let summary = update.run(token).await.unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(update.state(), UpdateState::Stopped);
        assert!(!update.transport().is_listening());
        assert_eq!(network.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_releases_endpoint_on_tick_error() {
        let network = LoopbackNetwork::new();
        let transport = LoopbackServer::new(network.clone());
        let config = ServerConfig {
            tags: vec![TagSpec::new("Locked", 1.0, TagRange::new(0.0, 2.0).unwrap())
                .with_writable(false)],
            ..ServerConfig::default()
        };
        let mut update = UpdateLoop::new(config, transport, Midpoint).unwrap();

        let coordinator = ShutdownCoordinator::new();
        assert!(update.run(coordinator.token()).await.is_err());
        assert_eq!(update.state(), UpdateState::Stopped);
        assert_eq!(network.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut update = update_loop();
        update.stop().await.unwrap();
        assert_eq!(update.state(), UpdateState::Idle);

        update.start().await.unwrap();
        update.stop().await.unwrap();
        update.stop().await.unwrap();
        assert_eq!(update.state(), UpdateState::Stopped);
    }
}
