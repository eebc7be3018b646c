// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] turns an OS interrupt (or a programmatic
//! request) into a one-shot notification. Loops hold a [`ShutdownToken`] and
//! race it against their tick sleep, so an interrupt is honoured within the
//! current sleep instead of after it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Coordinates graceful shutdown across the running loops.
///
/// # Example
///
/// ```
/// use opcsim_core::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// let token = coordinator.token();
///
/// coordinator.initiate_shutdown();
/// assert!(token.is_shutdown_requested());
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a token observing this coordinator.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            receiver: self.sender.subscribe(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }

    /// Initiates shutdown. Subsequent calls are no-ops.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Waits for an OS termination signal, then initiates shutdown.
    ///
    /// Returns early if shutdown was already initiated programmatically.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be registered.
    pub async fn wait_for_signal(&self) -> io::Result<()> {
        if self.is_shutdown_initiated() {
            return Ok(());
        }

        let mut token = self.token();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigquit = signal(SignalKind::quit())?;

            tokio::select! {
                _ = sigterm.recv() => debug!("Received SIGTERM"),
                _ = sigint.recv() => debug!("Received SIGINT"),
                _ = sigquit.recv() => debug!("Received SIGQUIT"),
                _ = token.wait() => return Ok(()),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    debug!("Received Ctrl+C");
                }
                _ = token.wait() => return Ok(()),
            }
        }

        self.initiate_shutdown();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("shutdown_initiated", &self.is_shutdown_initiated())
            .finish()
    }
}

// =============================================================================
// ShutdownToken
// =============================================================================

/// A handle loops use to observe a shutdown request.
///
/// Checking is cheap; waiting is cancel-safe and can be raced in
/// `tokio::select!`.
pub struct ShutdownToken {
    receiver: broadcast::Receiver<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Returns true if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    ///
    /// If the coordinator is dropped without initiating shutdown, this never
    /// resolves.
    pub async fn wait(&mut self) {
        if self.is_shutdown_requested() {
            return;
        }
        match self.receiver.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

impl Clone for ShutdownToken {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            shutdown_initiated: self.shutdown_initiated.clone(),
        }
    }
}

impl std::fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("shutdown_requested", &self.is_shutdown_requested())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_token_observes_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();

        assert!(!token.is_shutdown_requested());
        coordinator.initiate_shutdown();
        assert!(token.is_shutdown_requested());
        assert!(coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let mut token = coordinator.token();

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.initiate_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), token.wait())
            .await
            .expect("Shutdown should resolve");
    }

    #[tokio::test]
    async fn test_wait_after_shutdown_is_immediate() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();

        let mut late = coordinator.token();
        tokio::time::timeout(Duration::from_millis(10), late.wait())
            .await
            .expect("Late token should resolve immediately");
    }

    #[tokio::test]
    async fn test_cloned_tokens_all_resolve() {
        let coordinator = ShutdownCoordinator::new();
        let mut a = coordinator.token();
        let mut b = a.clone();

        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        tokio::time::timeout(Duration::from_secs(1), async {
            a.wait().await;
            b.wait().await;
        })
        .await
        .expect("Both tokens should resolve");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_coordinator_does_not_trigger() {
        let coordinator = ShutdownCoordinator::new();
        let mut token = coordinator.token();
        drop(coordinator);

        let waited = tokio::time::timeout(Duration::from_secs(5), token.wait()).await;
        assert!(waited.is_err());
        assert!(!token.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_wait_for_signal_returns_when_already_initiated() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.wait_for_signal().await.unwrap();
    }
}
