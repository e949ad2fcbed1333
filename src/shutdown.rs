//! Graceful Shutdown Handling
//!
//! A single process-wide cancellation signal, fed by SIGTERM/SIGINT and
//! fanned out over a broadcast channel. Long-lived tasks subscribe at
//! construction; there is no global mutable state.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::Result;

/// Owns the shutdown broadcast channel and the signal listener.
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Receiver for components that only need to observe the signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Sender handle for components that create per-task receivers of their
    /// own (the relay engine subscribes once per connection).
    pub fn sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Fire the shutdown signal directly (tests, or explicit quit).
    pub fn trigger(&self) {
        if self.shutdown_tx.send(()).is_err() {
            warn!("shutdown signal had no listeners");
        }
    }

    /// Block until SIGTERM, SIGINT, or Ctrl+C, then broadcast shutdown.
    pub async fn listen_for_signals(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, initiating graceful shutdown"),
                _ = sigint.recv() => info!("received SIGINT, initiating graceful shutdown"),
                _ = signal::ctrl_c() => info!("received Ctrl+C, initiating graceful shutdown"),
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx1 = coordinator.subscribe();
        let mut rx2 = coordinator.sender().subscribe();

        coordinator.trigger();

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_trigger_without_listeners_does_not_panic() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger();
    }
}
