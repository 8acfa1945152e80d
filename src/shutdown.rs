//! Graceful shutdown coordination.
//!
//! Holds the process-wide shutdown token and tracks live subscriber
//! connection tasks so that shutdown can:
//! 1. Signal background tasks (generator, HTTP server) to stop
//! 2. Wait, bounded by a grace period, until every connection has closed

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    connections: TaskTracker,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }

    /// Wrap a connection future so shutdown waits for it to finish.
    pub fn track<F>(&self, connection: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        self.connections.track_future(connection)
    }

    /// Token cancelled when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been signalled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Wait until all tracked connections have closed, at most `grace`.
    /// Returns false if connections were still open when the grace period
    /// ran out.
    pub async fn wait_for_all_closed(&self, grace: Duration) -> bool {
        self.connections.close();
        let count = self.connections.len();
        if count > 0 {
            tracing::debug!(count, "waiting for connections to close");
        }
        tokio::time::timeout(grace, self.connections.wait()).await.is_ok()
    }

    pub fn active_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
