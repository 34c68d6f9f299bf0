//! Shutdown coordination.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::signals;

/// Coordinator for graceful shutdown.
///
/// Hands out cancellation tokens that resilience pipelines observe while
/// attempting calls and while waiting between retries.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A child token; cancelling it does not trigger the whole shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Shutdown triggered");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown on the first Ctrl+C or SIGTERM.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        signals::listen_for_ctrl_c(self.clone())
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }
}
