//! Cooperative cancellation for async runs.
//!
//! Every run of an async computed cell gets a [`CancelToken`]. The run is
//! cancelled when a newer run supersedes it or when its cell is torn down.
//! Nothing is interrupted: the run's future decides when to look.

use tokio::sync::watch;

/// Observes whether an async run has been cancelled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Whether the run was cancelled.
    ///
    /// A token whose run handle has been dropped also counts as cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until the run is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// The side of a token that cancels it.
#[derive(Debug)]
pub(crate) struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub(crate) fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    pub(crate) fn abort(&self) {
        self.tx.send_replace(true);
    }
}
