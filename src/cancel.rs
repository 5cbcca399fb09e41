//! Cooperative cancellation.
//!
//! On-chain submission is irrevocable once broadcast, so cancellation
//! never interrupts an in-flight item — it only stops the next one from
//! starting (batch runs, retry loops) or ends a polling loop (status
//! trackers). Built on [`tokio::sync::watch`] so waiters observe the
//! signal promptly.

use tokio::sync::watch;

/// Caller-side handle that signals cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already; that is fine.
        let _ = self.tx.send(true);
    }
}

/// Token observed by the orchestrator, retry loop and trackers.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never be cancelled, for callers that don't need
    /// cancellation.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled. If the handle is dropped
    /// without cancelling, this pends forever — dropping the handle means
    /// "never cancel", not "cancel".
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Creates a linked handle/token pair.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
