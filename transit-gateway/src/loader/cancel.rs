//! Request-scoped cancellation.

use std::sync::Arc;

use tokio::sync::watch;

/// A latch shared by everything working on one request.
///
/// Once cancelled it stays cancelled. Clones observe the same latch.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is cancelled; never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// A guard that cancels the signal when dropped.
    ///
    /// Held by the transport for the lifetime of the request future, so a
    /// dropped connection stops any batches still waiting to dispatch.
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard {
            signal: self.clone(),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CancelGuard {
    signal: CancelSignal,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.signal.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn guard_cancels_on_drop() {
        let signal = CancelSignal::new();
        {
            let _guard = signal.drop_guard();
            assert!(!signal.is_cancelled());
        }
        assert!(signal.is_cancelled());
    }
}
