use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Run-wide stop flag. Raised once; every task can check it or wait on it.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // Err only if the sender is gone, and we hold it.
        let _ = rx.wait_for(|raised| *raised).await;
    }

    /// Sleeps for `duration` unless the signal is raised first.
    /// Returns `true` when the caller should stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_raised(),
            _ = self.wait() => true,
        }
    }
}
