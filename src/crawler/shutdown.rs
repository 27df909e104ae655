//! Cooperative shutdown signalling

use tokio::sync::watch;

/// Fires the shutdown signal shared by all workers
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Asks every worker to stop after its in-flight target
    pub fn trigger(&self) {
        // No receivers left means nothing is running, so the error is moot.
        let _ = self.tx.send(true);
    }
}

/// Receiving half of the shutdown signal; cheap to clone into each worker
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, ShutdownSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        let (_trigger, signal) = Self::new();
        signal
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
