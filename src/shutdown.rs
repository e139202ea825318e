//! Process-wide shutdown signal.
//!
//! A `watch` channel carrying a single flag. [`ShutdownTrigger`] flips it
//! once; every [`ShutdownListener`] clone observes the change. Background
//! loops (handshake retries, detached deliveries) race their work against
//! [`ShutdownListener::wait`].

use std::sync::Arc;

use tokio::sync::watch;

/// Creates a connected trigger/listener pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, ShutdownListener) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownListener { rx })
}

/// Fires the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    /// Signals shutdown to every listener. Idempotent.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("shutdown signalled");
        }
    }

    /// Returns a new listener for this signal.
    #[must_use]
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// A listener that never fires, for components run without a process
    /// lifecycle (tests, one-off tools).
    #[must_use]
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns `true` once shutdown has been signalled.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when shutdown is signalled.
    ///
    /// If the trigger is dropped without firing, this never completes.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
