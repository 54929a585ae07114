//! One-shot shutdown signal shared by OS signals and `POST /shutdown`.

use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Fire the signal. Returns false if it had already fired.
    pub fn trigger(&self, reason: &str) -> bool {
        let first = !self.tx.send_replace(true);
        if first {
            info!(reason, "shutdown requested");
        }
        first
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has fired.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is held by `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Fire on SIGINT or (on unix) SIGTERM. Runs until one arrives.
    pub async fn listen_for_signals(self) {
        let ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => { self.trigger("SIGINT"); }
            () = terminate => { self.trigger("SIGTERM"); }
            () = self.wait() => {}
        }
    }
}
