// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;

use tokio::sync::watch;

use crate::logger;

/// Stops a running [`Server`](super::Server) from any task
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<watch::Sender<bool>>,
    stopped: watch::Receiver<bool>,
}

/// Server-side ends of the shutdown channels
pub(crate) struct ShutdownSignals {
    pub requested: watch::Receiver<bool>,
    pub stopped: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub(crate) fn new() -> (Self, ShutdownSignals) {
        let (requested_tx, requested_rx) = watch::channel(false);
        let (stopped_tx, stopped_rx) = watch::channel(false);
        let handle = Self {
            requested: Arc::new(requested_tx),
            stopped: stopped_rx,
        };
        let signals = ShutdownSignals {
            requested: requested_rx,
            stopped: stopped_tx,
        };
        (handle, signals)
    }

    /// Ask the server to stop accepting connections; returns immediately
    pub fn trigger(&self) {
        self.requested.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.borrow()
    }

    /// Stop accepting connections and wait until in-flight requests finish
    pub async fn shutdown(&self) {
        self.trigger();
        let mut stopped = self.stopped.clone();
        // Err means the server was dropped without serving: nothing to wait for
        let _ = stopped.wait_for(|&done| done).await;
    }
}

/// Resolves on the first SIGINT or SIGTERM the process receives.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_error(&format!("Failed to register SIGINT handler: {e}"));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                logger::log_error(&format!("Failed to register SIGTERM handler: {e}"));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => logger::log_warning("[SIGNAL] SIGINT received, initiating graceful shutdown"),
        () = terminate => logger::log_warning("[SIGNAL] SIGTERM received, initiating graceful shutdown"),
    }
}
