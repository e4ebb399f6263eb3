//! Server module
//!
//! Owns the listening socket and the accept loop. Shutdown is driven from
//! the outside through a [`ShutdownHandle`].

pub mod connection;
pub mod listener;
#[path = "loop.rs"]
pub mod server_loop;
pub mod signal;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

pub use listener::create_listener;
pub use signal::{shutdown_signal, ShutdownHandle};

use crate::config::{PerformanceConfig, ServerConfig};
use crate::error::StartupError;
use crate::handler::RequestHandler;
use signal::ShutdownSignals;

/// A bound, not yet serving, static asset server
pub struct Server {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    performance: PerformanceConfig,
    handle: ShutdownHandle,
    signals: ShutdownSignals,
}

impl Server {
    /// Bind the configured address.
    ///
    /// A bind failure is returned as [`StartupError::Bind`]; callers should
    /// treat it as fatal. Must be called from within a Tokio runtime.
    pub fn bind(handler: RequestHandler, performance: PerformanceConfig) -> Result<Self, StartupError> {
        let addr = handler.config().socket_addr()?;
        let listener = create_listener(addr)?;
        let (handle, signals) = ShutdownHandle::new();

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            performance,
            handle,
            signals,
        })
    }

    /// Address actually bound; differs from the configured one for port 0
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }

    /// Serve until shutdown is requested and every in-flight request is done
    pub async fn serve(self) {
        let Self {
            listener,
            handler,
            performance,
            handle,
            signals,
        } = self;
        // Keeps the request channel open for the whole run
        let _handle = handle;

        server_loop::run_accept_loop(listener, handler, performance, signals.requested).await;
        signals.stopped.send_replace(true);
    }
}
