//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Subscriber setup (`tracing-subscriber` with an env filter)
//! - Server lifecycle logging
//! - Access logging with multiple formats through [`AccessLogSink`]
//! - Error and warning logging

mod format;

pub use format::{AccessLogEntry, LogFormat};

use std::net::SocketAddr;
use std::path::Path;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Tracing target used for access log lines
pub const ACCESS_TARGET: &str = "access";

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Should be called once at
/// application startup; a second call is reported as an error.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
}

/// Receives one record per completed request
///
/// Implementations must not fail the request: anything that goes wrong
/// while recording stays inside the sink.
pub trait AccessLogSink: Send + Sync {
    fn record(&self, entry: &AccessLogEntry);
}

/// Access log written through `tracing` on the [`ACCESS_TARGET`] target
#[derive(Debug, Clone)]
pub struct TracingAccessLog {
    format: LogFormat,
}

impl TracingAccessLog {
    /// `format` is `common`, `combined`, `json`, or a `$variable` template
    pub fn new(format: &str) -> Self {
        Self {
            format: LogFormat::parse(format),
        }
    }
}

impl AccessLogSink for TracingAccessLog {
    fn record(&self, entry: &AccessLogEntry) {
        info!(target: ACCESS_TARGET, "{}", entry.format(&self.format));
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path) {
    info!("======================================");
    info!("Static asset server started");
    info!("Listening on: http://{addr}");
    info!("Serving directory: {}", root.display());
    info!("Press Ctrl+C to stop the server");
    info!("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &hyper::Error) {
    error!("[Connection] Failed to serve {peer_addr}: {err}");
}

pub fn log_client_disconnect(peer_addr: &SocketAddr, err: &hyper::Error) {
    debug!("[Connection] Client {peer_addr} went away: {err}");
}

pub fn log_path_escape(raw_path: &str) {
    warn!("Path traversal attempt blocked: {raw_path}");
}

pub fn log_read_error(path: &Path, err: &std::io::Error) {
    error!("Failed to read '{}': {err}", path.display());
}

pub fn log_shutdown_requested() {
    info!("[Shutdown] Stopped accepting connections, draining in-flight requests");
}

pub fn log_shutdown_complete() {
    info!("[Shutdown] All connections closed, server stopped");
}

pub fn log_error(message: &str) {
    error!("{message}");
}

pub fn log_warning(message: &str) {
    warn!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<String>>);

    impl AccessLogSink for Collect {
        fn record(&self, entry: &AccessLogEntry) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(entry.format(&LogFormat::Common));
            }
        }
    }

    #[test]
    fn test_sink_is_object_safe() {
        let sink: Box<dyn AccessLogSink> = Box::new(Collect(Mutex::new(Vec::new())));
        let entry = AccessLogEntry::new(
            "127.0.0.1:4000".parse().unwrap(),
            "GET".to_string(),
            "/".to_string(),
        );
        sink.record(&entry);
        TracingAccessLog::new("json").record(&entry);
    }
}
