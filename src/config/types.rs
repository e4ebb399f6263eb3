// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure, as deserialized from the `config` sources
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ListenConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Listener section before the root directory has been resolved
#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
    /// Served directory; defaults to the directory containing the executable
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Process-wide immutable server configuration
///
/// `root` is always absolute and canonical. Built once at startup and
/// shared read-only by every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub root: PathBuf,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "common".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub workers: Option<usize>,
    pub keep_alive: bool,
    /// Seconds, 0 disables the deadline
    pub read_timeout: u64,
    /// Seconds, 0 disables the deadline
    pub write_timeout: u64,
}

impl PerformanceConfig {
    /// Per-connection deadline, the larger of the read and write timeouts
    pub fn connection_deadline(&self) -> Option<std::time::Duration> {
        match std::cmp::max(self.read_timeout, self.write_timeout) {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: None,
            keep_alive: true,
            read_timeout: 0,
            write_timeout: 0,
        }
    }
}
