// Configuration module entry point
// Loads startup configuration and resolves it into the immutable ServerConfig

mod types;

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use crate::error::StartupError;

// Re-export public types
pub use types::{Config, ListenConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Prefix for environment overrides, e.g. `ASSET_SERVER__SERVER__HOST`
pub const ENV_PREFIX: &str = "ASSET_SERVER";

/// Bare variable honoured for the port, as hosting platforms set it
pub const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(env_source(None), std::env::var(PORT_ENV).ok())
    }

    /// Load configuration from an explicit environment source and `PORT` value
    pub fn load_with(
        env: config::Environment,
        port_override: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 0)?
            .set_default("performance.write_timeout", 0)?
            .add_source(env)
            .set_override_option("server.port", port_override)?
            .build()?;

        settings.try_deserialize()
    }

    /// Resolve the root directory and produce the immutable server config
    pub fn to_server_config(&self) -> Result<ServerConfig, StartupError> {
        let root = match &self.server.root {
            Some(root) => root.clone(),
            None => default_root()?,
        };
        ServerConfig::new(self.server.host.clone(), self.server.port, root)
    }
}

impl ServerConfig {
    /// Build a config, canonicalizing `root`. Fails when it is not a directory.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        root: impl AsRef<Path>,
    ) -> Result<Self, StartupError> {
        let root = root.as_ref();
        let invalid = |source| StartupError::InvalidRoot {
            path: root.to_path_buf(),
            source,
        };

        let canonical = root.canonicalize().map_err(invalid)?;
        if !canonical.is_dir() {
            return Err(invalid(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        Ok(Self {
            host: host.into(),
            port,
            root: canonical,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let target = format!("{}:{}", self.host, self.port);
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| StartupError::InvalidAddress(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| StartupError::InvalidAddress(format!("{target}: no address found")))
    }
}

fn env_source(vars: Option<HashMap<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

/// Directory containing the running executable
fn default_root() -> Result<PathBuf, StartupError> {
    let exe = std::env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        StartupError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "executable has no parent directory",
        ))
    })
}
