//! Startup error types.
//!
//! Per-request failures never surface here: they are converted to an HTTP
//! status inside the handler. These types cover what can stop the process
//! before it serves anything.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Failure to acquire the listening socket.
#[derive(Debug)]
pub enum BindError {
    /// Another socket already holds `addr`
    AddrInUse { addr: SocketAddr, source: io::Error },
    /// Any other socket setup failure (permissions, unavailable address, ...)
    Other { addr: SocketAddr, source: io::Error },
}

impl BindError {
    pub fn from_io(addr: SocketAddr, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AddrInUse {
            Self::AddrInUse { addr, source }
        } else {
            Self::Other { addr, source }
        }
    }

    pub const fn is_addr_in_use(&self) -> bool {
        matches!(self, Self::AddrInUse { .. })
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddrInUse { addr, .. } => write!(
                f,
                "address {addr} is already in use (is another server running on this port?)"
            ),
            Self::Other { addr, source } => write!(f, "failed to bind {addr}: {source}"),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AddrInUse { source, .. } | Self::Other { source, .. } => Some(source),
        }
    }
}

/// Anything that prevents the server from starting.
#[derive(Debug)]
pub enum StartupError {
    Config(config::ConfigError),
    /// Root directory missing, unreadable or not a directory
    InvalidRoot { path: PathBuf, source: io::Error },
    /// Host/port did not resolve to a socket address
    InvalidAddress(String),
    Bind(BindError),
    Io(io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::InvalidRoot { path, source } => {
                write!(f, "invalid root directory '{}': {source}", path.display())
            }
            Self::InvalidAddress(msg) => write!(f, "invalid address: {msg}"),
            Self::Bind(e) => e.fmt(f),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::InvalidRoot { source, .. } => Some(source),
            Self::InvalidAddress(_) => None,
            Self::Bind(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<config::ConfigError> for StartupError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<BindError> for StartupError {
    fn from(e: BindError) -> Self {
        Self::Bind(e)
    }
}

impl From<io::Error> for StartupError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
