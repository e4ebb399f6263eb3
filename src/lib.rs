//! Static asset server
//!
//! Serves files below one root directory over HTTP/1.1 with fixed CORS and
//! cache headers. The binary in `main.rs` wires these modules together; the
//! library is exposed so tests can run a server in-process.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resolver;
pub mod server;

pub use config::{Config, ServerConfig};
pub use error::{BindError, StartupError};
pub use handler::RequestHandler;
pub use resolver::{Resolution, ResourceResolver};
pub use server::{Server, ShutdownHandle};
