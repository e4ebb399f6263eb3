//! Request handler module
//!
//! Turns one request into one response: method check, path resolution,
//! header selection, body, access log record.

pub mod context;
pub mod request;

// Re-export main entry point
pub use context::{Outcome, RequestContext};
pub use request::RequestHandler;
