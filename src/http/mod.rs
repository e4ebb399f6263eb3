//! HTTP protocol layer module
//!
//! Cache policy, content types, response bodies and header composition,
//! independent of how a request was resolved.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use cache::{AssetClass, CachePolicy};
pub use response::{build_500_response, build_response, CORS_HEADERS};
