//! Per-request state
//!
//! A `RequestContext` lives for exactly one request: it is created when the
//! request arrives, filled in while the path is resolved and the headers are
//! chosen, and consumed when the response is handed to hyper.

use std::path::PathBuf;

use hyper::header::{HeaderName, HeaderValue};
use hyper::{Method, Response, StatusCode};

use crate::http::{build_response, ResponseBody};

/// How the request path resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    NotFound,
    Forbidden,
    ServerError,
}

impl Outcome {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Found => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub raw_path: String,
    pub resolved_path: Option<PathBuf>,
    /// `None` when the method was rejected before resolution
    pub outcome: Option<Outcome>,
    pub status: StatusCode,
    /// Response headers in emission order
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Bytes the body will carry (0 for HEAD)
    pub body_bytes: u64,
}

impl RequestContext {
    pub fn new(method: Method, raw_path: impl Into<String>) -> Self {
        Self {
            method,
            raw_path: raw_path.into(),
            resolved_path: None,
            outcome: None,
            status: StatusCode::OK,
            headers: Vec::new(),
            body_bytes: 0,
        }
    }

    /// First value of a response header, by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    pub fn into_response(self, body: ResponseBody) -> Response<ResponseBody> {
        build_response(self.status, &self.headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        assert_eq!(Outcome::Found.status(), StatusCode::OK);
        assert_eq!(Outcome::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(Outcome::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Outcome::ServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_header_lookup() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.headers
            .push((hyper::header::CACHE_CONTROL, HeaderValue::from_static("no-cache")));
        assert_eq!(ctx.header("Cache-Control").unwrap(), "no-cache");
        assert!(ctx.header("pragma").is_none());
    }
}
