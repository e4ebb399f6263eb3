//! HTTP response building module
//!
//! Header composition shared by every response and the final conversion
//! into a hyper `Response`.

use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::{Response, StatusCode};

use super::body::ResponseBody;
use super::cache::CachePolicy;
use super::mime::TEXT_PLAIN;

/// Cross-origin headers attached to every response, whatever the status
pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
    (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Compose the response header list in its fixed order:
/// CORS, then cache policy, then content type and length.
pub fn compose_headers(
    policy: CachePolicy,
    content_type: &'static str,
    content_length: u64,
) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers: Vec<(HeaderName, HeaderValue)> = CORS_HEADERS
        .iter()
        .map(|(name, value)| (name.clone(), HeaderValue::from_static(value)))
        .collect();
    headers.extend(policy.headers());
    headers.push((CONTENT_TYPE, HeaderValue::from_static(content_type)));
    headers.push((CONTENT_LENGTH, HeaderValue::from(content_length)));
    headers
}

/// Minimal textual body for error statuses, e.g. `404 Not Found`
pub fn error_text(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    )
}

/// Headers for an error response whose text body is `text`
pub fn compose_error_headers(policy: CachePolicy, text: &str) -> Vec<(HeaderName, HeaderValue)> {
    compose_headers(policy, TEXT_PLAIN, text.len() as u64)
}

/// Build a response from a status, ordered headers and body
pub fn build_response(
    status: StatusCode,
    headers: &[(HeaderName, HeaderValue)],
    body: ResponseBody,
) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error(status, &e);
        build_500_response()
    })
}

/// Build 500 Internal Server Error response without going through the builder
pub fn build_500_response() -> Response<ResponseBody> {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let text = error_text(status);
    let headers = compose_error_headers(CachePolicy::default(), &text);

    let mut response = Response::new(ResponseBody::text(text));
    *response.status_mut() = status;
    for (name, value) in headers {
        response.headers_mut().append(name, value);
    }
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
