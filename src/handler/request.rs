//! Request handling
//!
//! Drives one request from raw method and path to status, headers and body,
//! then hands a record to the access log.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Version};
use tokio::fs::File;

use super::context::{Outcome, RequestContext};
use crate::config::ServerConfig;
use crate::http::cache::{AssetClass, CachePolicy};
use crate::http::mime::content_type_for;
use crate::http::response::{compose_error_headers, compose_headers, error_text};
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry, AccessLogSink};
use crate::resolver::{nominal_extension, Resolution, ResolvedFile, ResourceResolver};

/// Serves files below the configured root
///
/// Holds only read-only state, so one instance is shared by every
/// connection behind an `Arc`.
pub struct RequestHandler {
    config: ServerConfig,
    resolver: ResourceResolver,
    access_log: Option<Arc<dyn AccessLogSink>>,
}

impl RequestHandler {
    pub fn new(config: ServerConfig) -> Self {
        let resolver = ResourceResolver::new(config.root.clone());
        Self {
            config,
            resolver,
            access_log: None,
        }
    }

    #[must_use]
    pub fn with_access_log(mut self, sink: Arc<dyn AccessLogSink>) -> Self {
        self.access_log = Some(sink);
        self
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Entry point for hyper: handle, log, and convert to a response
    pub async fn serve<B>(&self, req: Request<B>, peer: SocketAddr) -> Response<ResponseBody> {
        let started = Instant::now();
        let raw_path = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());

        let method = req.method().clone();

        let mut entry = AccessLogEntry::new(peer, method.to_string(), raw_path.clone());
        entry.http_version = version_label(req.version()).to_string();
        entry.referer = header_string(&req, &REFERER);
        entry.user_agent = header_string(&req, &USER_AGENT);
        drop(req);

        let (context, body) = self.handle(&method, &raw_path).await;

        entry.status = context.status.as_u16();
        entry.body_bytes = context.body_bytes;
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.record(&entry);

        context.into_response(body)
    }

    /// Resolve the request and choose status, headers and body
    pub async fn handle(&self, method: &Method, raw_path: &str) -> (RequestContext, ResponseBody) {
        let ctx = RequestContext::new(method.clone(), raw_path);

        if *method != Method::GET && *method != Method::HEAD {
            let policy = nominal_policy(raw_path);
            return respond_error(ctx, StatusCode::NOT_IMPLEMENTED, policy);
        }

        match self.resolver.resolve(raw_path).await {
            Resolution::Found(file) => self.respond_file(ctx, file).await,
            Resolution::NotFound => fail(ctx, Outcome::NotFound, nominal_policy(raw_path)),
            Resolution::Forbidden => {
                logger::log_path_escape(raw_path);
                fail(ctx, Outcome::Forbidden, nominal_policy(raw_path))
            }
            Resolution::ServerError(e) => {
                logger::log_error(&format!("Failed to resolve '{raw_path}': {e}"));
                fail(ctx, Outcome::ServerError, nominal_policy(raw_path))
            }
        }
    }

    async fn respond_file(
        &self,
        mut ctx: RequestContext,
        file: ResolvedFile,
    ) -> (RequestContext, ResponseBody) {
        let extension = file.extension.as_deref();
        let policy = AssetClass::from_extension(extension).policy();
        ctx.resolved_path = Some(file.path.clone());

        let handle = match File::open(&file.path).await {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return fail(ctx, Outcome::NotFound, policy);
            }
            Err(e) => {
                logger::log_read_error(&file.path, &e);
                return fail(ctx, Outcome::ServerError, policy);
            }
        };

        // The file may have changed since it was resolved
        let size = match handle.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(_) => file.size,
        };

        ctx.outcome = Some(Outcome::Found);
        ctx.status = StatusCode::OK;
        ctx.headers = compose_headers(policy, content_type_for(extension), size);

        if ctx.is_head() {
            ctx.body_bytes = 0;
            (ctx, ResponseBody::empty())
        } else {
            ctx.body_bytes = size;
            (ctx, ResponseBody::file(handle, size))
        }
    }

    fn record(&self, entry: &AccessLogEntry) {
        if let Some(sink) = &self.access_log {
            sink.record(entry);
        }
    }
}

fn nominal_policy(raw_path: &str) -> CachePolicy {
    AssetClass::from_extension(nominal_extension(raw_path).as_deref()).policy()
}

fn fail(
    mut ctx: RequestContext,
    outcome: Outcome,
    policy: CachePolicy,
) -> (RequestContext, ResponseBody) {
    ctx.outcome = Some(outcome);
    respond_error(ctx, outcome.status(), policy)
}

/// Error status with a short text body (headers only for HEAD)
fn respond_error(
    mut ctx: RequestContext,
    status: StatusCode,
    policy: CachePolicy,
) -> (RequestContext, ResponseBody) {
    let text = error_text(status);
    ctx.status = status;
    ctx.headers = compose_error_headers(policy, &text);

    if ctx.is_head() {
        ctx.body_bytes = 0;
        (ctx, ResponseBody::empty())
    } else {
        ctx.body_bytes = text.len() as u64;
        (ctx, ResponseBody::text(text))
    }
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn header_string<B>(req: &Request<B>, name: &HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<AccessLogEntry>>);

    impl AccessLogSink for Collect {
        fn record(&self, entry: &AccessLogEntry) {
            self.0.lock().unwrap().push(entry.clone());
        }
    }

    fn site() -> (tempfile::TempDir, RequestHandler) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "0123456789").unwrap();
        std::fs::write(dir.path().join("style.css"), "body{").unwrap();
        std::fs::write(dir.path().join("logo.PNG"), [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "notes").unwrap();
        let config = ServerConfig::new("127.0.0.1", 0, dir.path()).unwrap();
        (dir, RequestHandler::new(config))
    }

    async fn body_string(body: ResponseBody) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_cors(ctx: &RequestContext) {
        assert_eq!(ctx.header("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            ctx.header("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(
            ctx.header("access-control-allow-headers").unwrap(),
            "Content-Type"
        );
    }

    #[tokio::test]
    async fn test_root_serves_index_with_no_cache() {
        let (_dir, handler) = site();
        let (ctx, body) = handler.handle(&Method::GET, "/").await;
        assert_eq!(ctx.status, StatusCode::OK);
        assert_eq!(ctx.outcome, Some(Outcome::Found));
        assert!(ctx.resolved_path.as_ref().unwrap().ends_with("index.html"));
        assert_cors(&ctx);
        assert_eq!(
            ctx.header("cache-control").unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(ctx.header("pragma").unwrap(), "no-cache");
        assert_eq!(ctx.header("expires").unwrap(), "0");
        assert_eq!(ctx.header("content-type").unwrap(), "text/html; charset=utf-8");
        assert_eq!(ctx.header("content-length").unwrap(), "10");
        assert_eq!(ctx.body_bytes, 10);
        assert_eq!(body_string(body).await, "0123456789");
    }

    #[tokio::test]
    async fn test_stylesheet_cache_policy() {
        let (_dir, handler) = site();
        let (ctx, body) = handler.handle(&Method::GET, "/style.css").await;
        assert_eq!(ctx.status, StatusCode::OK);
        assert_eq!(ctx.header("cache-control").unwrap(), "public, max-age=3600");
        assert!(ctx.header("pragma").is_none());
        assert_eq!(body_string(body).await, "body{");
    }

    #[tokio::test]
    async fn test_image_extension_case_insensitive() {
        let (_dir, handler) = site();
        let (ctx, _) = handler.handle(&Method::GET, "/logo.PNG").await;
        assert_eq!(ctx.status, StatusCode::OK);
        assert_eq!(ctx.header("cache-control").unwrap(), "public, max-age=86400");
        assert_eq!(ctx.header("content-type").unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_other_extension_default_policy() {
        let (_dir, handler) = site();
        let (ctx, _) = handler.handle(&Method::GET, "/notes.txt").await;
        assert_eq!(ctx.header("cache-control").unwrap(), "public, max-age=3600");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let (_dir, handler) = site();
        let (ctx, body) = handler.handle(&Method::GET, "/missing.txt").await;
        assert_eq!(ctx.status, StatusCode::NOT_FOUND);
        assert_eq!(ctx.outcome, Some(Outcome::NotFound));
        assert!(ctx.resolved_path.is_none());
        assert_cors(&ctx);
        assert_eq!(ctx.header("content-type").unwrap(), "text/plain; charset=utf-8");
        assert_eq!(body_string(body).await, "404 Not Found");
    }

    #[tokio::test]
    async fn test_missing_markup_uses_nominal_extension() {
        let (_dir, handler) = site();
        let (ctx, _) = handler.handle(&Method::GET, "/gone.html?v=3").await;
        assert_eq!(ctx.status, StatusCode::NOT_FOUND);
        assert_eq!(
            ctx.header("cache-control").unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(ctx.header("expires").unwrap(), "0");
    }

    #[tokio::test]
    async fn test_traversal_is_403() {
        let (_dir, handler) = site();
        let (ctx, body) = handler.handle(&Method::GET, "/../../etc/passwd").await;
        assert_eq!(ctx.status, StatusCode::FORBIDDEN);
        assert_eq!(ctx.outcome, Some(Outcome::Forbidden));
        assert_cors(&ctx);
        assert_eq!(body_string(body).await, "403 Forbidden");
    }

    #[tokio::test]
    async fn test_unsupported_methods_are_501() {
        let (_dir, handler) = site();
        for method in [Method::POST, Method::OPTIONS, Method::PUT, Method::DELETE] {
            let (ctx, body) = handler.handle(&method, "/index.html").await;
            assert_eq!(ctx.status, StatusCode::NOT_IMPLEMENTED, "{method}");
            assert!(ctx.outcome.is_none());
            assert_cors(&ctx);
            assert_eq!(
                ctx.header("cache-control").unwrap(),
                "no-cache, no-store, must-revalidate"
            );
            assert_eq!(body_string(body).await, "501 Not Implemented");
        }
    }

    #[tokio::test]
    async fn test_head_matches_get_headers() {
        let (_dir, handler) = site();
        let (get, _) = handler.handle(&Method::GET, "/index.html").await;
        let (head, body) = handler.handle(&Method::HEAD, "/index.html").await;
        assert_eq!(head.status, get.status);
        assert_eq!(head.headers, get.headers);
        assert_eq!(head.body_bytes, 0);
        assert!(body_string(body).await.is_empty());
    }

    #[tokio::test]
    async fn test_head_on_error_has_no_body() {
        let (_dir, handler) = site();
        let (get, _) = handler.handle(&Method::GET, "/missing.txt").await;
        let (head, body) = handler.handle(&Method::HEAD, "/missing.txt").await;
        assert_eq!(head.status, StatusCode::NOT_FOUND);
        assert_eq!(head.headers, get.headers);
        assert!(body_string(body).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_filesystem_failure_is_500() {
        let (dir, handler) = site();
        // Resolving a self-referencing link fails with ELOOP for any uid
        std::os::unix::fs::symlink("loop.txt", dir.path().join("loop.txt")).unwrap();

        let (ctx, body) = handler.handle(&Method::GET, "/loop.txt").await;
        assert_eq!(ctx.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.outcome, Some(Outcome::ServerError));
        assert_cors(&ctx);
        assert_eq!(
            ctx.header("cache-control").unwrap(),
            "public, max-age=3600"
        );
        assert_eq!(body_string(body).await, "500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_overlong_name_is_404() {
        let (_dir, handler) = site();
        let path = format!("/{}.txt", "a".repeat(300));
        let (ctx, _) = handler.handle(&Method::GET, &path).await;
        assert_eq!(ctx.status, StatusCode::NOT_FOUND);
        assert_cors(&ctx);
    }

    #[tokio::test]
    async fn test_serve_records_access_log() {
        let (_dir, handler) = site();
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let handler = handler.with_access_log(sink.clone());
        let peer: SocketAddr = "10.0.0.7:40000".parse().unwrap();

        let req = Request::builder()
            .method(Method::GET)
            .uri("/style.css?v=9")
            .header(USER_AGENT, "test-agent")
            .body(())
            .unwrap();
        let response = handler.serve(req, peer).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let entries = sink.0.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.remote_addr.to_string(), "10.0.0.7:40000");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/style.css?v=9");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body_bytes, 5);
        assert_eq!(entry.user_agent.as_deref(), Some("test-agent"));
        assert!(entry.referer.is_none());
    }

    #[tokio::test]
    async fn test_serve_without_sink() {
        let (_dir, handler) = site();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/index.html")
            .body(())
            .unwrap();
        let response = handler.serve(req, "127.0.0.1:1".parse().unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers()["access-control-allow-headers"], "Content-Type");
    }
}
