// Connection handling module
// Serves one accepted TCP connection on its own task

use std::convert::Infallible;
use std::error::Error as _;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpStream;

use crate::config::PerformanceConfig;
use crate::handler::RequestHandler;
use crate::logger;

/// Spawn a task serving `stream` until the client closes it.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures the HTTP/1.1 connection (keep-alive)
/// 3. Registers it with `graceful` so shutdown can close it once idle
/// 4. Applies the optional connection deadline
///
/// Requests on one connection are answered strictly in order.
pub fn spawn_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: &Arc<RequestHandler>,
    graceful: &GracefulShutdown,
    performance: &PerformanceConfig,
) {
    logger::log_connection_accepted(&peer_addr);

    let io = TokioIo::new(stream);
    let handler = Arc::clone(handler);

    let mut builder = http1::Builder::new();
    builder.keep_alive(performance.keep_alive);

    let service = service_fn(move |req| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, Infallible>(handler.serve(req, peer_addr).await) }
    });
    let conn = graceful.watch(builder.serve_connection(io, service));
    let deadline = performance.connection_deadline();

    tokio::spawn(async move {
        let result = match deadline {
            Some(limit) => {
                if let Ok(result) = tokio::time::timeout(limit, conn).await {
                    result
                } else {
                    logger::log_warning(&format!(
                        "Connection from {peer_addr} timed out after {} seconds",
                        limit.as_secs()
                    ));
                    return;
                }
            }
            None => conn.await,
        };

        match result {
            Ok(()) => {}
            Err(err) if is_client_disconnect(&err) => {
                logger::log_client_disconnect(&peer_addr, &err);
            }
            Err(err) => logger::log_connection_error(&peer_addr, &err),
        }
    });
}

/// Whether a connection error only means the peer went away
fn is_client_disconnect(err: &hyper::Error) -> bool {
    if err.is_incomplete_message() || err.is_canceled() || err.is_closed() {
        return true;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = cause.source();
    }
    false
}
