// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight ones

use std::sync::Arc;
use std::time::Duration;

use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::spawn_connection;
use crate::config::PerformanceConfig;
use crate::handler::RequestHandler;
use crate::logger;

/// Pause after a failed accept so fd exhaustion does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Run the accept loop.
///
/// Each accepted connection gets its own task. Once `shutdown` flips to
/// `true` the listener is closed, idle keep-alive connections are closed and
/// this function returns only after every in-flight response has been sent.
pub async fn run_accept_loop(
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    performance: PerformanceConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let graceful = GracefulShutdown::new();

    let shutdown_requested = async move {
        // Err means every handle is gone; treat it as a request to stop
        let _ = shutdown.wait_for(|&requested| requested).await;
    };
    tokio::pin!(shutdown_requested);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown_requested => break,

            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => {
                    spawn_connection(stream, peer_addr, &handler, &graceful, &performance);
                }
                Err(e) => {
                    logger::log_error(&format!("Failed to accept connection: {e}"));
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
        }
    }

    // Stop accepting before draining
    drop(listener);
    logger::log_shutdown_requested();

    graceful.shutdown().await;
    logger::log_shutdown_complete();
}
