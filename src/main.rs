use std::process::ExitCode;
use std::sync::Arc;

use asset_server::config::Config;
use asset_server::error::StartupError;
use asset_server::handler::RequestHandler;
use asset_server::logger::{self, TracingAccessLog};
use asset_server::server::{self, Server};

fn main() -> ExitCode {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[FATAL] invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logger::init(&cfg.logging) {
        eprintln!("[WARN] failed to install logger: {e}");
    }

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.performance.workers {
        runtime_builder.worker_threads(workers);
        tracing::info!("[CONFIG] Using {workers} worker threads");
    } else {
        tracing::info!("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = match runtime_builder.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            logger::log_error(&format!("[FATAL] failed to start runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(cfg)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(StartupError::Bind(e)) if e.is_addr_in_use() => {
            logger::log_error(&format!("[FATAL] {e}"));
            logger::log_error("[FATAL] stop the other process or choose another port with PORT");
            ExitCode::FAILURE
        }
        Err(e) => {
            logger::log_error(&format!("[FATAL] {e}"));
            ExitCode::FAILURE
        }
    }
}

async fn async_main(cfg: Config) -> Result<(), StartupError> {
    let server_config = cfg.to_server_config()?;

    let mut handler = RequestHandler::new(server_config);
    if cfg.logging.access_log {
        let sink = TracingAccessLog::new(&cfg.logging.access_log_format);
        handler = handler.with_access_log(Arc::new(sink));
    }

    let server = Server::bind(handler, cfg.performance.clone())?;
    let addr = server.local_addr()?;
    logger::log_server_start(&addr, &server.config().root);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        shutdown.trigger();
    });

    server.serve().await;
    Ok(())
}
