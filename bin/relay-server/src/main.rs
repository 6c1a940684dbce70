//! waha-relay server
//!
//! Accepts `POST /send` requests, queues them in memory and delivers them to
//! a WAHA gateway with a fixed pool of workers, rotating across the
//! configured sessions.
//!
//! ## Shutdown
//!
//! On SIGINT/SIGTERM the HTTP server stops accepting connections first, so
//! no new jobs arrive. The dispatcher then drains what is already queued,
//! bounded by `dispatcher.shutdown_timeout_secs`.

use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, error};

use relay_config::{AppConfig, ConfigLoader};
use relay_dispatch::{
    api::create_router_with_metrics, Dispatcher, DispatcherConfig, WahaClient, WahaClientConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    relay_common::logging::init_logging("relay-server");

    info!("Starting waha-relay");

    // 1. Configuration
    let config = ConfigLoader::new().load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    // 2. Metrics recorder
    let prometheus = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed, /metrics will be empty");
            None
        }
    };

    // 3. Delivery client and dispatcher
    let client = WahaClient::new(WahaClientConfig {
        base_url: config.gateway.base_url.clone(),
        api_key: config.gateway.api_key.clone(),
        timeout: Duration::from_secs(config.gateway.timeout_secs),
        connect_timeout: Duration::from_secs(config.gateway.connect_timeout_secs),
    })
    .context("failed to build gateway client")?;

    let dispatcher = Arc::new(Dispatcher::new(dispatcher_config(&config), Arc::new(client))?);
    dispatcher.start()?;

    log_startup_summary(&config);

    // 4. HTTP API
    let app = create_router_with_metrics(dispatcher.clone(), prometheus)
        .layer(TraceLayer::new_for_http());

    let addr = config.http.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, "HTTP server listening");

    let (server_stop_tx, server_stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = server_stop_rx.await;
            })
            .await
    });

    // 5. Wait for a shutdown signal (or an early server failure)
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received...");
        }
        result = &mut server_task => {
            error!(result = ?result, "HTTP server exited unexpectedly");
        }
    }

    // Stop intake before draining so nothing is enqueued after stop() begins
    let _ = server_stop_tx.send(());
    if !server_task.is_finished() {
        let http_timeout = Duration::from_secs(config.http.shutdown_timeout_secs);
        match tokio::time::timeout(http_timeout, &mut server_task).await {
            Ok(_) => info!("HTTP server stopped"),
            Err(_) => {
                warn!(timeout_secs = http_timeout.as_secs(), "HTTP server did not stop in time, aborting");
                server_task.abort();
            }
        }
    }

    info!("Waiting for workers to finish queued jobs...");
    let report = dispatcher.stop().await?;
    if !report.drained {
        warn!(
            aborted_workers = report.aborted_workers,
            discarded_jobs = report.discarded_jobs,
            "Shutdown deadline hit before queue drained"
        );
    }

    info!("waha-relay shutdown complete");
    Ok(())
}

fn dispatcher_config(config: &AppConfig) -> DispatcherConfig {
    DispatcherConfig {
        workers: config.dispatcher.workers,
        queue_capacity: config.dispatcher.queue_capacity,
        sessions: config.gateway.sessions.clone(),
        shutdown_timeout: config.dispatcher.shutdown_timeout(),
    }
}

fn log_startup_summary(config: &AppConfig) {
    info!("=== waha-relay Startup Summary ===");
    info!("  Gateway: {}", config.gateway.base_url);
    info!("  Sessions: {}", config.gateway.sessions.join(", "));
    info!("  Workers: {}", config.dispatcher.workers);
    info!("  Queue capacity: {}", config.dispatcher.queue_capacity);
    match config.dispatcher.shutdown_timeout() {
        Some(timeout) => info!("  Drain deadline: {}s", timeout.as_secs()),
        None => info!("  Drain deadline: none"),
    }
    info!("==================================");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
