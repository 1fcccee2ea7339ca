//! Behavioral Analytics Engine
//!
//! Tracking endpoints append page views, clicks, scroll depth, sessions and
//! custom events to ClickHouse stream tables. Dashboard endpoints aggregate
//! them over trailing windows, and a scheduled exporter writes incremental
//! aggregates to object storage.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{EventStore, StoreStatus};
use telemetry::{health, init_tracing_from_env};
use worker::{
    ExportScheduler, Exporter, FileWatermark, MemoryWatermark, ObjectSink, OpendalSink,
    WatermarkStore,
};

use crate::config::{load_config, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing_from_env(config.debug);

    info!("Starting Analytics Engine v{}", env!("CARGO_PKG_VERSION"));

    // Never fails; a bad configuration or unreachable server yields a degraded store
    let store = Arc::new(EventStore::initialize(config.clickhouse.clone()).await);
    match store.status() {
        StoreStatus::Connected => health().clickhouse.set_healthy(),
        StoreStatus::Degraded(reason) => {
            health().clickhouse.set_unhealthy(reason.to_string());
            warn!(reason = %reason, "Event store degraded, tracking calls will be acknowledged and dropped");
        }
    }

    let sink: Arc<dyn ObjectSink> = Arc::new(
        OpendalSink::from_config(&config.storage).context("Failed to configure object storage")?,
    );
    let watermark = open_watermark(&config).await;
    info!(
        sink = %sink.target(),
        watermark = %watermark.current(),
        "Export sink configured"
    );

    let exporter = Arc::new(Exporter::new(store.clone(), sink, watermark));
    let scheduler = Arc::new(ExportScheduler::new(
        config.export.scheduler_config(),
        exporter.clone(),
    ));
    let scheduler_handles = scheduler.start();

    let app = router(AppState::new(store, exporter));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");
    for handle in scheduler_handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// File-backed when a path is configured, otherwise starts at launch time.
async fn open_watermark(config: &AppConfig) -> Arc<dyn WatermarkStore> {
    match &config.export.watermark_path {
        Some(path) => Arc::new(FileWatermark::open(path, Utc::now()).await),
        None => Arc::new(MemoryWatermark::starting_now()),
    }
}

/// Graceful shutdown signal handler.
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
