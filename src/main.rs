use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use lendit::compactor;
use lendit::engine::Engine;
use lendit::http;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("LENDIT_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    lendit::observability::init(metrics_port);

    let port = std::env::var("LENDIT_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("LENDIT_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("LENDIT_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let compact_threshold: u64 = std::env::var("LENDIT_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);
    let reject_overlaps = std::env::var("LENDIT_REJECT_OVERLAPS")
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;
    let wal_path = PathBuf::from(&data_dir).join("lendit.wal");

    let engine = Arc::new(Engine::new(wal_path, reject_overlaps)?);
    tokio::spawn(compactor::run_compactor(engine.clone(), compact_threshold));

    let app = http::router(engine);
    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("lendit listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!("  reject_overlaps: {reject_overlaps}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("lendit stopped");
    Ok(())
}

/// Resolve on SIGTERM or ctrl-c so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
}
