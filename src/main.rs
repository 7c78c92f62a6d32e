use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use slotbook::engine::{InMemoryAvailability, InMemoryBookings, SchedulingService};
use slotbook::{config, http, observability};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("SLOTBOOK_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    observability::init(metrics_port);

    let port = std::env::var("SLOTBOOK_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("SLOTBOOK_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let seed_path = std::env::var("SLOTBOOK_SEED").ok().map(PathBuf::from);

    let service = Arc::new(SchedulingService::new(
        Arc::new(InMemoryAvailability::new()),
        Arc::new(InMemoryBookings::new()),
    ));

    if let Some(path) = &seed_path {
        let seed = config::load(path)?;
        config::apply(seed, &service).await?;
        info!("seed applied from {}", path.display());
    }

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("slotbook listening on {addr}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Stop accepting on SIGTERM/ctrl-c; axum drains in-flight requests.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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
    };

    axum::serve(listener, http::router(service))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("slotbook stopped");
    Ok(())
}
