mod error;
mod routes;
mod state;

use anyhow::Result;
use shared::Config;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::state::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    info!("Starting market data service...");

    let pipeline = Pipeline::connect(&config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut workers = pipeline.consumer.clone().spawn(shutdown_rx.clone());
    info!(partitions = workers.len(), "Queue consumers started");
    if let Some(scheduler) = pipeline.scheduler.clone() {
        workers.extend(scheduler.spawn(shutdown_rx.clone()));
        info!("Scheduler started");
    }

    let app = routes::router(pipeline.state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr).await?;
    info!("API server listening on http://{}", config.api_bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping background workers...");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            error!("Worker task failed: {}", e);
        }
    }
    info!("Shutdown complete");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
