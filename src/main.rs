//! Child/parent image comparison service
//!
//! Scores uploaded image pairs with structural similarity and exposes the
//! face-detection and age-estimation models over a small REST API.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use childmatch::api::rest::{create_rest_router, AppState};
use childmatch::config::Config;
use childmatch::engine::ModelPool;
use childmatch::service::{CompareService, FaceService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting childmatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load(Config::default_path()).unwrap_or_else(|e| {
        info!("Using default config ({})", e);
        Config::default()
    });
    config.validate().context("Invalid configuration")?;

    info!("Configuration loaded:");
    info!("  Listen address: {}", config.bind_addr());
    info!("  Device: {}", config.inference.device);
    info!("  Detection confidence threshold: {}", config.detection.confidence_threshold);
    info!("  Similarity threshold: {}", config.comparison.similarity_threshold);
    info!("  Checked pairs: {}", config.comparison.checked_pairs);
    info!("  Canvas size: {}", config.comparison.canvas_size);

    // Load every model up front; a missing model aborts startup
    let pool = Arc::new(ModelPool::load(&config.inference, &config.models)?);

    let compare = Arc::new(CompareService::new(config.comparison.clone()));
    let faces = Arc::new(FaceService::new(pool, config.detection.clone()));

    let app_state = Arc::new(AppState {
        compare,
        faces: Some(faces),
        start_time: Instant::now(),
    });

    let router = create_rest_router(app_state, config.server.body_limit_mb * 1024 * 1024);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("REST API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    info!("Goodbye!");
    Ok(())
}
