//! # cgw-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Compliance Gateway.
//!
//! Environment: `PORT` (default 8080), `CGW_CONFIG` (YAML file),
//! `CGW_SCAN_SEED` (reproducible scans), `LOG_FORMAT=json`, `RUST_LOG`,
//! plus the `CGW_*` setting overrides.

use std::path::Path;

use anyhow::Context;

use cgw_api::middleware::metrics::install_recorder;
use cgw_api::{AppConfig, AppState};
use cgw_core::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let mut gateway = match std::env::var("CGW_CONFIG") {
        Ok(path) => GatewayConfig::load(Path::new(&path))
            .with_context(|| format!("loading gateway config from {path}"))?,
        Err(_) => GatewayConfig::default(),
    };
    gateway
        .apply_process_env()
        .context("applying CGW_* overrides")?;

    let scan_seed = match std::env::var("CGW_SCAN_SEED") {
        Ok(raw) => Some(
            raw.parse::<u64>()
                .with_context(|| format!("CGW_SCAN_SEED is not a u64: {raw}"))?,
        ),
        Err(_) => None,
    };

    let config = AppConfig {
        port,
        gateway,
        scan_seed,
    };
    tracing::info!(
        scan_mode = %config.gateway.scan.mode,
        review_cadence_days = config.gateway.governance.review_cadence_days,
        seeded = config.scan_seed.is_some(),
        "configuration loaded"
    );

    let handle = install_recorder().context("installing Prometheus recorder")?;
    let state = AppState::with_config(config).with_metrics(handle);
    let app = cgw_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Compliance Gateway API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
