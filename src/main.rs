// =============================================================================
// Stock Dashboard: Main Entry Point
// =============================================================================
//
// Serves a single-page dashboard. Every request is one fresh, independent
// render: fetch bars, derive indicators, draw charts. Nothing is cached
// between requests.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod dashboard;
mod indicators;
mod market_data;
mod provider;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::YahooClient;
use crate::runtime_config::DashboardConfig;

const DEFAULT_CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Stock Dashboard: Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });
    config.apply_env_overrides();

    info!(
        default_symbol = %config.default_symbol,
        default_span = %config.default_span,
        default_interval = %config.default_interval,
        sma = config.indicators.sma_window,
        ema = config.indicators.ema_span,
        rsi = config.indicators.rsi_period,
        "Dashboard defaults"
    );

    // ── 2. Market data provider ──────────────────────────────────────────
    let provider = Arc::new(YahooClient::new(&config)?);

    // ── 3. Build shared state ────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, provider));

    // ── 4. Start the HTTP server ─────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Stock Dashboard shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
    }
    warn!("Shutdown signal received, stopping gracefully");
}
