// =============================================================================
// Dashboard Configuration: start-up settings loaded from JSON
// =============================================================================
//
// Everything tunable about the dashboard lives here: where to listen, how to
// reach the market-data provider, the sidebar defaults and the indicator
// parameters. The file is read once at start-up; nothing is ever written
// back, so user choices made in the page are never persisted.
//
// All fields carry `#[serde(default)]` so that a partial (or empty) file
// still loads.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::RsiSmoothing;
use crate::types::{Interval, Span};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_raw_rows() -> usize {
    20
}

fn default_sma_window() -> usize {
    20
}

fn default_ema_span() -> usize {
    20
}

fn default_rsi_period() -> usize {
    14
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Look-back parameters for the three derived columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Trailing window of the simple moving average.
    #[serde(default = "default_sma_window")]
    pub sma_window: usize,

    /// Span of the exponential moving average (`alpha = 2 / (span + 1)`).
    #[serde(default = "default_ema_span")]
    pub ema_span: usize,

    /// RSI look-back period.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Average gain/loss smoothing used by the RSI.
    #[serde(default)]
    pub rsi_smoothing: RsiSmoothing,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_window: default_sma_window(),
            ema_span: default_ema_span(),
            rsi_period: default_rsi_period(),
            rsi_smoothing: RsiSmoothing::default(),
        }
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Server -------------------------------------------------------------

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Provider -----------------------------------------------------------

    /// Base URL of the Yahoo Finance chart API.
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// User-Agent sent to the provider (it rejects empty agents).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Sidebar defaults ---------------------------------------------------

    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default)]
    pub default_span: Span,

    #[serde(default)]
    pub default_interval: Interval,

    /// Rows shown by the raw-data preview.
    #[serde(default = "default_raw_rows")]
    pub raw_rows: usize,

    // --- Indicators ---------------------------------------------------------

    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            provider_base_url: default_provider_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            default_symbol: default_symbol(),
            default_span: Span::default(),
            default_interval: Interval::default(),
            raw_rows: default_raw_rows(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            provider = %config.provider_base_url,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Apply `DASHBOARD_*` environment overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(addr) = non_empty("DASHBOARD_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = non_empty("DASHBOARD_PROVIDER_URL") {
            self.provider_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(agent) = non_empty("DASHBOARD_USER_AGENT") {
            self.user_agent = agent;
        }
    }
}
