// =============================================================================
// Application State: shared by every request handler
// =============================================================================
//
// Renders are independent of each other; the only things shared are the
// read-only configuration, the provider client and a few diagnostics
// counters.
//
// Thread safety:
//   - Atomic counters for lock-free render statistics.
//   - parking_lot::RwLock for the bounded recent-failure log.
//   - Arc wrappers for the configuration and the provider.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::dashboard::RenderOutcome;
use crate::provider::MarketDataProvider;
use crate::runtime_config::DashboardConfig;
use crate::types::DashboardQuery;

// =============================================================================
// Error Record
// =============================================================================

/// A failed render, kept for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub render_id: Uuid,
    pub symbol: String,
    /// The message the user was shown.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent failures to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Shared state handed to axum as `Arc<AppState>`.
pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: Arc<DashboardConfig>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub provider: Arc<dyn MarketDataProvider>,

    // ── Render statistics ───────────────────────────────────────────────
    pub renders_total: AtomicU64,
    pub no_data_total: AtomicU64,
    pub failed_total: AtomicU64,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the server was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            renders_total: AtomicU64::new(0),
            no_data_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Statistics ──────────────────────────────────────────────────────

    /// Count a finished render and remember it if it failed.
    pub fn record_outcome(&self, query: &DashboardQuery, outcome: &RenderOutcome) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        match outcome {
            RenderOutcome::Rendered(_) => {}
            RenderOutcome::NoData { .. } => {
                self.no_data_total.fetch_add(1, Ordering::Relaxed);
            }
            RenderOutcome::Error {
                render_id, message, ..
            } => {
                self.failed_total.fetch_add(1, Ordering::Relaxed);
                self.push_error(ErrorRecord {
                    render_id: *render_id,
                    symbol: query.symbol.clone(),
                    message: message.clone(),
                    at: Utc::now().to_rfc3339(),
                });
            }
        }
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a failure. The log is capped at [`MAX_RECENT_ERRORS`]; oldest
    /// entries are evicted when the limit is reached.
    fn push_error(&self, record: ErrorRecord) {
        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            renders_total: self.renders_total.load(Ordering::Relaxed),
            no_data_total: self.no_data_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

/// Serialisable view of the render statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RenderStats {
    pub renders_total: u64,
    pub no_data_total: u64,
    pub failed_total: u64,
    pub uptime_secs: u64,
    pub recent_errors: Vec<ErrorRecord>,
}
