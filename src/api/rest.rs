// =============================================================================
// HTTP Endpoints: Axum 0.7
// =============================================================================
//
// `/` serves the rendered dashboard page. Everything under `/api/v1/` is JSON:
// the same render as a structured outcome, the selector options, and a health
// report with render statistics.
//
// CORS is configured permissively; the dashboard holds no credentials.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::app_state::{AppState, RenderStats};
use crate::dashboard::page::{render_page, PageContent};
use crate::dashboard::{render_dashboard, RenderOutcome};
use crate::runtime_config::{DashboardConfig, IndicatorParams};
use crate::types::{DashboardQuery, Interval, Span};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Page ────────────────────────────────────────────────────
        .route("/", get(index))
        // ── JSON ────────────────────────────────────────────────────
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/options", get(options))
        .route("/api/v1/health", get(health))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Query parameters
// =============================================================================

/// Raw control values as they arrive from the sidebar form.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub symbol: Option<String>,
    pub span: Option<String>,
    pub interval: Option<String>,
    /// Checkbox value; `on`, `true` and `1` turn the raw table on.
    pub raw: Option<String>,
}

impl DashboardParams {
    /// Resolve into a render request, filling absent values from `config`.
    ///
    /// An absent symbol takes the configured default. A present but blank
    /// symbol is kept blank and ends up on the no-data path.
    pub fn resolve(&self, config: &DashboardConfig) -> Result<DashboardQuery> {
        let span = match non_blank(&self.span) {
            Some(s) => s.parse::<Span>().context("invalid span")?,
            None => config.default_span,
        };
        let interval = match non_blank(&self.interval) {
            Some(s) => s.parse::<Interval>().context("invalid interval")?,
            None => config.default_interval,
        };
        Ok(DashboardQuery::new(
            self.symbol.as_deref().unwrap_or(&config.default_symbol),
            span,
            interval,
            self.show_raw(),
        ))
    }

    /// Values the controls should show when [`resolve`](Self::resolve) fails.
    fn fallback_form(&self, config: &DashboardConfig) -> DashboardQuery {
        let span = non_blank(&self.span)
            .and_then(|s| s.parse().ok())
            .unwrap_or(config.default_span);
        let interval = non_blank(&self.interval)
            .and_then(|s| s.parse().ok())
            .unwrap_or(config.default_interval);
        DashboardQuery::new(
            self.symbol.as_deref().unwrap_or(&config.default_symbol),
            span,
            interval,
            self.show_raw(),
        )
    }

    fn show_raw(&self) -> bool {
        matches!(
            self.raw.as_deref().map(str::trim),
            Some("on") | Some("true") | Some("1")
        )
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Run one render and count it.
async fn run_render(state: &AppState, query: &DashboardQuery) -> RenderOutcome {
    let outcome = render_dashboard(state.provider.as_ref(), query, &state.config).await;
    state.record_outcome(query, &outcome);
    outcome
}

// =============================================================================
// Page
// =============================================================================

/// The page always answers 200; failures are shown inside it.
async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Html<String>, ApiError> {
    let html = match params.resolve(&state.config) {
        Ok(query) => {
            let outcome = run_render(&state, &query).await;
            render_page(&query, PageContent::Outcome(&outcome))?
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(error = %message, "rejected dashboard controls");
            let form = params.fallback_form(&state.config);
            render_page(&form, PageContent::InputError(&message))?
        }
    };
    Ok(Html(html))
}

// =============================================================================
// Dashboard (JSON)
// =============================================================================

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Response, ApiError> {
    let query = params
        .resolve(&state.config)
        .map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;

    let outcome = run_render(&state, &query).await;
    let status = match &outcome {
        RenderOutcome::Rendered(_) => StatusCode::OK,
        RenderOutcome::NoData { .. } => StatusCode::NOT_FOUND,
        RenderOutcome::Error { .. } => StatusCode::BAD_GATEWAY,
    };
    debug!(render_id = %outcome.render_id(), %status, "dashboard json served");
    Ok((status, Json(outcome)).into_response())
}

// =============================================================================
// Options
// =============================================================================

#[derive(Serialize)]
struct OptionsResponse {
    spans: &'static [Span],
    intervals: &'static [Interval],
    default_symbol: String,
    default_span: Span,
    default_interval: Interval,
    raw_rows: usize,
    indicators: IndicatorParams,
}

async fn options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    Json(OptionsResponse {
        spans: &Span::ALL,
        intervals: &Interval::ALL,
        default_symbol: config.default_symbol.clone(),
        default_span: config.default_span,
        default_interval: config.default_interval,
        raw_rows: config.raw_rows,
        indicators: config.indicators.clone(),
    })
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    #[serde(flatten)]
    stats: RenderStats,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        stats: state.stats(),
    })
}
