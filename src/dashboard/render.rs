// =============================================================================
// Render pipeline: one acyclic pass per page request
// =============================================================================
//
//   inputs -> provider fetch -> empty check -> indicators -> charts + metric
//
// Two failure tiers:
//   1. The provider answers with no bars: `NoData`, indicators never run.
//   2. Anything else that fails inside the pass becomes `Error` with the
//      cause chain appended to a generic message.
// Either the whole view is produced or only a message is; never a mix.
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dashboard::chart::{self, Figure};
use crate::dashboard::metric::HeadlineMetric;
use crate::indicators::rsi_zone;
use crate::market_data::{PriceTable, TableRow};
use crate::provider::{HistoryRequest, MarketDataProvider};
use crate::runtime_config::DashboardConfig;
use crate::types::{DashboardQuery, Interval, Span};

pub const NO_DATA_MESSAGE: &str = "No data found for symbol. Please check the input and try again.";
pub const FAILURE_PREFIX: &str = "Error fetching or processing data";

/// Terminal state of one render.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Rendered(Box<DashboardView>),
    NoData { render_id: Uuid, message: String },
    Error { render_id: Uuid, message: String },
}

impl RenderOutcome {
    pub fn render_id(&self) -> Uuid {
        match self {
            Self::Rendered(view) => view.render_id,
            Self::NoData { render_id, .. } | Self::Error { render_id, .. } => *render_id,
        }
    }

    /// User-facing message for the non-rendered states.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rendered(_) => None,
            Self::NoData { message, .. } | Self::Error { message, .. } => Some(message),
        }
    }
}

/// Everything the page shows after a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub render_id: Uuid,
    pub symbol: String,
    pub span: Span,
    pub interval: Interval,
    pub currency: String,
    pub rows: usize,
    pub price_chart: Figure,
    /// e.g. `RSI (14)`
    pub rsi_heading: String,
    pub rsi_chart: Figure,
    pub rsi_latest: Option<RsiReading>,
    pub metric: HeadlineMetric,
    /// Present only when the raw-data toggle is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawTable>,
}

/// Most recent oscillator value with its zone label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiReading {
    pub value: f64,
    pub zone: &'static str,
}

/// Trailing rows of the full table, verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// `Real-Time Stock Dashboard: AAPL`
pub fn page_title(symbol: &str) -> String {
    format!("Real-Time Stock Dashboard: {symbol}")
}

/// Run one render for `query`. Never fails: every error ends up inside the
/// returned outcome.
pub async fn render_dashboard(
    provider: &dyn MarketDataProvider,
    query: &DashboardQuery,
    config: &DashboardConfig,
) -> RenderOutcome {
    let render_id = Uuid::new_v4();

    match try_render(provider, query, config, render_id).await {
        Ok(Some(view)) => {
            info!(
                %render_id,
                symbol = %query.symbol,
                span = %query.span,
                interval = %query.interval,
                rows = view.rows,
                "dashboard rendered"
            );
            RenderOutcome::Rendered(Box::new(view))
        }
        Ok(None) => {
            warn!(%render_id, symbol = %query.symbol, span = %query.span, interval = %query.interval, "no data for symbol");
            RenderOutcome::NoData {
                render_id,
                message: NO_DATA_MESSAGE.to_string(),
            }
        }
        Err(e) => {
            error!(%render_id, symbol = %query.symbol, error = %format!("{e:#}"), "dashboard render failed");
            RenderOutcome::Error {
                render_id,
                message: format!("{FAILURE_PREFIX}: {e:#}"),
            }
        }
    }
}

/// `Ok(None)` is the explicit empty-result path.
async fn try_render(
    provider: &dyn MarketDataProvider,
    query: &DashboardQuery,
    config: &DashboardConfig,
    render_id: Uuid,
) -> Result<Option<DashboardView>> {
    let request = HistoryRequest {
        symbol: query.symbol.clone(),
        span: query.span,
        interval: query.interval,
    };

    let history = provider.fetch_history(&request).await?;
    let currency = history.currency;
    let mut table = PriceTable::new(history.bars).context("provider returned inconsistent bars")?;
    if table.is_empty() {
        return Ok(None);
    }

    table.compute_indicators(&config.indicators);

    let metric = HeadlineMetric::from_table(&table, &currency)
        .context("price table has no closing price")?;

    let rsi_latest = table
        .rsi()
        .last()
        .copied()
        .flatten()
        .map(|value| RsiReading {
            value,
            zone: rsi_zone(value),
        });

    let raw = query.show_raw.then(|| RawTable {
        columns: table.labels().map(|l| l.headers()).unwrap_or_default(),
        rows: table.tail(config.raw_rows),
    });

    Ok(Some(DashboardView {
        render_id,
        symbol: query.symbol.clone(),
        span: query.span,
        interval: query.interval,
        rows: table.len(),
        price_chart: chart::price_chart(&table, &query.symbol, &currency),
        rsi_heading: format!("RSI ({})", config.indicators.rsi_period),
        rsi_chart: chart::rsi_chart(&table),
        rsi_latest,
        metric,
        raw,
        currency,
    }))
}
