// =============================================================================
// Yahoo Finance chart API client
// =============================================================================
//
// One public, unauthenticated endpoint is used:
//
//   GET {base}/v8/finance/chart/{symbol}?range=3mo&interval=1d
//
// The answer carries parallel arrays (timestamp + quote.open/high/low/close/
// volume) in which any element may be null. Rows with a missing price are
// dropped; an unknown symbol comes back as HTTP 404 with
// `chart.error.code == "Not Found"` and is reported as an empty history.
// =============================================================================

use anyhow::{Context, Result};
use chrono::DateTime;
use futures_util::future::BoxFuture;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::Bar;
use crate::provider::{HistoryRequest, MarketDataProvider, PriceHistory, DEFAULT_CURRENCY};
use crate::runtime_config::DashboardConfig;

/// Error code the chart API uses for unknown or delisted symbols.
const NOT_FOUND_CODE: &str = "Not Found";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client from the provider section of `config`.
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let base_url = Url::parse(&config.provider_base_url)
            .with_context(|| format!("invalid provider base URL '{}'", config.provider_base_url))?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Full chart URL for `request`, with the symbol percent-encoded as a
    /// single path segment.
    pub fn chart_url(&self, request: &HistoryRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("provider base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", request.symbol.as_str()]);
        url.query_pairs_mut()
            .append_pair("range", request.span.as_str())
            .append_pair("interval", request.interval.as_str())
            .append_pair("includePrePost", "false")
            .append_pair("events", "div,splits");
        Ok(url)
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol} and parse it into a [`PriceHistory`].
    #[instrument(skip(self, request), name = "yahoo::get_chart", fields(symbol = %request.symbol, span = %request.span, interval = %request.interval))]
    pub async fn get_chart(&self, request: &HistoryRequest) -> Result<PriceHistory> {
        if request.symbol.is_empty() {
            warn!("empty symbol requested, returning empty history");
            return Ok(PriceHistory::empty(""));
        }

        let url = self.chart_url(request)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        let history = parse_chart_response(status, &body, &request.symbol)?;
        debug!(count = history.bars.len(), currency = %history.currency, "chart fetched");
        Ok(history)
    }
}

impl MarketDataProvider for YahooClient {
    fn fetch_history<'a>(&'a self, request: &'a HistoryRequest) -> BoxFuture<'a, Result<PriceHistory>> {
        Box::pin(self.get_chart(request))
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// =============================================================================
// Response schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Turn a raw chart response into a [`PriceHistory`].
///
/// - `chart.error.code == "Not Found"`, a null/empty result, or a result
///   without timestamps => empty history.
/// - Other provider errors, non-success statuses, unparsable bodies and
///   mismatched array lengths => `Err`.
fn parse_chart_response(status: StatusCode, body: &str, requested: &str) -> Result<PriceHistory> {
    let envelope: ChartEnvelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(_) if !status.is_success() => {
            anyhow::bail!("Yahoo chart API returned {status}: {}", truncate(body, 200))
        }
        Err(e) => return Err(e).context("failed to parse chart response"),
    };

    if let Some(err) = envelope.chart.error {
        if err.code == NOT_FOUND_CODE {
            warn!(symbol = requested, description = ?err.description, "symbol not found");
            return Ok(PriceHistory::empty(requested));
        }
        anyhow::bail!(
            "Yahoo chart API error {}: {}",
            err.code,
            err.description.unwrap_or_default()
        );
    }

    if !status.is_success() {
        anyhow::bail!("Yahoo chart API returned {status}");
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceHistory::empty(requested));
    };

    let meta = result.meta.unwrap_or(ChartMeta {
        currency: None,
        symbol: None,
    });
    let symbol = meta.symbol.unwrap_or_else(|| requested.to_string());
    let currency = meta
        .currency
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Ok(PriceHistory {
            symbol,
            currency,
            bars: Vec::new(),
        });
    }

    let quote = result
        .indicators
        .and_then(|ind| ind.quote.into_iter().next())
        .context("chart response missing indicators.quote")?;

    let bars = build_bars(&timestamps, &quote)?;
    Ok(PriceHistory {
        symbol,
        currency,
        bars,
    })
}

/// Zip the parallel arrays into bars (ascending, unique timestamps).
fn build_bars(timestamps: &[i64], quote: &Quote) -> Result<Vec<Bar>> {
    let n = timestamps.len();
    for (name, len) in [
        ("open", quote.open.len()),
        ("high", quote.high.len()),
        ("low", quote.low.len()),
        ("close", quote.close.len()),
    ] {
        if len != n {
            anyhow::bail!("malformed chart response: {name} has {len} entries, expected {n}");
        }
    }
    // Volume is optional for some instruments; when present it must line up.
    if !quote.volume.is_empty() && quote.volume.len() != n {
        anyhow::bail!(
            "malformed chart response: volume has {} entries, expected {n}",
            quote.volume.len()
        );
    }

    let mut bars: Vec<Bar> = Vec::with_capacity(n);
    let mut skipped = 0usize;

    for (i, &ts) in timestamps.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (quote.open[i], quote.high[i], quote.low[i], quote.close[i])
        else {
            skipped += 1;
            continue;
        };
        if ![open, high, low, close].iter().all(|v| v.is_finite()) {
            skipped += 1;
            continue;
        }

        let timestamp = DateTime::from_timestamp(ts, 0)
            .with_context(|| format!("invalid bar timestamp {ts}"))?;
        let volume = quote
            .volume
            .get(i)
            .copied()
            .flatten()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64);

        let bar = Bar::new(timestamp, open, high, low, close, volume);

        match bars.last() {
            // The live bar is sometimes repeated with the same start time.
            Some(last) if last.timestamp == timestamp => {
                if let Some(slot) = bars.last_mut() {
                    *slot = bar;
                }
            }
            Some(last) if last.timestamp > timestamp => {
                anyhow::bail!(
                    "malformed chart response: timestamp {ts} precedes {}",
                    last.timestamp.timestamp()
                );
            }
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        debug!(skipped, kept = bars.len(), "dropped bars with missing prices");
    }

    Ok(bars)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
