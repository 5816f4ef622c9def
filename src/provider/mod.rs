// =============================================================================
// Market-data provider seam
// =============================================================================
//
// The render pipeline only sees `MarketDataProvider`; the production
// implementation talks to the Yahoo Finance chart API, tests plug in a
// canned provider.
// =============================================================================

pub mod yahoo;

use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::market_data::Bar;
use crate::types::{Interval, Span};

pub use yahoo::YahooClient;

/// What to fetch: one symbol over one span at one sampling interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRequest {
    pub symbol: String,
    pub span: Span,
    pub interval: Interval,
}

/// Provider answer. An empty `bars` vector means "unknown symbol or no data
/// in range", which is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    pub symbol: String,
    /// Quote currency reported by the provider, e.g. `USD`.
    pub currency: String,
    /// Ascending, unique timestamps.
    pub bars: Vec<Bar>,
}

impl PriceHistory {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            bars: Vec::new(),
        }
    }
}

/// Currency assumed when the provider does not report one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Source of historical bars.
///
/// Implementations return `Err` when the provider is unreachable or answers
/// with something that cannot be parsed, and `Ok` with no bars when the
/// symbol is unknown or has no data for the requested range.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_history<'a>(&'a self, request: &'a HistoryRequest) -> BoxFuture<'a, Result<PriceHistory>>;
}
