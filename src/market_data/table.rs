use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indicators::{calculate_ema, calculate_rsi, calculate_sma};
use crate::runtime_config::IndicatorParams;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV bar as delivered by the market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar start time.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Not every provider/interval reports volume.
    pub volume: Option<u64>,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Display names of the derived columns, e.g. `SMA20`, `EMA20`, `RSI14`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLabels {
    pub sma: String,
    pub ema: String,
    pub rsi: String,
}

impl ColumnLabels {
    pub fn from_params(params: &IndicatorParams) -> Self {
        Self {
            sma: format!("SMA{}", params.sma_window),
            ema: format!("EMA{}", params.ema_span),
            rsi: format!("RSI{}", params.rsi_period),
        }
    }

    /// Every column header of the full table, in display order.
    pub fn headers(&self) -> Vec<String> {
        ["Datetime", "Open", "High", "Low", "Close", "Volume"]
            .into_iter()
            .map(str::to_string)
            .chain([self.sma.clone(), self.ema.clone(), self.rsi.clone()])
            .collect()
    }
}

/// One row of the full table (bar plus derived columns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
}

#[derive(Debug, Clone)]
struct IndicatorColumns {
    labels: ColumnLabels,
    sma: Vec<Option<f64>>,
    ema: Vec<f64>,
    rsi: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// PriceTable -- one render's worth of bars plus derived columns
// ---------------------------------------------------------------------------

/// The per-render price table. Built from the provider's bars, extended in
/// place with the indicator columns, and dropped when the render ends.
#[derive(Debug, Clone)]
pub struct PriceTable {
    bars: Vec<Bar>,
    indicators: Option<IndicatorColumns>,
}

impl PriceTable {
    /// Wrap provider bars, checking the invariants the indicators rely on:
    /// timestamps strictly ascending and every close finite.
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for pair in bars.windows(2) {
            ensure!(
                pair[0].timestamp < pair[1].timestamp,
                "bars out of order: {} is not before {}",
                pair[0].timestamp,
                pair[1].timestamp
            );
        }
        if let Some(bad) = bars.iter().find(|b| !b.close.is_finite()) {
            anyhow::bail!("non-finite close at {}", bad.timestamp);
        }

        Ok(Self {
            bars,
            indicators: None,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Close of the most recent bar, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Close of the bar before the most recent one, if any.
    pub fn previous_close(&self) -> Option<f64> {
        self.bars.len().checked_sub(2).map(|i| self.bars[i].close)
    }

    /// Add the SMA, EMA and RSI columns derived from the close series.
    /// Recomputing replaces any previous columns.
    pub fn compute_indicators(&mut self, params: &IndicatorParams) {
        let closes = self.closes();
        self.indicators = Some(IndicatorColumns {
            labels: ColumnLabels::from_params(params),
            sma: calculate_sma(&closes, params.sma_window),
            ema: calculate_ema(&closes, params.ema_span),
            rsi: calculate_rsi(&closes, params.rsi_period, params.rsi_smoothing),
        });
    }

    #[cfg(test)]
    pub fn has_indicators(&self) -> bool {
        self.indicators.is_some()
    }

    pub fn labels(&self) -> Option<&ColumnLabels> {
        self.indicators.as_ref().map(|ind| &ind.labels)
    }

    pub fn sma(&self) -> &[Option<f64>] {
        self.indicators.as_ref().map_or(&[], |ind| ind.sma.as_slice())
    }

    pub fn ema(&self) -> &[f64] {
        self.indicators.as_ref().map_or(&[], |ind| ind.ema.as_slice())
    }

    pub fn rsi(&self) -> &[Option<f64>] {
        self.indicators.as_ref().map_or(&[], |ind| ind.rsi.as_slice())
    }

    /// Full row `i`, or `None` when out of range.
    pub fn row(&self, i: usize) -> Option<TableRow> {
        let bar = self.bars.get(i)?;
        Some(TableRow {
            datetime: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            sma: self.sma().get(i).copied().flatten(),
            ema: self.ema().get(i).copied(),
            rsi: self.rsi().get(i).copied().flatten(),
        })
    }

    /// The most recent `count` rows (oldest-first order).
    pub fn tail(&self, count: usize) -> Vec<TableRow> {
        let start = self.bars.len().saturating_sub(count);
        (start..self.bars.len()).filter_map(|i| self.row(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// Daily bars starting 2024-01-02 with the given closes.
    pub(crate) fn daily_bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start + Duration::days(i as i64),
                    c - 0.5,
                    c + 1.0,
                    c - 1.0,
                    c,
                    Some(1_000 + i as u64),
                )
            })
            .collect()
    }

    #[test]
    fn rejects_unordered_bars() {
        let mut bars = daily_bars(&[1.0, 2.0, 3.0]);
        bars.swap(0, 2);
        assert!(PriceTable::new(bars).is_err());
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let mut bars = daily_bars(&[1.0, 2.0]);
        bars[1].timestamp = bars[0].timestamp;
        assert!(PriceTable::new(bars).is_err());
    }

    #[test]
    fn rejects_non_finite_close() {
        assert!(PriceTable::new(daily_bars(&[1.0, f64::NAN])).is_err());
    }

    #[test]
    fn empty_table_is_allowed() {
        let table = PriceTable::new(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.last_close(), None);
        assert!(table.tail(20).is_empty());
    }

    #[test]
    fn last_and_previous_close() {
        let table = PriceTable::new(daily_bars(&[100.0, 110.0])).unwrap();
        assert_eq!(table.last_close(), Some(110.0));
        assert_eq!(table.previous_close(), Some(100.0));

        let single = PriceTable::new(daily_bars(&[5.0])).unwrap();
        assert_eq!(single.previous_close(), None);
    }

    #[test]
    fn compute_indicators_adds_aligned_columns() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let mut table = PriceTable::new(daily_bars(&closes)).unwrap();
        assert!(!table.has_indicators());
        assert!(table.row(0).unwrap().ema.is_none());

        table.compute_indicators(&IndicatorParams::default());
        assert!(table.has_indicators());
        assert_eq!(table.sma().len(), 30);
        assert_eq!(table.ema().len(), 30);
        assert_eq!(table.rsi().len(), 30);

        let labels = table.labels().unwrap();
        assert_eq!(labels.sma, "SMA20");
        assert_eq!(labels.ema, "EMA20");
        assert_eq!(labels.rsi, "RSI14");

        let first = table.row(0).unwrap();
        assert_eq!(first.ema, Some(100.0));
        assert!(first.sma.is_none());
        assert!(first.rsi.is_none());

        let row19 = table.row(19).unwrap();
        assert!((row19.sma.unwrap() - 109.5).abs() < 1e-9);
    }

    #[test]
    fn tail_returns_last_rows_oldest_first() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64 + 1.0).collect();
        let mut table = PriceTable::new(daily_bars(&closes)).unwrap();
        table.compute_indicators(&IndicatorParams::default());
        let tail = table.tail(20);
        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0].close, 11.0);
        assert_eq!(tail[19].close, 30.0);
        assert_eq!(table.tail(100).len(), 30);
    }

    #[test]
    fn headers_follow_labels() {
        let labels = ColumnLabels::from_params(&IndicatorParams::default());
        assert_eq!(
            labels.headers(),
            vec!["Datetime", "Open", "High", "Low", "Close", "Volume", "SMA20", "EMA20", "RSI14"]
        );
    }
}
