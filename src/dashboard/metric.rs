// =============================================================================
// Headline metric: last close and change versus the previous bar
// =============================================================================

use serde::Serialize;

use crate::market_data::PriceTable;
use crate::provider::DEFAULT_CURRENCY;

/// The scalar metric shown under the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetric {
    /// e.g. `Last Close Price (USD)`
    pub label: String,
    pub last_close: f64,
    /// Absolute change versus the second-to-last close.
    pub change: f64,
    /// Percentage change versus the second-to-last close.
    pub pct_change: f64,
    /// e.g. `$187.44`
    pub value_text: String,
    /// e.g. `+1.25%`
    pub delta_text: String,
}

impl HeadlineMetric {
    /// Build the metric from the table's last two closes.
    ///
    /// Change is 0 when the table has fewer than two rows, and also when the
    /// previous close is 0 (no meaningful percentage exists). Returns `None`
    /// for an empty table.
    pub fn from_table(table: &PriceTable, currency: &str) -> Option<Self> {
        let last_close = table.last_close()?;
        let (change, pct_change) = match table.previous_close() {
            Some(prev) if prev != 0.0 => {
                let change = last_close - prev;
                (change, change / prev * 100.0)
            }
            Some(prev) => (last_close - prev, 0.0),
            None => (0.0, 0.0),
        };

        Some(Self {
            label: format!("Last Close Price ({currency})"),
            last_close,
            change,
            pct_change,
            value_text: format_price(last_close, currency),
            delta_text: format!("{pct_change:+.2}%"),
        })
    }
}

/// `$123.45` for dollars, `123.45 EUR` for everything else.
pub fn format_price(value: f64, currency: &str) -> String {
    if currency == DEFAULT_CURRENCY {
        format!("${value:.2}")
    } else {
        format!("{value:.2} {currency}")
    }
}
