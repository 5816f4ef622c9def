// =============================================================================
// Shared types used across the stock dashboard
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Historical window requested from the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl Span {
    /// Selector order shown in the sidebar.
    pub const ALL: [Span; 6] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
    ];

    /// Query-string code understood by the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::ThreeMonths
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Span {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|span| span.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("unsupported span '{s}'"))
    }
}

/// Sampling interval of the requested bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 5] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::OneHour,
        Self::OneDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::OneDay
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("unsupported interval '{s}'"))
    }
}

/// The complete set of user inputs for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardQuery {
    /// Ticker symbol, trimmed and upper-cased. Not validated further.
    pub symbol: String,
    pub span: Span,
    pub interval: Interval,
    /// Whether the raw-table preview is requested.
    pub show_raw: bool,
}

impl DashboardQuery {
    pub fn new(symbol: &str, span: Span, interval: Interval, show_raw: bool) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            span,
            interval,
            show_raw,
        }
    }
}

/// Trim and upper-case a symbol the way the page title displays it.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_parses_every_selector_value() {
        for span in Span::ALL {
            assert_eq!(span.as_str().parse::<Span>().unwrap(), span);
        }
        assert!("2y".parse::<Span>().is_err());
        assert_eq!(Span::default(), Span::ThreeMonths);
    }

    #[test]
    fn interval_parses_every_selector_value() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert!("30m".parse::<Interval>().is_err());
        assert_eq!(Interval::default(), Interval::OneDay);
    }

    #[test]
    fn serde_uses_provider_codes() {
        assert_eq!(serde_json::to_string(&Span::SixMonths).unwrap(), "\"6mo\"");
        let interval: Interval = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(interval, Interval::FifteenMinutes);
    }

    #[test]
    fn query_normalizes_symbol() {
        let q = DashboardQuery::new("  msft ", Span::OneYear, Interval::OneHour, false);
        assert_eq!(q.symbol, "MSFT");
    }
}
