// =============================================================================
// Chart figures: Plotly-compatible JSON built with serde
// =============================================================================
//
// The browser draws the charts with Plotly.js; the server only assembles the
// `{ data, layout }` figure objects. Field names follow Plotly's schema, so
// these structs serialise straight into `Plotly.newPlot(div, data, layout)`.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indicators::rsi::{OVERBOUGHT, OVERSOLD};
use crate::market_data::PriceTable;

const SMA_COLOR: &str = "blue";
const EMA_COLOR: &str = "orange";
const GUIDE_COLOR: &str = "gray";

/// A complete Plotly figure.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Candlestick(CandlestickTrace),
    Scatter(ScatterTrace),
}

#[derive(Debug, Clone, Serialize)]
pub struct CandlestickTrace {
    pub name: String,
    pub x: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterTrace {
    pub name: String,
    pub mode: &'static str,
    pub x: Vec<String>,
    /// `null` entries leave a gap in the line.
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    fn new(text: impl Into<String>) -> Option<Self> {
        Some(Self { text: text.into() })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
}

/// Horizontal reference line spanning the full plot width.
#[derive(Debug, Clone, Serialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub xref: &'static str,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub line: Line,
}

impl Shape {
    fn hline(y: f64) -> Self {
        Self {
            kind: "line",
            xref: "paper",
            x0: 0.0,
            x1: 1.0,
            y0: y,
            y1: y,
            line: Line {
                color: Some(GUIDE_COLOR),
                dash: Some("dash"),
                width: Some(1.0),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
}

// =============================================================================
// Builders
// =============================================================================

/// Plotly parses `YYYY-MM-DD HH:MM:SS` as a date without timezone shifts.
pub fn plotly_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Candlestick chart with the SMA and EMA overlays, no range slider.
///
/// Expects `table` to carry indicator columns; overlays are empty otherwise.
pub fn price_chart(table: &PriceTable, symbol: &str, currency: &str) -> Figure {
    let x: Vec<String> = table.bars().iter().map(|b| plotly_timestamp(&b.timestamp)).collect();
    let (sma_label, ema_label) = table
        .labels()
        .map(|l| (overlay_name(&l.sma), overlay_name(&l.ema)))
        .unwrap_or_default();

    let candles = Trace::Candlestick(CandlestickTrace {
        name: "Candlestick".to_string(),
        x: x.clone(),
        open: table.bars().iter().map(|b| b.open).collect(),
        high: table.bars().iter().map(|b| b.high).collect(),
        low: table.bars().iter().map(|b| b.low).collect(),
        close: table.bars().iter().map(|b| b.close).collect(),
    });

    let sma = Trace::Scatter(ScatterTrace {
        name: sma_label,
        mode: "lines",
        x: x.clone(),
        y: table.sma().to_vec(),
        line: Some(Line {
            color: Some(SMA_COLOR),
            ..Line::default()
        }),
    });

    let ema = Trace::Scatter(ScatterTrace {
        name: ema_label,
        mode: "lines",
        x,
        y: table.ema().iter().copied().map(Some).collect(),
        line: Some(Line {
            color: Some(EMA_COLOR),
            ..Line::default()
        }),
    });

    Figure {
        data: vec![candles, sma, ema],
        layout: Layout {
            title: Title::new(format!("{symbol} Price Chart with SMA and EMA")),
            xaxis: Axis {
                title: Title::new("Date"),
                rangeslider: Some(RangeSlider { visible: false }),
                ..Axis::default()
            },
            yaxis: Axis {
                title: Title::new(format!("Price {currency}")),
                ..Axis::default()
            },
            shapes: Vec::new(),
        },
    }
}

/// RSI oscillator line on a fixed [0, 100] axis with 30/70 guides.
pub fn rsi_chart(table: &PriceTable) -> Figure {
    let name = table
        .labels()
        .map(|l| l.rsi.clone())
        .unwrap_or_default();

    let line = Trace::Scatter(ScatterTrace {
        name,
        mode: "lines",
        x: table.bars().iter().map(|b| plotly_timestamp(&b.timestamp)).collect(),
        y: table.rsi().to_vec(),
        line: None,
    });

    Figure {
        data: vec![line],
        layout: Layout {
            title: None,
            xaxis: Axis::default(),
            yaxis: Axis {
                range: Some([0.0, 100.0]),
                ..Axis::default()
            },
            shapes: vec![Shape::hline(OVERSOLD), Shape::hline(OVERBOUGHT)],
        },
    }
}

/// `SMA20` -> `SMA 20`, the legend style of the overlays.
fn overlay_name(label: &str) -> String {
    match label.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => format!("{} {}", &label[..idx], &label[idx..]),
        None => label.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::table::tests::daily_bars;
    use crate::runtime_config::IndicatorParams;

    fn table(n: usize) -> PriceTable {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let mut t = PriceTable::new(daily_bars(&closes)).unwrap();
        t.compute_indicators(&IndicatorParams::default());
        t
    }

    #[test]
    fn price_chart_has_candles_and_two_overlays() {
        let fig = price_chart(&table(25), "AAPL", "USD");
        let json = serde_json::to_value(&fig).unwrap();

        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["type"], "candlestick");
        assert_eq!(data[0]["close"].as_array().unwrap().len(), 25);
        assert_eq!(data[1]["name"], "SMA 20");
        assert_eq!(data[1]["line"]["color"], "blue");
        assert!(data[1]["y"][0].is_null());
        assert!(data[1]["y"][19].is_number());
        assert_eq!(data[2]["name"], "EMA 20");
        assert_eq!(data[2]["line"]["color"], "orange");
        assert_eq!(data[2]["y"][0], 100.0);

        assert_eq!(json["layout"]["title"]["text"], "AAPL Price Chart with SMA and EMA");
        assert_eq!(json["layout"]["xaxis"]["title"]["text"], "Date");
        assert_eq!(json["layout"]["yaxis"]["title"]["text"], "Price USD");
        assert_eq!(json["layout"]["xaxis"]["rangeslider"]["visible"], false);
    }

    #[test]
    fn rsi_chart_fixed_range_and_guides() {
        let fig = rsi_chart(&table(30));
        let json = serde_json::to_value(&fig).unwrap();
        assert_eq!(json["data"][0]["name"], "RSI14");
        assert_eq!(json["data"][0]["mode"], "lines");
        assert!(json["data"][0]["y"][13].is_null());
        assert_eq!(json["data"][0]["y"][14], 100.0);
        assert_eq!(json["layout"]["yaxis"]["range"], serde_json::json!([0.0, 100.0]));
        let shapes = json["layout"]["shapes"].as_array().unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0]["y0"], 30.0);
        assert_eq!(shapes[1]["y0"], 70.0);
    }

    #[test]
    fn timestamps_use_plotly_date_format() {
        let bars = daily_bars(&[1.0]);
        assert_eq!(plotly_timestamp(&bars[0].timestamp), "2024-01-02 14:30:00");
    }

    #[test]
    fn overlay_names_split_window() {
        assert_eq!(overlay_name("SMA20"), "SMA 20");
        assert_eq!(overlay_name("EMA5"), "EMA 5");
        assert_eq!(overlay_name("X"), "X");
    }
}
