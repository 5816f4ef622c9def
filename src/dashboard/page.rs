// =============================================================================
// HTML page: sidebar controls, title, charts, metric, raw table
// =============================================================================
//
// Server-side rendered single page. Controls live in a GET form that
// re-submits on every change, so each interaction is one fresh render.
// Charts are drawn client-side by Plotly.js from the figure JSON embedded in
// the page.
// =============================================================================

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::dashboard::metric::HeadlineMetric;
use crate::dashboard::render::{page_title, DashboardView, RawTable, RenderOutcome};
use crate::market_data::TableRow;
use crate::types::{DashboardQuery, Interval, Span};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// What goes into the main area below the title.
pub enum PageContent<'a> {
    Outcome(&'a RenderOutcome),
    /// The request itself was unusable (e.g. a span outside the selector).
    InputError(&'a str),
}

/// Render the full HTML document for `form` (the values the controls show).
pub fn render_page(form: &DashboardQuery, content: PageContent<'_>) -> Result<String> {
    let title = page_title(&form.symbol);

    let main = match content {
        PageContent::Outcome(RenderOutcome::Rendered(view)) => render_view(view)?,
        PageContent::Outcome(outcome) => error_banner(outcome.message().unwrap_or_default()),
        PageContent::InputError(message) => error_banner(message),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
<style>
body {{ margin: 0; font-family: sans-serif; display: flex; min-height: 100vh; }}
aside {{ width: 260px; padding: 1.5rem; background: #f0f2f6; box-sizing: border-box; }}
aside label {{ display: block; margin-top: 1rem; font-size: 0.9rem; }}
aside input[type=text], aside select {{ width: 100%; padding: 0.4rem; margin-top: 0.3rem; box-sizing: border-box; }}
main {{ flex: 1; padding: 1.5rem 2.5rem; min-width: 0; }}
.error {{ background: #ffe4e4; color: #7d1a1a; padding: 1rem; border-radius: 0.4rem; }}
.metric .label {{ font-size: 0.9rem; color: #555; }}
.metric .value {{ font-size: 2rem; }}
.metric .delta.up {{ color: #09ab3b; }}
.metric .delta.down {{ color: #d33; }}
table {{ border-collapse: collapse; font-size: 0.85rem; }}
th, td {{ border: 1px solid #ddd; padding: 0.25rem 0.5rem; text-align: right; }}
</style>
</head>
<body>
{sidebar}
<main>
<h1>{title}</h1>
{main}
</main>
</body>
</html>
"#,
        title = escape_html(&title),
        sidebar = render_sidebar(form),
    ))
}

fn render_sidebar(form: &DashboardQuery) -> String {
    let span_options = options(Span::ALL.iter().map(|s| s.as_str()), form.span.as_str());
    let interval_options = options(
        Interval::ALL.iter().map(|i| i.as_str()),
        form.interval.as_str(),
    );
    let checked = if form.show_raw { " checked" } else { "" };

    format!(
        r#"<aside>
<h2>Stock Market Dashboard</h2>
<form method="get" action="/">
<label>Stock Symbol<input type="text" name="symbol" value="{symbol}" onchange="this.form.submit()"></label>
<label>Period<select name="span" onchange="this.form.submit()">{span_options}</select></label>
<label>Interval<select name="interval" onchange="this.form.submit()">{interval_options}</select></label>
<label><input type="checkbox" name="raw" value="on"{checked} onchange="this.form.submit()"> Show Raw Data</label>
</form>
</aside>"#,
        symbol = escape_html(&form.symbol),
    )
}

fn options<'a>(values: impl Iterator<Item = &'a str>, selected: &str) -> String {
    values.fold(String::new(), |mut out, v| {
        let sel = if v == selected { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{v}"{sel}>{v}</option>"#);
        out
    })
}

fn render_view(view: &DashboardView) -> Result<String> {
    let mut out = String::new();

    if let Some(raw) = &view.raw {
        out.push_str(&render_raw_table(raw));
    }

    out.push_str(&plot_block("price-chart", &view.price_chart)?);
    let _ = write!(out, "<h3>{}</h3>", escape_html(&view.rsi_heading));
    out.push_str(&plot_block("rsi-chart", &view.rsi_chart)?);
    out.push_str(&render_metric(&view.metric));

    Ok(out)
}

fn plot_block<T: Serialize>(id: &str, figure: &T) -> Result<String> {
    let json = serde_json::to_string(figure).context("failed to serialise chart figure")?;
    Ok(format!(
        r#"<div id="{id}"></div>
<script>(function () {{ var fig = {json}; Plotly.newPlot("{id}", fig.data, fig.layout, {{responsive: true}}); }})();</script>
"#,
        json = escape_script(&json),
    ))
}

fn render_metric(metric: &HeadlineMetric) -> String {
    let direction = if metric.pct_change < 0.0 { "down" } else { "up" };
    format!(
        r#"<div class="metric">
<div class="label">{label}</div>
<div class="value">{value}</div>
<div class="delta {direction}">{delta}</div>
</div>
"#,
        label = escape_html(&metric.label),
        value = escape_html(&metric.value_text),
        delta = escape_html(&metric.delta_text),
    )
}

fn render_raw_table(raw: &RawTable) -> String {
    let mut out = String::from("<table>\n<thead><tr>");
    for column in &raw.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in &raw.rows {
        out.push_str(&render_raw_row(row));
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn render_raw_row(row: &TableRow) -> String {
    let cell = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_default();
    format!(
        "<tr><td>{}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        row.datetime.format("%Y-%m-%d %H:%M:%S"),
        row.open,
        row.high,
        row.low,
        row.close,
        row.volume.map(|v| v.to_string()).unwrap_or_default(),
        cell(row.sma),
        cell(row.ema),
        cell(row.rsi),
    )
}

fn error_banner(message: &str) -> String {
    format!("<div class=\"error\">{}</div>\n", escape_html(message))
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON inside a `<script>` block must not contain `<` at all: `</script>`
/// ends the block and `<!--` switches the parser into an escaped state.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::render::{render_dashboard, tests::three_months_of_closes};
    use crate::market_data::table::tests::daily_bars;
    use crate::provider::stub::StubProvider;
    use crate::runtime_config::DashboardConfig;

    fn form(symbol: &str, show_raw: bool) -> DashboardQuery {
        DashboardQuery::new(symbol, Span::ThreeMonths, Interval::OneDay, show_raw)
    }

    #[tokio::test]
    async fn rendered_page_has_charts_metric_and_controls() {
        let provider = StubProvider::with_bars(daily_bars(&three_months_of_closes()));
        let query = form("AAPL", false);
        let outcome = render_dashboard(&provider, &query, &DashboardConfig::default()).await;

        let html = render_page(&query, PageContent::Outcome(&outcome)).unwrap();
        assert!(html.contains("<h1>Real-Time Stock Dashboard: AAPL</h1>"));
        assert!(html.contains(r#"Plotly.newPlot("price-chart""#));
        assert!(html.contains(r#"Plotly.newPlot("rsi-chart""#));
        assert!(html.contains("<h3>RSI (14)</h3>"));
        assert!(html.contains("Last Close Price (USD)"));
        assert!(html.contains(r#"<option value="3mo" selected>3mo</option>"#));
        assert!(html.contains(r#"<option value="1d" selected>1d</option>"#));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn raw_toggle_renders_table() {
        let provider = StubProvider::with_bars(daily_bars(&three_months_of_closes()));
        let query = form("AAPL", true);
        let outcome = render_dashboard(&provider, &query, &DashboardConfig::default()).await;

        let html = render_page(&query, PageContent::Outcome(&outcome)).unwrap();
        assert!(html.contains("<th>SMA20</th>"));
        assert_eq!(html.matches("<tr><td>").count(), 20);
        assert!(html.contains(r#"name="raw" value="on" checked"#));
    }

    #[tokio::test]
    async fn no_data_page_shows_only_the_message() {
        let provider = StubProvider::empty();
        let query = form("ZZZZZZ", false);
        let outcome = render_dashboard(&provider, &query, &DashboardConfig::default()).await;

        let html = render_page(&query, PageContent::Outcome(&outcome)).unwrap();
        assert!(html.contains("No data found for symbol. Please check the input and try again."));
        assert!(!html.contains("Plotly.newPlot"));
        assert!(!html.contains("class=\"metric\""));
    }

    #[test]
    fn input_error_is_escaped() {
        let html = render_page(&form("<b>", false), PageContent::InputError("unsupported span '<x>'"))
            .unwrap();
        assert!(html.contains("unsupported span &#39;&lt;x&gt;&#39;"));
        assert!(html.contains(r#"value="&lt;B&gt;""#));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn script_json_cannot_close_the_tag() {
        assert_eq!(
            escape_script(r#"{"name":"</script>"}"#),
            r#"{"name":"\u003c/script>"}"#
        );
        assert_eq!(escape_script(r#"{"t":"<!--"}"#), r#"{"t":"\u003c!--"}"#);
    }

    #[tokio::test]
    async fn markup_in_symbol_never_reaches_the_page_raw() {
        let provider = StubProvider::with_bars(daily_bars(&three_months_of_closes()));
        let query = form("<!--<script>", false);
        let outcome = render_dashboard(&provider, &query, &DashboardConfig::default()).await;

        let html = render_page(&query, PageContent::Outcome(&outcome)).unwrap();
        assert!(html.contains("Plotly.newPlot"));
        assert!(!html.contains("<!--"));
        assert!(!html.contains("<SCRIPT>"));
        assert!(html.contains(r#"\u003c!--\u003cSCRIPT>"#));
    }
}
