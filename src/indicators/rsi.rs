// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes and split
//          them into gains (max(delta, 0)) and losses (max(-delta, 0)).
// Step 2: Average the gains and losses. Three variants:
//          Exponential (default): exponential averages with alpha = 1/period,
//            started at zero on the first row (which has no delta):
//              avg = (1 - alpha) * prev_avg + alpha * current
//            Same numbers as the `ta` package's `rsi(close, window)`.
//          Wilder: seed with the SMA of the first `period` gains / losses,
//            then avg = (prev_avg * (period - 1) + current) / period.
//          Simple (Cutler's): plain mean of the trailing `period` gains /
//            losses at every row.
// Step 3: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS),  RSI = 100 when avg_loss == 0
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Upper guide line on the oscillator chart.
pub const OVERBOUGHT: f64 = 70.0;
/// Lower guide line on the oscillator chart.
pub const OVERSOLD: f64 = 30.0;

/// How average gains and losses are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSmoothing {
    #[default]
    Exponential,
    Wilder,
    Simple,
}

/// Compute the RSI series for `closes`, aligned to the input.
///
/// Row `i` is populated once `i` deltas are available and `i >= period`, so
/// rows `0..period` are `None`.
///
/// # Edge cases
/// - `period == 0` => every row is `None`
/// - `closes.len() <= period` => every row is `None`
/// - A non-finite intermediate result ends the series (remaining rows `None`).
pub fn calculate_rsi(closes: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    // --- Split deltas into gains and losses ----------------------------------
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let period_f = period as f64;

    match smoothing {
        RsiSmoothing::Exponential => {
            let alpha = 1.0 / period_f;
            // Row 0 enters both averages as a zero.
            let mut avg_gain = 0.0;
            let mut avg_loss = 0.0;

            for (k, (&gain, &loss)) in gains.iter().zip(&losses).enumerate() {
                avg_gain = (1.0 - alpha) * avg_gain + alpha * gain;
                avg_loss = (1.0 - alpha) * avg_loss + alpha * loss;
                if k + 1 < period {
                    continue;
                }
                match rsi_from_averages(avg_gain, avg_loss) {
                    Some(rsi) => result[k + 1] = Some(rsi),
                    None => break,
                }
            }
        }
        RsiSmoothing::Wilder => {
            // Seed with the SMA of the first `period` gains / losses.
            let mut avg_gain = gains[..period].iter().sum::<f64>() / period_f;
            let mut avg_loss = losses[..period].iter().sum::<f64>() / period_f;

            // Delta `k` ends at close `k + 1`.
            for k in (period - 1)..gains.len() {
                if k >= period {
                    avg_gain = (avg_gain * (period_f - 1.0) + gains[k]) / period_f;
                    avg_loss = (avg_loss * (period_f - 1.0) + losses[k]) / period_f;
                }
                match rsi_from_averages(avg_gain, avg_loss) {
                    Some(rsi) => result[k + 1] = Some(rsi),
                    None => break, // Non-finite: stop producing values.
                }
            }
        }
        RsiSmoothing::Simple => {
            for (offset, (g, l)) in gains.windows(period).zip(losses.windows(period)).enumerate() {
                let avg_gain = g.iter().sum::<f64>() / period_f;
                let avg_loss = l.iter().sum::<f64>() / period_f;
                match rsi_from_averages(avg_gain, avg_loss) {
                    Some(rsi) => result[offset + period] = Some(rsi),
                    None => break,
                }
            }
        }
    }

    result
}

/// Human-readable zone for an RSI reading.
pub fn rsi_zone(value: f64) -> &'static str {
    if value >= OVERBOUGHT {
        "OVERBOUGHT"
    } else if value <= OVERSOLD {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If average loss is zero, RSI is 100.0 (this includes a flat market).
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn wilder(closes: &[f64]) -> Vec<Option<f64>> {
        calculate_rsi(closes, 14, RsiSmoothing::Wilder)
    }

    // ---- calculate_rsi ---------------------------------------------------

    #[test]
    fn rsi_empty_input() {
        assert!(wilder(&[]).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0], 0, RsiSmoothing::Wilder), vec![None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(wilder(&closes).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_null_prefix_is_fourteen_rows() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).cos()).collect();
        for smoothing in [RsiSmoothing::Exponential, RsiSmoothing::Wilder, RsiSmoothing::Simple] {
            let series = calculate_rsi(&closes, 14, smoothing);
            assert_eq!(series.len(), 40);
            assert!(series[..14].iter().all(Option::is_none));
            assert!(series[14..].iter().all(Option::is_some));
        }
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in wilder(&closes).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_non_decreasing_with_a_rise_is_100() {
        let mut closes = vec![10.0; 20];
        closes[17] = 10.5;
        closes[18] = 10.5;
        closes[19] = 10.5;
        assert_eq!(wilder(&closes)[19], Some(100.0));
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in wilder(&closes).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_has_no_losses() {
        let closes = vec![100.0; 30];
        for v in wilder(&closes).into_iter().flatten() {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13, 44.91, 42.02,
        ];
        for smoothing in [RsiSmoothing::Exponential, RsiSmoothing::Wilder, RsiSmoothing::Simple] {
            for v in calculate_rsi(&closes, 14, smoothing).into_iter().flatten() {
                assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
            }
        }
    }

    const REFERENCE_CLOSES: [f64; 20] = [
        44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
        45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13, 44.91, 42.02,
    ];

    #[test]
    fn rsi_exponential_matches_ta_reference() {
        // Values produced by `ta.momentum.rsi(close, window=14)`.
        let series = calculate_rsi(&REFERENCE_CLOSES, 14, RsiSmoothing::Exponential);
        assert!(series[..14].iter().all(Option::is_none));
        for (row, expected) in [
            (14, 47.82740612110593),
            (15, 36.453130959949384),
            (16, 31.17631322297329),
            (18, 53.79739028785579),
            (19, 36.80884151801876),
        ] {
            let got = series[row].unwrap();
            assert!((got - expected).abs() < 1e-9, "row {row}: got {got}, expected {expected}");
        }
    }

    #[test]
    fn rsi_exponential_differs_from_wilder_early_on() {
        let exponential = calculate_rsi(&REFERENCE_CLOSES, 14, RsiSmoothing::Exponential);
        let smoothed = wilder(&REFERENCE_CLOSES);
        assert!((exponential[14].unwrap() - smoothed[14].unwrap()).abs() > 1.0);
    }

    #[test]
    fn rsi_exponential_all_gains_is_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14, RsiSmoothing::Exponential);
        assert!(series[14..].iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn rsi_wilder_smoothing_known_value() {
        // 15 closes: 14 deltas seed the averages, one more delta is smoothed.
        let mut closes: Vec<f64> = vec![10.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let last = *closes.last().unwrap();
        closes.push(last - 3.0);

        // 7 gains of 2.0, 7 losses of 1.0 in the seed window.
        let seed_gain = 14.0 / 14.0;
        let seed_loss = 7.0 / 14.0;
        let first = 100.0 - 100.0 / (1.0 + seed_gain / seed_loss);
        let gain = (seed_gain * 13.0) / 14.0;
        let loss = (seed_loss * 13.0 + 3.0) / 14.0;
        let second = 100.0 - 100.0 / (1.0 + gain / loss);

        let series = wilder(&closes);
        assert!((series[14].unwrap() - first).abs() < 1e-9);
        assert!((series[15].unwrap() - second).abs() < 1e-9);
    }

    #[test]
    fn rsi_simple_variant_forgets_old_losses() {
        // One early loss followed by 14 rises: the simple window no longer
        // sees the loss, Wilder still remembers it.
        let mut closes = vec![20.0, 10.0];
        closes.extend((1..=14).map(|x| 10.0 + x as f64));
        let simple = calculate_rsi(&closes, 14, RsiSmoothing::Simple);
        let smoothed = wilder(&closes);
        assert_eq!(simple[15], Some(100.0));
        assert!(smoothed[15].unwrap() < 100.0);
    }

    // ---- rsi_zone --------------------------------------------------------

    #[test]
    fn zone_labels() {
        assert_eq!(rsi_zone(100.0), "OVERBOUGHT");
        assert_eq!(rsi_zone(0.0), "OVERSOLD");
        assert_eq!(rsi_zone(50.0), "NEUTRAL");
    }

    #[test]
    fn smoothing_deserialises_lowercase() {
        let s: RsiSmoothing = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(s, RsiSmoothing::Simple);
        assert_eq!(RsiSmoothing::default(), RsiSmoothing::Exponential);
        let w: RsiSmoothing = serde_json::from_str("\"wilder\"").unwrap();
        assert_eq!(w, RsiSmoothing::Wilder);
    }
}
