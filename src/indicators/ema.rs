// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_0      = close_0
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The series is seeded with the very first close (no SMA warm-up), so every
// row carries a value.
// =============================================================================

/// Smoothing factor for a given `span`: `2 / (span + 1)`.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA series for `closes`, one value per close.
///
/// # Edge cases
/// - empty input => empty vec
/// - `span == 0` => multiplier is 2, which is meaningless; returns empty vec
/// - `span == 1` => the series equals the closes
pub fn calculate_ema(closes: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = closes.first() else {
        return Vec::new();
    };
    if span == 0 {
        return Vec::new();
    }

    let multiplier = smoothing_factor(span);

    let mut result = Vec::with_capacity(closes.len());
    result.push(first);

    let mut prev_ema = first;
    for &close in &closes[1..] {
        let ema = close * multiplier + prev_ema * (1.0 - multiplier);
        result.push(ema);
        prev_ema = ema;
    }

    result
}
