// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted mean of the trailing `window` closes:
//
//   SMA_t = (close_{t-window+1} + ... + close_t) / window
//
// The first `window - 1` rows have no value.
// =============================================================================

/// Compute the SMA series for `closes`, aligned to the input.
///
/// # Edge cases
/// - `window == 0` => every row is `None`
/// - `closes.len() < window` => every row is `None`
/// - A window containing a non-finite close yields `None` for that row only.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    let window_f = window as f64;
    for (offset, slice) in closes.windows(window).enumerate() {
        let mean = slice.iter().sum::<f64>() / window_f;
        if mean.is_finite() {
            result[offset + window - 1] = Some(mean);
        }
    }

    result
}
