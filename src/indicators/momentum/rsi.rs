//! RSI (Relative Strength Index), Wilder smoothing.

use crate::indicators::math;
use crate::models::bar::OhlcBar;

/// Full Wilder RSI series over a close sequence.
///
/// Averages are seeded with the simple mean of the first `period` up/down
/// deltas, then smoothed with `avg = ((period - 1) * prev + delta) / period`.
/// `result[i]` corresponds to `closes[period + i]`. If the average loss is
/// zero the RSI is 100.
pub fn rsi_series(closes: &[f64], period: u32) -> Option<Vec<f64>> {
    let period = period as usize;
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);
    for w in closes.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = math::wilder_series(&gains, period)?;
    let avg_losses = math::wilder_series(&losses, period)?;

    let series = avg_gains
        .iter()
        .zip(avg_losses.iter())
        .map(|(&g, &l)| {
            if l == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect();
    Some(series)
}

/// RSI at the most recent closed bar.
pub fn calculate_rsi(bars: &[OhlcBar], period: u32) -> Option<f64> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    rsi_series(&closes, period)?.last().copied()
}
