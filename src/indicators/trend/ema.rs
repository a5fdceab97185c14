//! EMA (Exponential Moving Average) and fast/slow cross helpers.

use crate::indicators::math;
use crate::models::bar::OhlcBar;

/// EMA series over closes, seeded with the simple mean of the first
/// `period` closes. `result[i]` corresponds to `closes[period - 1 + i]`.
pub fn ema_close_series(closes: &[f64], period: u32) -> Option<Vec<f64>> {
    math::ema_series(closes, period as usize)
}

/// EMA at the most recent closed bar.
pub fn calculate_ema(bars: &[OhlcBar], period: u32) -> Option<f64> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    ema_close_series(&closes, period)?.last().copied()
}

/// Sign of the fast-vs-slow EMA relation per bar: +1 fast above, -1 fast
/// below, 0 equal. `result[i]` corresponds to `closes[slow - 1 + i]`.
pub fn ema_cross_series(closes: &[f64], fast: u32, slow: u32) -> Option<Vec<i8>> {
    if fast >= slow {
        return None;
    }
    let fast_series = ema_close_series(closes, fast)?;
    let slow_series = ema_close_series(closes, slow)?;
    let offset = fast_series.len() - slow_series.len();

    let signs = slow_series
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let f = fast_series[offset + i];
            if f > s {
                1
            } else if f < s {
                -1
            } else {
                0
            }
        })
        .collect();
    Some(signs)
}

/// Slope of the fast EMA over its last two samples, for cross confirmation.
pub fn fast_ema_slope(closes: &[f64], fast: u32) -> Option<f64> {
    let series = ema_close_series(closes, fast)?;
    if series.len() < 2 {
        return None;
    }
    Some(series[series.len() - 1] - series[series.len() - 2])
}
