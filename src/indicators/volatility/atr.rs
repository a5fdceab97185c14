//! ATR (Average True Range), Wilder smoothing.

use crate::indicators::math;
use crate::models::bar::OhlcBar;

/// Wilder-smoothed ATR series. `result[i]` corresponds to
/// `bars[period + i]`.
pub fn atr_series(bars: &[OhlcBar], period: u32) -> Option<Vec<f64>> {
    let period = period as usize;
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let trs: Vec<f64> = bars
        .windows(2)
        .map(|w| math::true_range(w[1].high, w[1].low, w[0].close))
        .collect();

    math::wilder_series(&trs, period)
}

/// ATR at the most recent closed bar.
pub fn calculate_atr(bars: &[OhlcBar], period: u32) -> Option<f64> {
    atr_series(bars, period)?.last().copied()
}
