//! Trend-following stop-and-reverse indicator.
//!
//! Baseline EMA(length) with a band of multiplier x ATR(atr_length). The
//! trailing stop ratchets toward price only; a close across the stop flips
//! the trend and resets the stop on the new side.

use crate::indicators::trend::ema::ema_close_series;
use crate::indicators::volatility::atr::atr_series;
use crate::models::bar::OhlcBar;
use crate::models::indicator::TrendDirection;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendStopState {
    pub stop: f64,
    pub direction: TrendDirection,
}

/// Trailing-stop series. `result[i]` corresponds to
/// `bars[start + i]` where `start = max(length - 1, atr_length)`.
pub fn trend_stop_series(
    bars: &[OhlcBar],
    length: u32,
    atr_length: u32,
    multiplier: f64,
) -> Option<Vec<TrendStopState>> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let baseline = ema_close_series(&closes, length)?;
    let atr = atr_series(bars, atr_length)?;

    let ema_start = length as usize - 1;
    let atr_start = atr_length as usize;
    let start = ema_start.max(atr_start);
    if start >= bars.len() {
        return None;
    }

    let band_at = |i: usize| multiplier * atr[i - atr_start];
    let base_at = |i: usize| baseline[i - ema_start];

    let mut out = Vec::with_capacity(bars.len() - start);
    let mut direction = if closes[start] >= base_at(start) {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };
    let mut stop = match direction {
        TrendDirection::Up => base_at(start) - band_at(start),
        TrendDirection::Down => base_at(start) + band_at(start),
    };
    out.push(TrendStopState { stop, direction });

    for i in start + 1..bars.len() {
        let base = base_at(i);
        let band = band_at(i);
        match direction {
            TrendDirection::Up => {
                // Tighten only, never loosen against the trend.
                stop = stop.max(base - band);
                if closes[i] < stop {
                    direction = TrendDirection::Down;
                    stop = base + band;
                }
            }
            TrendDirection::Down => {
                stop = stop.min(base + band);
                if closes[i] > stop {
                    direction = TrendDirection::Up;
                    stop = base - band;
                }
            }
        }
        out.push(TrendStopState { stop, direction });
    }

    Some(out)
}

/// Stop state at the most recent closed bar.
pub fn calculate_trend_stop(
    bars: &[OhlcBar],
    length: u32,
    atr_length: u32,
    multiplier: f64,
) -> Option<TrendStopState> {
    trend_stop_series(bars, length, atr_length, multiplier)?.last().copied()
}
