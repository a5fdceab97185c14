//! MACD (Moving Average Convergence Divergence).

use crate::indicators::math;
use crate::models::bar::OhlcBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line series: EMA(fast) - EMA(slow), aligned so `result[i]`
/// corresponds to `closes[slow - 1 + i]`.
pub fn macd_line_series(closes: &[f64], fast: u32, slow: u32) -> Option<Vec<f64>> {
    if fast >= slow {
        return None;
    }
    let fast_series = math::ema_series(closes, fast as usize)?;
    let slow_series = math::ema_series(closes, slow as usize)?;
    let offset = fast_series.len() - slow_series.len();
    Some(
        slow_series
            .iter()
            .enumerate()
            .map(|(i, &s)| fast_series[offset + i] - s)
            .collect(),
    )
}

/// Histogram series (MACD line minus its signal EMA), aligned so
/// `result[i]` corresponds to `closes[slow + signal - 2 + i]`.
pub fn macd_histogram_series(
    closes: &[f64],
    fast: u32,
    slow: u32,
    signal: u32,
) -> Option<Vec<f64>> {
    let line = macd_line_series(closes, fast, slow)?;
    let signal_series = math::ema_series(&line, signal as usize)?;
    let offset = line.len() - signal_series.len();
    Some(
        signal_series
            .iter()
            .enumerate()
            .map(|(i, &s)| line[offset + i] - s)
            .collect(),
    )
}

/// MACD at the most recent closed bar.
pub fn calculate_macd(bars: &[OhlcBar], fast: u32, slow: u32, signal: u32) -> Option<MacdOutput> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let line = macd_line_series(&closes, fast, slow)?;
    let signal_series = math::ema_series(&line, signal as usize)?;
    let macd = *line.last()?;
    let signal_value = *signal_series.last()?;
    Some(MacdOutput {
        macd,
        signal: signal_value,
        histogram: macd - signal_value,
    })
}
