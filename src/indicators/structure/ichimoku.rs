//! Ichimoku-style cross/cloud indicator.
//!
//! Reported span values are the ones applicable at the current bar, i.e.
//! computed from bars `displacement` back, so cloud comparisons against the
//! current close need no further shifting. The lagging value is the close
//! from `displacement` bars ago.

use crate::indicators::math;
use crate::models::bar::OhlcBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IchimokuOutput {
    pub conversion: f64,
    pub base: f64,
    pub span_a: f64,
    pub span_b: f64,
    pub lagging: Option<f64>,
}

/// Position of a close relative to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudPosition {
    Above,
    Inside,
    Below,
}

impl CloudPosition {
    pub fn sign(&self) -> i8 {
        match self {
            CloudPosition::Above => 1,
            CloudPosition::Inside => 0,
            CloudPosition::Below => -1,
        }
    }
}

fn spans_at(
    highs: &[f64],
    lows: &[f64],
    upto: usize,
    conversion: u32,
    base: u32,
    span_b: u32,
) -> Option<(f64, f64)> {
    let h = &highs[..upto];
    let l = &lows[..upto];
    let conv = math::hl_midpoint(h, l, conversion as usize)?;
    let base_line = math::hl_midpoint(h, l, base as usize)?;
    let a = (conv + base_line) / 2.0;
    let b = math::hl_midpoint(h, l, span_b as usize)?;
    Some((a, b))
}

/// Ichimoku values at the most recent closed bar.
pub fn calculate_ichimoku(
    bars: &[OhlcBar],
    conversion: u32,
    base: u32,
    span_b: u32,
    displacement: u32,
) -> Option<IchimokuOutput> {
    let longest = conversion.max(base).max(span_b) as usize;
    let displacement = displacement as usize;
    if bars.len() < longest + displacement {
        return None;
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let conv = math::hl_midpoint(&highs, &lows, conversion as usize)?;
    let base_line = math::hl_midpoint(&highs, &lows, base as usize)?;
    let (span_a, span_b_val) = spans_at(
        &highs,
        &lows,
        bars.len() - displacement,
        conversion,
        base,
        span_b,
    )?;
    let lagging = bars
        .len()
        .checked_sub(1 + displacement)
        .map(|i| bars[i].close);

    Some(IchimokuOutput {
        conversion: conv,
        base: base_line,
        span_a,
        span_b: span_b_val,
        lagging,
    })
}

/// Cloud position of the close for each of the last `count` bars.
/// `result[count - 1]` is the most recent bar.
pub fn cloud_position_series(
    bars: &[OhlcBar],
    conversion: u32,
    base: u32,
    span_b: u32,
    displacement: u32,
    count: usize,
) -> Option<Vec<CloudPosition>> {
    let longest = conversion.max(base).max(span_b) as usize;
    let displacement = displacement as usize;
    if count == 0 || bars.len() < longest + displacement + count - 1 {
        return None;
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let mut out = Vec::with_capacity(count);
    for idx in bars.len() - count..bars.len() {
        let (a, b) = spans_at(&highs, &lows, idx + 1 - displacement, conversion, base, span_b)?;
        let top = a.max(b);
        let bottom = a.min(b);
        let close = bars[idx].close;
        out.push(if close > top {
            CloudPosition::Above
        } else if close < bottom {
            CloudPosition::Below
        } else {
            CloudPosition::Inside
        });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bar::Timeframe;
    use chrono::DateTime;

    fn bars_from_closes(closes: &[f64]) -> Vec<OhlcBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                OhlcBar::new(
                    "X",
                    Timeframe::M5,
                    DateTime::from_timestamp(300 * i as i64, 0).unwrap(),
                    c,
                    c + 1.0,
                    c - 1.0,
                    c,
                    1.0,
                )
            })
            .collect()
    }

    #[test]
    fn rising_market_closes_above_cloud() {
        let closes: Vec<f64> = (0..90).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let out = calculate_ichimoku(&bars, 9, 26, 52, 26).unwrap();
        // Spans are computed 26 bars back, so a steady uptrend sits above.
        let close = bars.last().unwrap().close;
        assert!(close > out.span_a.max(out.span_b));

        let positions = cloud_position_series(&bars, 9, 26, 52, 26, 3).unwrap();
        assert!(positions.iter().all(|p| *p == CloudPosition::Above));
    }

    #[test]
    fn conversion_is_short_window_midpoint() {
        // Flat market: every midpoint equals the close.
        let bars = bars_from_closes(&[100.0; 90]);
        let out = calculate_ichimoku(&bars, 9, 26, 52, 26).unwrap();
        assert!((out.conversion - 100.0).abs() < 1e-12);
        assert!((out.base - 100.0).abs() < 1e-12);
        assert!((out.span_a - 100.0).abs() < 1e-12);
        assert!((out.span_b - 100.0).abs() < 1e-12);
    }

    #[test]
    fn insufficient_history() {
        let bars = bars_from_closes(&[100.0; 70]);
        assert!(calculate_ichimoku(&bars, 9, 26, 52, 26).is_none());
    }
}
