//! Shared numeric helpers for the indicator engine.

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: f64 = values[values.len() - period..].iter().sum();
    Some(sum / period as f64)
}

/// EMA series seeded with the simple mean of the first `period` values.
///
/// `result[i]` corresponds to `values[period - 1 + i]`.
pub fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut prev = seed;
    out.push(seed);
    for v in &values[period..] {
        prev += alpha * (v - prev);
        out.push(prev);
    }
    Some(out)
}

/// Wilder-smoothed series: seed = simple mean of the first `period` values,
/// then `avg = ((period - 1) * prev + v) / period`.
///
/// `result[i]` corresponds to `values[period - 1 + i]`.
pub fn wilder_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }
    let p = period as f64;
    let seed: f64 = values[..period].iter().sum::<f64>() / p;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    for v in &values[period..] {
        let prev = *out.last().unwrap();
        out.push(((p - 1.0) * prev + v) / p);
    }
    Some(out)
}

/// True range of one bar given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Midpoint of the highest high and lowest low over the last `period` bars.
pub fn hl_midpoint(highs: &[f64], lows: &[f64], period: usize) -> Option<f64> {
    if period == 0 || highs.len() < period || lows.len() < period {
        return None;
    }
    let hh = highs[highs.len() - period..]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let ll = lows[lows.len() - period..]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    Some((hh + ll) / 2.0)
}

/// Log returns between consecutive closes. Non-positive closes yield no
/// return for that step.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

/// Pearson correlation coefficient of two equally sized samples.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Nearest-rank percentile (`pct` in 0–100) of a sample.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&pct) {
        return None;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_requires_enough_values() {
        assert!(sma(&[1.0, 2.0], 3).is_none());
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
    }

    #[test]
    fn ema_series_alignment() {
        let series = ema_series(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert_eq!(series.len(), 2);
        assert!((series[0] - 2.0).abs() < 1e-12);
        // alpha = 0.5: 2.0 + 0.5 * (4.0 - 2.0)
        assert!((series[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_of_identical_series_is_one() {
        let a = [1.0, 2.0, 4.0, 3.0, 5.0];
        let r = pearson(&a, &a).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn percentile_nearest_rank() {
        let vals = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&vals, 5.0), Some(1.0));
        assert_eq!(percentile(&vals, 100.0), Some(5.0));
    }
}
