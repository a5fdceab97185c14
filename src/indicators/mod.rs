//! Pure indicator engine: stateless functions over ordered closed bars.
//!
//! No hidden state and no I/O. Insufficient history always yields `None`,
//! never a fabricated value; the pipeline maps that to a warm-up skip.

pub mod math;

pub mod momentum;
pub mod structure;
pub mod trend;
pub mod volatility;

use crate::models::bar::OhlcBar;
use crate::models::indicator::{IndicatorKind, IndicatorValue};

/// Compute one indicator at the most recent closed bar.
///
/// Exhaustive over the closed indicator set; an unsupported indicator is a
/// compile error, not a runtime lookup failure.
pub fn compute(kind: &IndicatorKind, bars: &[OhlcBar]) -> Option<IndicatorValue> {
    match kind {
        IndicatorKind::Rsi { period } => {
            momentum::rsi::calculate_rsi(bars, *period).map(IndicatorValue::Scalar)
        }
        IndicatorKind::Ema { period } => {
            trend::ema::calculate_ema(bars, *period).map(IndicatorValue::Scalar)
        }
        IndicatorKind::Macd { fast, slow, signal } => momentum::macd::calculate_macd(
            bars, *fast, *slow, *signal,
        )
        .map(|out| IndicatorValue::Macd {
            macd: out.macd,
            signal: out.signal,
            histogram: out.histogram,
        }),
        IndicatorKind::Atr { period } => {
            volatility::atr::calculate_atr(bars, *period).map(IndicatorValue::Scalar)
        }
        IndicatorKind::Ichimoku {
            conversion,
            base,
            span_b,
            displacement,
        } => structure::ichimoku::calculate_ichimoku(
            bars,
            *conversion,
            *base,
            *span_b,
            *displacement,
        )
        .map(|out| IndicatorValue::Ichimoku {
            conversion: out.conversion,
            base: out.base,
            span_a: out.span_a,
            span_b: out.span_b,
            lagging: out.lagging,
        }),
        IndicatorKind::TrendStop {
            length,
            atr_length,
            multiplier,
        } => trend::supertrend::calculate_trend_stop(bars, *length, *atr_length, *multiplier)
            .map(|state| IndicatorValue::TrendStop {
                stop: state.stop,
                direction: state.direction,
            }),
    }
}
