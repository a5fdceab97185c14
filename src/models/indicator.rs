//! Indicator identity and value types.
//!
//! The indicator set is a closed enum: every supported indicator is matched
//! exhaustively at compile time instead of being looked up by name.

use crate::models::bar::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// One indicator plus its parameters. Part of the cache key, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi {
        period: u32,
    },
    Ema {
        period: u32,
    },
    Macd {
        fast: u32,
        slow: u32,
        signal: u32,
    },
    Atr {
        period: u32,
    },
    Ichimoku {
        conversion: u32,
        base: u32,
        span_b: u32,
        displacement: u32,
    },
    TrendStop {
        length: u32,
        atr_length: u32,
        multiplier: f64,
    },
}

impl Eq for IndicatorKind {}

// Manual Hash: the only float parameter is hashed by bit pattern so the
// kind can key a HashMap.
impl Hash for IndicatorKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            IndicatorKind::Rsi { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Atr { period } => period.hash(state),
            IndicatorKind::Macd { fast, slow, signal } => {
                fast.hash(state);
                slow.hash(state);
                signal.hash(state);
            }
            IndicatorKind::Ichimoku {
                conversion,
                base,
                span_b,
                displacement,
            } => {
                conversion.hash(state);
                base.hash(state);
                span_b.hash(state);
                displacement.hash(state);
            }
            IndicatorKind::TrendStop {
                length,
                atr_length,
                multiplier,
            } => {
                length.hash(state);
                atr_length.hash(state);
                multiplier.to_bits().hash(state);
            }
        }
    }
}

impl IndicatorKind {
    /// Stable name used in logs and on the broadcast wire.
    pub fn label(&self) -> String {
        match self {
            IndicatorKind::Rsi { period } => format!("rsi_{}", period),
            IndicatorKind::Ema { period } => format!("ema_{}", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                format!("macd_{}_{}_{}", fast, slow, signal)
            }
            IndicatorKind::Atr { period } => format!("atr_{}", period),
            IndicatorKind::Ichimoku {
                conversion,
                base,
                span_b,
                displacement,
            } => format!("ichimoku_{}_{}_{}_{}", conversion, base, span_b, displacement),
            IndicatorKind::TrendStop {
                length,
                atr_length,
                multiplier,
            } => format!("trendstop_{}_{}_{}", length, atr_length, multiplier),
        }
    }

    /// Minimum number of closed bars required before this indicator
    /// produces a valid value.
    pub fn warmup_bars(&self) -> usize {
        match self {
            IndicatorKind::Rsi { period } => *period as usize + 1,
            IndicatorKind::Ema { period } => *period as usize,
            IndicatorKind::Macd { fast, slow, signal } => {
                (*fast.max(slow) + *signal) as usize
            }
            IndicatorKind::Atr { period } => *period as usize + 1,
            IndicatorKind::Ichimoku {
                conversion,
                base,
                span_b,
                displacement,
            } => (*conversion.max(base).max(span_b) + *displacement) as usize,
            IndicatorKind::TrendStop { length, atr_length, .. } => {
                *length.max(atr_length) as usize + 1
            }
        }
    }

    /// Default engine set computed for every (symbol, timeframe) key.
    pub fn default_set() -> Vec<IndicatorKind> {
        vec![
            IndicatorKind::Rsi { period: 14 },
            IndicatorKind::Ema { period: 12 },
            IndicatorKind::Ema { period: 26 },
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorKind::Atr { period: 14 },
            IndicatorKind::Ichimoku {
                conversion: 9,
                base: 26,
                span_b: 52,
                displacement: 26,
            },
            IndicatorKind::TrendStop {
                length: 10,
                atr_length: 10,
                multiplier: 3.0,
            },
        ]
    }
}

/// Trend direction of the stop-and-reverse indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    pub fn sign(&self) -> f64 {
        match self {
            TrendDirection::Up => 1.0,
            TrendDirection::Down => -1.0,
        }
    }

}

/// Computed value for one indicator on one closed bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Scalar(f64),
    Macd {
        macd: f64,
        signal: f64,
        histogram: f64,
    },
    Ichimoku {
        conversion: f64,
        base: f64,
        span_a: f64,
        span_b: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        lagging: Option<f64>,
    },
    TrendStop {
        stop: f64,
        direction: TrendDirection,
    },
}

impl IndicatorValue {
    /// Scalar view where one exists (RSI, EMA, ATR).
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            IndicatorValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// One cached sample. Appended at most once per closed bar per key and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSample {
    pub bar_time: DateTime<Utc>,
    pub value: IndicatorValue,
}

/// Identifies one cached indicator series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub indicator: IndicatorKind,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, indicator: IndicatorKind) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            indicator,
        }
    }
}

/// Broadcast payload for one newly cached bar:
/// `{ symbol, timeframe, bar_time: <epoch-ms>, indicators: { name: value } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Provider server time of the closed bar, epoch milliseconds.
    pub bar_time: i64,
    pub indicators: serde_json::Map<String, serde_json::Value>,
}

impl IndicatorSnapshot {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bar_time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bar_time: bar_time.timestamp_millis(),
            indicators: serde_json::Map::new(),
        }
    }

    pub fn insert(&mut self, kind: &IndicatorKind, value: &IndicatorValue) {
        if let Ok(json) = serde_json::to_value(value) {
            self.indicators.insert(kind.label(), json);
        }
    }
}
