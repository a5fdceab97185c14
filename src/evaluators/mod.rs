//! Alert evaluation dispatch.
//!
//! The per-family decision logic lives in the submodules as pure functions
//! over (inputs, policy, runtime state). This module assembles those inputs
//! from the caches after a bar closes, applies the shared gating (warm-up,
//! stale data) and turns decisions into trigger events.

pub mod correlation;
pub mod flip;
pub mod threshold;

use crate::cache::{BarHistory, IndicatorCache};
use crate::config::{Config, ScoreIndicator, ScoringStyle};
use crate::errors::SkipReason;
use crate::indicators::momentum::rsi::rsi_series;
use crate::indicators::structure::ichimoku::cloud_position_series;
use crate::indicators::trend::ema::{ema_cross_series, fast_ema_slope};
use crate::indicators::trend::supertrend::trend_stop_series;
use crate::metrics::Metrics;
use crate::models::alert::{
    AlertDefinition, AlertPolicy, CorrelationMode, CorrelationPolicy, FlipPolicy, FlipRule,
    ThresholdPolicy,
};
use crate::models::bar::Timeframe;
use crate::models::indicator::{CacheKey, IndicatorKind, IndicatorValue};
use crate::models::trigger::TriggerEvent;
use crate::state::{AlertStateStore, StateKey};
use chrono::{DateTime, Utc};
use correlation::CorrelationInputs;
use flip::FlipInputs;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use threshold::{TimeframeSignals, NEW_SIGNAL_LOOKBACK};
use tracing::{debug, warn};

/// Bars of discrete-signal history kept per cell.
const SIGNAL_DEPTH: usize = NEW_SIGNAL_LOOKBACK + 1;
/// A key is stale once its newest closed bar is older than this many
/// timeframe durations.
const STALE_BAR_FACTOR: i32 = 2;

pub struct AlertEvaluator {
    cache: Arc<IndicatorCache>,
    history: Arc<BarHistory>,
    states: Arc<AlertStateStore>,
    config: Arc<Config>,
    metrics: Arc<Metrics>,
}

impl AlertEvaluator {
    pub fn new(
        cache: Arc<IndicatorCache>,
        history: Arc<BarHistory>,
        states: Arc<AlertStateStore>,
        config: Arc<Config>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cache,
            history,
            states,
            config,
            metrics,
        }
    }

    /// Evaluate every active definition that references the key whose bar
    /// just closed. A failing definition is skipped, never fatal for its
    /// neighbours.
    pub async fn evaluate(
        &self,
        definitions: &[AlertDefinition],
        symbol: &str,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        for def in definitions {
            if !def.enabled
                || !def.symbols.iter().any(|s| s == symbol)
                || !def.timeframes.contains(&timeframe)
            {
                continue;
            }
            let (event, family) = match &def.policy {
                AlertPolicy::Threshold(p) => (
                    self.evaluate_threshold(def, p, symbol, timeframe, now).await,
                    "threshold",
                ),
                AlertPolicy::Flip(p) => (
                    self.evaluate_flip(def, p, symbol, timeframe, now).await,
                    "flip",
                ),
                AlertPolicy::Correlation(p) => (
                    self.evaluate_correlation(def, p, timeframe, now).await,
                    "correlation",
                ),
            };
            if let Some(event) = event {
                self.metrics
                    .triggers_emitted_total
                    .with_label_values(&[family])
                    .inc();
                events.push(event);
            }
        }
        events
    }

    /// Shared gating for one (symbol, timeframe). Returns the skip reason,
    /// already counted, when evaluation must not proceed.
    async fn gate(&self, symbol: &str, tf: Timeframe, now: DateTime<Utc>) -> Option<SkipReason> {
        let reason = match self.history.latest(symbol, tf).await {
            None => SkipReason::WarmupIncomplete,
            Some(bar) if now - bar.open_time > tf.duration() * STALE_BAR_FACTOR => {
                warn!(
                    symbol = %symbol,
                    timeframe = %tf.as_str(),
                    "skipping evaluation, newest bar is stale"
                );
                SkipReason::StaleData
            }
            Some(_) => return None,
        };
        self.metrics.record_evaluation_skip(reason.as_str());
        Some(reason)
    }

    async fn evaluate_threshold(
        &self,
        def: &AlertDefinition,
        policy: &ThresholdPolicy,
        symbol: &str,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Option<TriggerEvent> {
        let mut matrix = HashMap::new();
        for &tf in &def.timeframes {
            if self.gate(symbol, tf, now).await.is_some() {
                return None;
            }
            match self.timeframe_signals(symbol, tf).await {
                Some(signals) => {
                    matrix.insert(tf, signals);
                }
                None => {
                    debug!(
                        alert_id = def.id,
                        symbol = %symbol,
                        timeframe = %tf.as_str(),
                        "signal matrix incomplete, waiting for warm-up"
                    );
                    self.metrics
                        .record_evaluation_skip(SkipReason::WarmupIncomplete.as_str());
                    return None;
                }
            }
        }

        let profile = self.config.profile(policy.style);
        let reading = threshold::compute_strength(&matrix, &profile)?;
        let cooldown = def.cooldown();
        let key = StateKey::new(def.id, symbol, timeframe);
        let side = self
            .states
            .with_state(key, |state| {
                threshold::decide(&reading, policy, state, cooldown, now)
            })
            .await?;

        Some(TriggerEvent::new(
            def.id,
            symbol,
            timeframe,
            format!("strength_cross_{}", side.as_str()),
            json!({
                "strength": reading.strength,
                "buy_min": policy.buy_min,
                "sell_max": policy.sell_max,
            }),
        ))
    }

    async fn evaluate_flip(
        &self,
        def: &AlertDefinition,
        policy: &FlipPolicy,
        symbol: &str,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Option<TriggerEvent> {
        if self.gate(symbol, timeframe, now).await.is_some() {
            return None;
        }

        let bars = self.history.window(symbol, timeframe).await;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let depth = policy.lookback + 2;

        let mut confirmed = true;
        let mut oscillator = None;
        let regimes: Option<Vec<i8>> = match &policy.rule {
            FlipRule::EmaCross { fast, slow } => {
                let signs = ema_cross_series(&closes, *fast, *slow);
                confirmed = match (signs.as_ref().and_then(|s| s.last()), fast_ema_slope(&closes, *fast))
                {
                    (Some(&r), Some(slope)) => r == 0 || (r as f64) * slope > 0.0,
                    _ => false,
                };
                signs
            }
            FlipRule::RsiMidline { period } => rsi_series(&closes, *period).map(|rsi| {
                oscillator = rsi.last().copied();
                rsi.iter()
                    .map(|&v| {
                        if v > 50.0 {
                            1
                        } else if v < 50.0 {
                            -1
                        } else {
                            0
                        }
                    })
                    .collect()
            }),
            FlipRule::TrendStop {
                length,
                atr_length,
                multiplier,
            } => trend_stop_series(&bars, *length, *atr_length, *multiplier)
                .map(|series| series.iter().map(|s| s.direction.sign() as i8).collect()),
            FlipRule::CloudBreakout {
                conversion,
                base,
                span_b,
                displacement,
            } => cloud_position_series(&bars, *conversion, *base, *span_b, *displacement, depth)
                .map(|positions| positions.iter().map(|p| p.sign()).collect()),
        };

        let mut regimes = match regimes {
            Some(r) if !r.is_empty() => r,
            _ => {
                self.metrics
                    .record_evaluation_skip(SkipReason::WarmupIncomplete.as_str());
                return None;
            }
        };
        let start = regimes.len().saturating_sub(depth);
        regimes.drain(..start);

        let strength = match policy.secondary_gate {
            Some(_) => {
                let signals = self.timeframe_signals(symbol, timeframe).await?;
                let matrix = HashMap::from([(timeframe, signals)]);
                threshold::compute_strength(&matrix, &self.config.profile(ScoringStyle::default()))
                    .map(|r| r.strength)
            }
            None => None,
        };

        let inputs = FlipInputs {
            regimes,
            confirmed,
            strength,
            oscillator,
        };
        let cooldown = def.cooldown();
        let key = StateKey::new(def.id, symbol, timeframe).with_facet(policy.rule.label());
        let side = self
            .states
            .with_state(key, |state| {
                flip::decide(&inputs, policy, state, cooldown, now)
            })
            .await?;

        Some(TriggerEvent::new(
            def.id,
            symbol,
            timeframe,
            format!("{}_{}", policy.rule.label(), side.as_str()),
            json!({
                "strength": inputs.strength,
                "oscillator": inputs.oscillator,
            }),
        ))
    }

    async fn evaluate_correlation(
        &self,
        def: &AlertDefinition,
        policy: &CorrelationPolicy,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Option<TriggerEvent> {
        let symbol_a = def.symbols.first()?.as_str();
        let symbol_b = def.symbols.get(1)?.as_str();
        for symbol in [symbol_a, symbol_b] {
            if self.gate(symbol, timeframe, now).await.is_some() {
                return None;
            }
        }

        let closes_a: Vec<f64> = self
            .history
            .window(symbol_a, timeframe)
            .await
            .iter()
            .map(|b| b.close)
            .collect();
        let closes_b: Vec<f64> = self
            .history
            .window(symbol_b, timeframe)
            .await
            .iter()
            .map(|b| b.close)
            .collect();

        let inputs = match &policy.mode {
            CorrelationMode::Threshold { rsi_period, .. } => CorrelationInputs {
                rsi_a: rsi_series(&closes_a, *rsi_period).and_then(|s| s.last().copied()),
                rsi_b: rsi_series(&closes_b, *rsi_period).and_then(|s| s.last().copied()),
                correlation: None,
            },
            CorrelationMode::Rolling { window, .. } => CorrelationInputs {
                rsi_a: None,
                rsi_b: None,
                correlation: correlation::rolling_correlation(&closes_a, &closes_b, *window),
            },
        };

        let ready = match &policy.mode {
            CorrelationMode::Threshold { .. } => inputs.rsi_a.is_some() && inputs.rsi_b.is_some(),
            CorrelationMode::Rolling { .. } => inputs.correlation.is_some(),
        };
        if !ready {
            self.metrics
                .record_evaluation_skip(SkipReason::WarmupIncomplete.as_str());
            return None;
        }

        let cooldown = def.cooldown();
        let key = StateKey::new(def.id, symbol_a, timeframe)
            .with_facet(format!("{}|{}", symbol_a, symbol_b));
        let class = self
            .states
            .with_state(key, |state| {
                correlation::decide(&inputs, &policy.mode, state, cooldown, now)
            })
            .await?;

        Some(TriggerEvent::new(
            def.id,
            symbol_a,
            timeframe,
            format!("correlation_{}", class.as_str()),
            json!({
                "pair": [symbol_a, symbol_b],
                "rsi_a": inputs.rsi_a,
                "rsi_b": inputs.rsi_b,
                "correlation": inputs.correlation,
            }),
        ))
    }

    /// Discrete signal state per scoring indicator for one (symbol,
    /// timeframe), assembled from the cached series. `None` until every
    /// configured cell has at least one sample.
    async fn timeframe_signals(&self, symbol: &str, tf: Timeframe) -> Option<TimeframeSignals> {
        let mut signals = HashMap::new();

        if let Some(kind) = self.config.rsi_kind() {
            let series = self
                .value_signs(symbol, tf, kind, |v| {
                    v.as_scalar().map(|x| {
                        if x > 50.0 {
                            1
                        } else if x < 50.0 {
                            -1
                        } else {
                            0
                        }
                    })
                })
                .await;
            if series.is_empty() {
                return None;
            }
            signals.insert(ScoreIndicator::Rsi, series);
        }

        if let Some(kind) = self.config.macd_kind() {
            let series = self
                .value_signs(symbol, tf, kind, |v| match v {
                    IndicatorValue::Macd { histogram, .. } => Some(if *histogram > 0.0 {
                        1
                    } else if *histogram < 0.0 {
                        -1
                    } else {
                        0
                    }),
                    _ => None,
                })
                .await;
            if series.is_empty() {
                return None;
            }
            signals.insert(ScoreIndicator::Macd, series);
        }

        if let Some((fast, slow)) = self.config.ema_pair() {
            let series = self.ema_cross_signs(symbol, tf, fast, slow).await;
            if series.is_empty() {
                return None;
            }
            signals.insert(ScoreIndicator::EmaCross, series);
        }

        if let Some(kind) = self.config.trend_stop_kind() {
            let series = self
                .value_signs(symbol, tf, kind, |v| match v {
                    IndicatorValue::TrendStop { direction, .. } => Some(direction.sign() as i8),
                    _ => None,
                })
                .await;
            if series.is_empty() {
                return None;
            }
            signals.insert(ScoreIndicator::TrendStop, series);
        }

        if let Some(kind) = self.config.ichimoku_kind() {
            let series = self.cloud_signs(symbol, tf, kind).await;
            if series.is_empty() {
                return None;
            }
            signals.insert(ScoreIndicator::Cloud, series);
        }

        if signals.is_empty() {
            return None;
        }

        let atr_window = match self.config.atr_kind() {
            Some(kind) => self
                .cache
                .window(&CacheKey::new(symbol, tf, kind))
                .await
                .iter()
                .filter_map(|s| s.value.as_scalar())
                .collect(),
            None => Vec::new(),
        };

        Some(TimeframeSignals {
            signals,
            atr_window,
        })
    }

    /// Tail of the cached series for `kind`, mapped to discrete signs.
    async fn value_signs(
        &self,
        symbol: &str,
        tf: Timeframe,
        kind: IndicatorKind,
        sign: impl Fn(&IndicatorValue) -> Option<i8>,
    ) -> Vec<i8> {
        let window = self.cache.window(&CacheKey::new(symbol, tf, kind)).await;
        let start = window.len().saturating_sub(SIGNAL_DEPTH);
        window[start..]
            .iter()
            .filter_map(|s| sign(&s.value))
            .collect()
    }

    /// Fast-vs-slow EMA sign per bar, joined on bar time so a gap in
    /// either series never misaligns the comparison.
    async fn ema_cross_signs(
        &self,
        symbol: &str,
        tf: Timeframe,
        fast: IndicatorKind,
        slow: IndicatorKind,
    ) -> Vec<i8> {
        let fast_window = self.cache.window(&CacheKey::new(symbol, tf, fast)).await;
        let slow_window = self.cache.window(&CacheKey::new(symbol, tf, slow)).await;
        let slow_by_time: HashMap<DateTime<Utc>, f64> = slow_window
            .iter()
            .filter_map(|s| s.value.as_scalar().map(|v| (s.bar_time, v)))
            .collect();

        let mut signs: Vec<i8> = fast_window
            .iter()
            .filter_map(|s| {
                let f = s.value.as_scalar()?;
                let sl = *slow_by_time.get(&s.bar_time)?;
                Some(if f > sl {
                    1
                } else if f < sl {
                    -1
                } else {
                    0
                })
            })
            .collect();
        let start = signs.len().saturating_sub(SIGNAL_DEPTH);
        signs.drain(..start);
        signs
    }

    /// Close position against the cached cloud spans per bar.
    async fn cloud_signs(&self, symbol: &str, tf: Timeframe, kind: IndicatorKind) -> Vec<i8> {
        let samples = self.cache.window(&CacheKey::new(symbol, tf, kind)).await;
        let bars = self.history.window(symbol, tf).await;
        let close_by_time: HashMap<DateTime<Utc>, f64> =
            bars.iter().map(|b| (b.open_time, b.close)).collect();

        let mut signs: Vec<i8> = samples
            .iter()
            .filter_map(|s| match s.value {
                IndicatorValue::Ichimoku { span_a, span_b, .. } => {
                    let close = *close_by_time.get(&s.bar_time)?;
                    let top = span_a.max(span_b);
                    let bottom = span_a.min(span_b);
                    Some(if close > top {
                        1
                    } else if close < bottom {
                        -1
                    } else {
                        0
                    })
                }
                _ => None,
            })
            .collect();
        let start = signs.len().saturating_sub(SIGNAL_DEPTH);
        signs.drain(..start);
        signs
    }
}
