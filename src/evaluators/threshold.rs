//! Threshold / composite-score evaluation.
//!
//! Discrete per-(timeframe, indicator) signals are combined into a bounded
//! score, converted to a 0-100 strength, and fed through an edge-triggered
//! crossing decision with hysteresis re-arm. The decision step is a pure
//! function over (strength, runtime state, policy) so threshold sequences
//! can be tested directly.

use crate::config::{ScoreIndicator, WeightProfile};
use crate::indicators::math;
use crate::models::alert::ThresholdPolicy;
use crate::models::bar::Timeframe;
use crate::models::trigger::TriggerSide;
use crate::state::AlertRuntimeState;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// A signal counts as "new" if it flipped within this many closed bars.
pub const NEW_SIGNAL_LOOKBACK: usize = 3;
/// Boost applied to a new signal, in the signal's direction.
pub const NEW_SIGNAL_BOOST: f64 = 0.25;
/// Cells clamp to this magnitude.
pub const CELL_CLAMP: f64 = 1.25;
/// ATR below this percentile of its trailing window marks a quiet market.
pub const QUIET_ATR_PERCENTILE: f64 = 5.0;
/// Minimum ATR window before quiet-market damping is considered.
pub const QUIET_MIN_WINDOW: usize = 20;

/// Discrete signal history for one (symbol, timeframe), oldest to newest.
#[derive(Debug, Clone, Default)]
pub struct TimeframeSignals {
    pub signals: HashMap<ScoreIndicator, Vec<i8>>,
    pub atr_window: Vec<f64>,
}

impl TimeframeSignals {
    /// Quiet market: the newest ATR sits below its 5th percentile over the
    /// trailing window. Short windows never count as quiet.
    pub fn is_quiet(&self) -> bool {
        if self.atr_window.len() < QUIET_MIN_WINDOW {
            return false;
        }
        match (
            self.atr_window.last(),
            math::percentile(&self.atr_window, QUIET_ATR_PERCENTILE),
        ) {
            (Some(&newest), Some(p)) => newest < p,
            _ => false,
        }
    }
}

/// Score one cell from its discrete signal history.
pub fn cell_score(series: &[i8], momentum: bool, quiet: bool) -> f64 {
    let cur = match series.last() {
        Some(&s) if s != 0 => s as f64,
        _ => return 0.0,
    };

    let flipped_recently = (1..=NEW_SIGNAL_LOOKBACK)
        .filter_map(|j| series.len().checked_sub(1 + j).map(|i| series[i]))
        .any(|s| s as f64 != cur);

    let mut cell = cur;
    if flipped_recently {
        cell += NEW_SIGNAL_BOOST * cur.signum();
    }
    if momentum && quiet {
        cell *= 0.5;
    }
    cell.clamp(-CELL_CLAMP, CELL_CLAMP)
}

/// Composite strength (0-100) plus the per-timeframe strengths used for
/// minimum-alignment checks.
#[derive(Debug, Clone)]
pub struct StrengthReading {
    pub strength: f64,
    pub per_timeframe: HashMap<Timeframe, f64>,
}

/// Aggregate a signal matrix into a strength reading.
///
/// Raw score is sum(cell x tf_weight x ind_weight), normalized against the
/// maximum attainable magnitude to [-100, 100], then mapped to strength via
/// `(score + 100) / 2`.
pub fn compute_strength(
    matrix: &HashMap<Timeframe, TimeframeSignals>,
    profile: &WeightProfile,
) -> Option<StrengthReading> {
    if matrix.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut total_max = 0.0;
    let mut per_timeframe = HashMap::new();

    for (&tf, signals) in matrix {
        let tf_weight = profile.timeframe_weight(tf);
        let quiet = signals.is_quiet();
        let mut tf_raw = 0.0;
        let mut tf_max = 0.0;

        for (&ind, series) in &signals.signals {
            let ind_weight = profile.indicator_weight(ind);
            let cell = cell_score(series, ind.is_momentum(), quiet);
            tf_raw += cell * ind_weight;
            tf_max += CELL_CLAMP * ind_weight.abs();
        }

        if tf_max > 0.0 {
            let tf_score = (tf_raw / tf_max * 100.0).clamp(-100.0, 100.0);
            per_timeframe.insert(tf, (tf_score + 100.0) / 2.0);
        }
        total += tf_raw * tf_weight;
        total_max += tf_max * tf_weight.abs();
    }

    if total_max == 0.0 {
        return None;
    }
    let score = (total / total_max * 100.0).clamp(-100.0, 100.0);
    Some(StrengthReading {
        strength: (score + 100.0) / 2.0,
        per_timeframe,
    })
}

/// Edge-triggered crossing decision with hysteresis re-arm.
///
/// The first call on an unseeded state records a baseline and never fires.
/// A side fires only on the transition across its bound while armed; it
/// re-arms once strength crosses back past the bound by `margin`.
pub fn decide(
    reading: &StrengthReading,
    policy: &ThresholdPolicy,
    state: &mut AlertRuntimeState,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<TriggerSide> {
    let strength = reading.strength;
    let prev = state.last_value.replace(strength);
    let prev = match prev {
        Some(p) => p,
        None => return None, // baseline seeded, no trigger
    };

    if !state.armed_buy && strength < policy.buy_min - policy.margin {
        state.armed_buy = true;
    }
    if !state.armed_sell && strength > policy.sell_max + policy.margin {
        state.armed_sell = true;
    }

    let aligned = |side: TriggerSide| match policy.min_alignment {
        None => true,
        Some(n) => {
            let count = reading
                .per_timeframe
                .values()
                .filter(|&&s| match side {
                    TriggerSide::Buy => s >= policy.buy_min,
                    TriggerSide::Sell => s <= policy.sell_max,
                })
                .count();
            count >= n
        }
    };

    if state.armed_buy
        && prev < policy.buy_min
        && strength >= policy.buy_min
        && aligned(TriggerSide::Buy)
        && state.cooldown_elapsed(cooldown, now)
    {
        state.record_trigger(TriggerSide::Buy, now);
        return Some(TriggerSide::Buy);
    }

    if state.armed_sell
        && prev > policy.sell_max
        && strength <= policy.sell_max
        && aligned(TriggerSide::Sell)
        && state.cooldown_elapsed(cooldown, now)
    {
        state.record_trigger(TriggerSide::Sell, now);
        return Some(TriggerSide::Sell);
    }

    None
}
