//! Indicator-flip evaluation.
//!
//! A flip is a regime change in a discrete indicator series. It is eligible
//! only if it happened within the last `lookback` closed bars and has
//! persisted for at least one further closed bar. Re-arm discipline differs
//! by family: trend-following rules re-arm only on an opposite-direction
//! flip, oscillator rules after an opposite-zone touch.

use crate::models::alert::FlipPolicy;
use crate::models::trigger::TriggerSide;
use crate::state::AlertRuntimeState;
use chrono::{DateTime, Duration, Utc};

/// RSI zone bounds used for oscillator re-arm.
pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;

/// Inputs assembled by the dispatcher for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct FlipInputs {
    /// Discrete regime per closed bar, oldest to newest (+1 / -1, 0 when
    /// undefined, e.g. inside the cloud).
    pub regimes: Vec<i8>,
    /// Rule-specific confirmation (EMA slope agreement); true when the
    /// rule has no extra confirmation.
    pub confirmed: bool,
    /// Composite strength for the optional secondary gate.
    pub strength: Option<f64>,
    /// Latest oscillator value, for opposite-zone re-arm.
    pub oscillator: Option<f64>,
}

/// Most recent flip in a regime series: `(direction, bars_since_flip)`.
fn last_flip(regimes: &[i8]) -> Option<(i8, usize)> {
    let newest = *regimes.last()?;
    if newest == 0 {
        return None;
    }
    for i in (1..regimes.len()).rev() {
        if regimes[i - 1] != regimes[i] {
            if regimes[i] == newest {
                return Some((newest, regimes.len() - 1 - i));
            }
            return None;
        }
    }
    None
}

/// Edge-triggered flip decision.
pub fn decide(
    inputs: &FlipInputs,
    policy: &FlipPolicy,
    state: &mut AlertRuntimeState,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<TriggerSide> {
    let current = *inputs.regimes.last()?;
    let regime_label = format!("regime_{}", current);

    // First evaluation after activation: baseline only. The side matching
    // the current regime starts disarmed so an already-true flip cannot
    // fire; only a fresh flip observed while active can.
    if !state.is_seeded() {
        state.last_status = Some(regime_label);
        if current > 0 {
            state.armed_buy = false;
        } else if current < 0 {
            state.armed_sell = false;
        }
        return None;
    }
    state.last_status = Some(regime_label);

    // Family re-arm, before any fire decision.
    if policy.rule.is_trend_following() {
        // Opposite regime re-arms the side that fired.
        if current < 0 {
            state.armed_buy = true;
        } else if current > 0 {
            state.armed_sell = true;
        }
    } else if let Some(osc) = inputs.oscillator {
        if osc <= OVERSOLD {
            state.armed_buy = true;
        } else if osc >= OVERBOUGHT {
            state.armed_sell = true;
        }
    }

    let (direction, bars_since) = last_flip(&inputs.regimes)?;
    // Within the lookback window, persisted at least one further bar.
    if bars_since == 0 || bars_since > policy.lookback.saturating_sub(1) {
        return None;
    }
    if !inputs.confirmed {
        return None;
    }

    let side = if direction > 0 {
        TriggerSide::Buy
    } else {
        TriggerSide::Sell
    };

    if let Some(gate) = &policy.secondary_gate {
        let pass = match (side, inputs.strength) {
            (TriggerSide::Buy, Some(s)) => s >= gate.buy_min,
            (TriggerSide::Sell, Some(s)) => s <= gate.sell_max,
            (_, None) => false,
        };
        if !pass {
            return None;
        }
    }

    if !state.is_armed(side) || !state.cooldown_elapsed(cooldown, now) {
        return None;
    }

    state.record_trigger(side, now);
    // Trend family: the opposite side is armed by construction once the
    // regime flips back; oscillator re-arm waits for the zone touch.
    Some(side)
}
