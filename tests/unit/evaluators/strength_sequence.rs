//! Strength-crossing sequence over a 30-minute feed, exercising the full
//! armed / triggered / hysteresis lifecycle through the public API.

use barsentry::evaluators::threshold::{decide, StrengthReading};
use barsentry::models::alert::ThresholdPolicy;
use barsentry::models::trigger::TriggerSide;
use barsentry::state::AlertRuntimeState;
use chrono::{Duration, Utc};
use std::collections::HashMap;

fn reading(strength: f64) -> StrengthReading {
    StrengthReading {
        strength,
        per_timeframe: HashMap::new(),
    }
}

#[test]
fn half_hourly_crossing_lifecycle() {
    let policy = ThresholdPolicy {
        buy_min: 80.0,
        sell_max: 20.0,
        margin: 5.0,
        min_alignment: None,
        style: Default::default(),
    };
    let mut state = AlertRuntimeState::default();
    let start = Utc::now();

    // One closed 30-minute bar per reading.
    let sequence: &[(i64, f64, Option<TriggerSide>)] = &[
        (0, 78.0, None),                    // 10:00 below the bound
        (30, 81.0, Some(TriggerSide::Buy)), // 10:30 upward crossing fires
        (60, 82.0, None),                   // 11:00 still above, disarmed
        (90, 79.0, None),                   // 11:30 above the 75 re-arm floor
        (120, 73.0, None),                  // 12:00 drops past 75, re-arms
        (150, 81.0, Some(TriggerSide::Buy)), // 12:30 second crossing fires
    ];

    for &(minutes, strength, expected) in sequence {
        let fired = decide(
            &reading(strength),
            &policy,
            &mut state,
            Duration::zero(),
            start + Duration::minutes(minutes),
        );
        assert_eq!(
            fired, expected,
            "unexpected outcome at +{}m (strength {})",
            minutes, strength
        );
    }
}

#[test]
fn level_holding_above_bound_never_fires() {
    let policy = ThresholdPolicy {
        buy_min: 80.0,
        sell_max: 20.0,
        margin: 5.0,
        min_alignment: None,
        style: Default::default(),
    };
    let mut state = AlertRuntimeState::default();

    for strength in [85.0, 86.0, 90.0, 88.0] {
        let fired = decide(
            &reading(strength),
            &policy,
            &mut state,
            Duration::zero(),
            Utc::now(),
        );
        assert!(fired.is_none(), "in-zone reading {} must not fire", strength);
    }
}
