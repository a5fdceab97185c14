//! Cross-symbol correlation evaluation.
//!
//! Two modes: oscillator threshold classification of the pair, and rolling
//! Pearson correlation of log-returns. Both are edge-triggered: a trigger
//! fires only on the transition into an alertable classification, never
//! while the same classification persists across bars.

use crate::indicators::math;
use crate::models::alert::{CorrelationMode, ExpectedSign};
use crate::models::trigger::TriggerSide;
use crate::state::AlertRuntimeState;
use chrono::{DateTime, Duration, Utc};

/// Pair classification across both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairClass {
    Neutral,
    /// Threshold mode: exactly one symbol in an extreme zone.
    PositiveMismatch,
    /// Threshold mode: both symbols in the same extreme zone despite the
    /// pair's expected anti-correlation.
    NegativeMismatch,
    /// Threshold mode: both back inside the neutral band after a mismatch.
    NeutralBreak,
    StrongPositive,
    StrongNegative,
    /// Rolling mode: |r| below the weak bound.
    Weak,
    /// Rolling mode: correlation sign contradicts the expectation.
    SignBreak,
}

impl PairClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairClass::Neutral => "neutral",
            PairClass::PositiveMismatch => "positive_mismatch",
            PairClass::NegativeMismatch => "negative_mismatch",
            PairClass::NeutralBreak => "neutral_break",
            PairClass::StrongPositive => "strong_positive",
            PairClass::StrongNegative => "strong_negative",
            PairClass::Weak => "weak",
            PairClass::SignBreak => "sign_break",
        }
    }

    /// Classes that produce a trigger on entry.
    pub fn is_alertable(&self) -> bool {
        matches!(
            self,
            PairClass::PositiveMismatch
                | PairClass::NegativeMismatch
                | PairClass::NeutralBreak
                | PairClass::Weak
                | PairClass::SignBreak
        )
    }
}

/// Threshold-mode classification from the two oscillator values.
pub fn classify_threshold(
    rsi_a: f64,
    rsi_b: f64,
    overbought: f64,
    oversold: f64,
    neutral_band: f64,
    prior_was_mismatch: bool,
) -> PairClass {
    let extreme = |v: f64| v >= overbought || v <= oversold;
    let in_band = |v: f64| (v - 50.0).abs() <= neutral_band;

    match (extreme(rsi_a), extreme(rsi_b)) {
        (true, true) => {
            let same_zone = (rsi_a >= overbought) == (rsi_b >= overbought);
            if same_zone {
                PairClass::NegativeMismatch
            } else {
                // Opposite extremes are the expected shape for an
                // anti-correlated pair.
                PairClass::Neutral
            }
        }
        (true, false) | (false, true) => PairClass::PositiveMismatch,
        (false, false) => {
            if prior_was_mismatch && in_band(rsi_a) && in_band(rsi_b) {
                PairClass::NeutralBreak
            } else {
                PairClass::Neutral
            }
        }
    }
}

/// Rolling-mode classification from the correlation coefficient.
pub fn classify_rolling(r: f64, strong: f64, weak: f64, expected: ExpectedSign) -> PairClass {
    let sign_matches = match expected {
        ExpectedSign::Positive => r >= 0.0,
        ExpectedSign::Negative => r <= 0.0,
    };
    if !sign_matches && r.abs() >= weak {
        return PairClass::SignBreak;
    }
    if r.abs() < weak {
        return PairClass::Weak;
    }
    if r >= strong {
        return PairClass::StrongPositive;
    }
    if r <= -strong {
        return PairClass::StrongNegative;
    }
    PairClass::Neutral
}

/// Rolling Pearson correlation of log-returns over the trailing window.
pub fn rolling_correlation(closes_a: &[f64], closes_b: &[f64], window: usize) -> Option<f64> {
    if closes_a.len() < window + 1 || closes_b.len() < window + 1 {
        return None;
    }
    let ra = math::log_returns(&closes_a[closes_a.len() - window - 1..]);
    let rb = math::log_returns(&closes_b[closes_b.len() - window - 1..]);
    math::pearson(&ra, &rb)
}

/// Inputs assembled by the dispatcher for one evaluation.
#[derive(Debug, Clone)]
pub struct CorrelationInputs {
    pub rsi_a: Option<f64>,
    pub rsi_b: Option<f64>,
    pub correlation: Option<f64>,
}

/// Edge-triggered classification decision. Returns the class entered, or
/// `None` when nothing alertable happened.
pub fn decide(
    inputs: &CorrelationInputs,
    mode: &CorrelationMode,
    state: &mut AlertRuntimeState,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<PairClass> {
    let prior = state.last_status.clone();
    let prior_was_mismatch = matches!(
        prior.as_deref(),
        Some("positive_mismatch") | Some("negative_mismatch")
    );

    let class = match mode {
        CorrelationMode::Threshold {
            overbought,
            oversold,
            neutral_band,
            ..
        } => {
            let (a, b) = (inputs.rsi_a?, inputs.rsi_b?);
            classify_threshold(a, b, *overbought, *oversold, *neutral_band, prior_was_mismatch)
        }
        CorrelationMode::Rolling {
            strong,
            weak,
            expected_sign,
            ..
        } => classify_rolling(inputs.correlation?, *strong, *weak, *expected_sign),
    };

    let entered = prior.as_deref() != Some(class.as_str());
    // A mismatch stays on the record through plain-neutral bars so that a
    // later re-entry into the band still reads as a break.
    let sticky_mismatch = class == PairClass::Neutral && prior_was_mismatch;
    if !sticky_mismatch {
        state.last_status = Some(class.as_str().to_string());
    }

    // Seeding: the first classification is a baseline, not an event.
    if prior.is_none() {
        return None;
    }
    if !entered || !class.is_alertable() {
        return None;
    }
    if !state.cooldown_elapsed(cooldown, now) {
        return None;
    }

    // Both sides share one edge machine; record against buy for the
    // cooldown stamp.
    state.record_trigger(TriggerSide::Buy, now);
    state.armed_buy = true;
    Some(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_mode() -> CorrelationMode {
        CorrelationMode::Threshold {
            rsi_period: 14,
            overbought: 70.0,
            oversold: 30.0,
            neutral_band: 10.0,
        }
    }

    fn inputs(rsi_a: f64, rsi_b: f64) -> CorrelationInputs {
        CorrelationInputs {
            rsi_a: Some(rsi_a),
            rsi_b: Some(rsi_b),
            correlation: None,
        }
    }

    fn run(readings: &[(f64, f64)]) -> Vec<Option<PairClass>> {
        let mut state = AlertRuntimeState::default();
        readings
            .iter()
            .map(|&(a, b)| {
                decide(
                    &inputs(a, b),
                    &threshold_mode(),
                    &mut state,
                    Duration::zero(),
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn fires_on_transition_not_while_persisting() {
        let out = run(&[(50.0, 50.0), (75.0, 50.0), (76.0, 52.0), (50.0, 50.0)]);
        assert_eq!(
            out,
            vec![
                None, // seed
                Some(PairClass::PositiveMismatch),
                None, // same mismatch persists
                Some(PairClass::NeutralBreak),
            ]
        );
    }

    #[test]
    fn same_extreme_zone_is_negative_mismatch() {
        let out = run(&[(50.0, 50.0), (75.0, 80.0)]);
        assert_eq!(out[1], Some(PairClass::NegativeMismatch));
        // Opposite extremes are the expected anti-correlated shape.
        let out = run(&[(50.0, 50.0), (75.0, 25.0)]);
        assert_eq!(out[1], None);
    }

    #[test]
    fn neutral_break_requires_prior_mismatch_and_band() {
        // No prior mismatch: returning to neutral is not an event.
        let out = run(&[(50.0, 50.0), (55.0, 45.0)]);
        assert_eq!(out[1], None);
        // After a mismatch, outside the band is not yet a break.
        let out = run(&[(50.0, 50.0), (75.0, 50.0), (65.0, 50.0), (55.0, 50.0)]);
        assert_eq!(out[2], None);
        assert_eq!(out[3], Some(PairClass::NeutralBreak));
    }

    #[test]
    fn rolling_classification() {
        assert_eq!(
            classify_rolling(0.9, 0.8, 0.3, ExpectedSign::Positive),
            PairClass::StrongPositive
        );
        assert_eq!(
            classify_rolling(0.1, 0.8, 0.3, ExpectedSign::Positive),
            PairClass::Weak
        );
        assert_eq!(
            classify_rolling(-0.6, 0.8, 0.3, ExpectedSign::Positive),
            PairClass::SignBreak
        );
        assert_eq!(
            classify_rolling(-0.9, 0.8, 0.3, ExpectedSign::Negative),
            PairClass::StrongNegative
        );
        assert_eq!(
            classify_rolling(0.5, 0.8, 0.3, ExpectedSign::Positive),
            PairClass::Neutral
        );
    }

    #[test]
    fn rolling_correlation_of_lockstep_series() {
        let a: Vec<f64> = (1..=30).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (1..=30).map(|i| 50.0 + 0.5 * i as f64).collect();
        let r = rolling_correlation(&a, &b, 20).unwrap();
        assert!(r > 0.99);
    }

    #[test]
    fn rolling_mode_edge_trigger() {
        let mode = CorrelationMode::Rolling {
            window: 20,
            strong: 0.8,
            weak: 0.3,
            expected_sign: ExpectedSign::Positive,
        };
        let mut state = AlertRuntimeState::default();
        let mut eval = |r: f64| {
            decide(
                &CorrelationInputs {
                    rsi_a: None,
                    rsi_b: None,
                    correlation: Some(r),
                },
                &mode,
                &mut state,
                Duration::zero(),
                Utc::now(),
            )
        };
        assert_eq!(eval(0.9), None); // seed
        assert_eq!(eval(0.2), Some(PairClass::Weak));
        assert_eq!(eval(0.25), None); // persists
        assert_eq!(eval(-0.5), Some(PairClass::SignBreak));
    }
}
