//! Alert definition models.
//!
//! Definitions are owned and mutated by the external configuration store;
//! the engine treats them as read-only for the duration of an evaluation
//! cycle. Malformed definitions are rejected at load time and never reach
//! the evaluators.

use crate::config::ScoringStyle;
use crate::errors::DefinitionError;
use crate::models::bar::Timeframe;
use serde::{Deserialize, Serialize};

/// A user-defined alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub id: i64,
    pub owner: String,
    /// 1–3 symbols; correlation alerts require exactly 2.
    pub symbols: Vec<String>,
    /// 1–3 timeframes.
    pub timeframes: Vec<Timeframe>,
    pub policy: AlertPolicy,
    /// Uniform time floor between triggers for one (key, side). Zero
    /// disables the floor and leaves only the family's edge discipline.
    #[serde(default)]
    pub cooldown_secs: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertPolicy {
    Threshold(ThresholdPolicy),
    Flip(FlipPolicy),
    Correlation(CorrelationPolicy),
}

/// Composite-score policy: fires on strength crossings with hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Strength (0–100) the buy side must cross upward.
    pub buy_min: f64,
    /// Strength the sell side must cross downward.
    pub sell_max: f64,
    /// Hysteresis margin: buy re-arms below `buy_min - margin`, sell above
    /// `sell_max + margin`.
    pub margin: f64,
    /// Require at least N of the selected timeframes to individually clear
    /// the directional bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_alignment: Option<usize>,
    /// Which weight table to score with.
    #[serde(default)]
    pub style: ScoringStyle,
}

/// Indicator-flip policy: fires on confirmed regime flips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipPolicy {
    pub rule: FlipRule,
    /// A flip is eligible only if it happened within the last `lookback`
    /// closed bars.
    #[serde(default = "default_flip_lookback")]
    pub lookback: usize,
    /// Suppress unless the composite strength also clears this bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_gate: Option<SecondaryGate>,
}

fn default_flip_lookback() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FlipRule {
    /// Fast EMA crossing the slow EMA, confirmed by fast-EMA slope.
    EmaCross { fast: u32, slow: u32 },
    /// Oscillator midline (50) cross.
    RsiMidline { period: u32 },
    /// Close breaching the trailing stop, flipping the trend.
    TrendStop {
        length: u32,
        atr_length: u32,
        multiplier: f64,
    },
    /// Close breaking out of the Ichimoku cloud.
    CloudBreakout {
        conversion: u32,
        base: u32,
        span_b: u32,
        displacement: u32,
    },
}

impl FlipRule {
    /// Stable label used as the runtime-state facet and trigger condition.
    pub fn label(&self) -> String {
        match self {
            FlipRule::EmaCross { fast, slow } => format!("ema_cross_{}_{}", fast, slow),
            FlipRule::RsiMidline { period } => format!("rsi_midline_{}", period),
            FlipRule::TrendStop {
                length,
                atr_length,
                multiplier,
            } => format!("trendstop_{}_{}_{}", length, atr_length, multiplier),
            FlipRule::CloudBreakout {
                conversion,
                base,
                span_b,
                displacement,
            } => format!("cloud_{}_{}_{}_{}", conversion, base, span_b, displacement),
        }
    }

    /// Trend-following rules re-arm only on an opposite flip; oscillator
    /// rules re-arm after an opposite-zone touch.
    pub fn is_trend_following(&self) -> bool {
        !matches!(self, FlipRule::RsiMidline { .. })
    }
}

/// Secondary composite-strength gate for flip alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryGate {
    pub buy_min: f64,
    pub sell_max: f64,
}

impl Default for SecondaryGate {
    fn default() -> Self {
        Self {
            buy_min: 60.0,
            sell_max: 40.0,
        }
    }
}

/// Cross-symbol correlation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPolicy {
    pub mode: CorrelationMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Compare each symbol's RSI against shared extreme-zone bounds.
    Threshold {
        rsi_period: u32,
        overbought: f64,
        oversold: f64,
        /// Half-width of the neutral band around the midline used for the
        /// neutral-break classification.
        neutral_band: f64,
    },
    /// Rolling Pearson correlation of log-returns.
    Rolling {
        window: usize,
        /// |r| at or above this is a strong correlation.
        strong: f64,
        /// |r| below this is a weak correlation.
        weak: f64,
        expected_sign: ExpectedSign,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedSign {
    Positive,
    Negative,
}

impl AlertDefinition {
    /// Load-time validation. Anything rejected here never reaches an
    /// evaluator.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let fail = |reason: String| DefinitionError::Invalid {
            id: self.id,
            reason,
        };

        if self.symbols.is_empty() || self.symbols.len() > 3 {
            return Err(fail(format!(
                "expected 1-3 symbols, got {}",
                self.symbols.len()
            )));
        }
        if self.timeframes.is_empty() || self.timeframes.len() > 3 {
            return Err(fail(format!(
                "expected 1-3 timeframes, got {}",
                self.timeframes.len()
            )));
        }

        match &self.policy {
            AlertPolicy::Threshold(p) => {
                if !(0.0..=100.0).contains(&p.buy_min) || !(0.0..=100.0).contains(&p.sell_max) {
                    return Err(fail("threshold bounds must be within 0-100".into()));
                }
                if p.margin < 0.0 {
                    return Err(fail("hysteresis margin must be non-negative".into()));
                }
                if let Some(n) = p.min_alignment {
                    if n == 0 || n > self.timeframes.len() {
                        return Err(fail(format!(
                            "min_alignment {} out of range for {} timeframes",
                            n,
                            self.timeframes.len()
                        )));
                    }
                }
            }
            AlertPolicy::Flip(p) => {
                if p.lookback == 0 {
                    return Err(fail("flip lookback must be at least 1".into()));
                }
                if let FlipRule::EmaCross { fast, slow } = &p.rule {
                    if fast >= slow {
                        return Err(fail("ema cross requires fast < slow".into()));
                    }
                }
            }
            AlertPolicy::Correlation(p) => {
                if self.symbols.len() != 2 {
                    return Err(fail("correlation alerts require exactly 2 symbols".into()));
                }
                match &p.mode {
                    CorrelationMode::Threshold {
                        overbought,
                        oversold,
                        ..
                    } => {
                        if oversold >= overbought {
                            return Err(fail("oversold bound must be below overbought".into()));
                        }
                    }
                    CorrelationMode::Rolling { window, strong, weak, .. } => {
                        if *window < 3 {
                            return Err(fail("rolling window must be at least 3".into()));
                        }
                        if !(0.0..=1.0).contains(strong) || !(0.0..=1.0).contains(weak) {
                            return Err(fail("correlation bounds must be within 0-1".into()));
                        }
                        if weak > strong {
                            return Err(fail("weak bound must not exceed strong bound".into()));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }
}
