//! Engine configuration.
//!
//! Weight tables for composite scoring are configuration data: the
//! `scalper` and `swing` presets ship as defaults and can be replaced
//! wholesale through `WEIGHT_PROFILES_JSON`.

use crate::models::bar::Timeframe;
use crate::models::indicator::IndicatorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Deployment environment, read from `ENVIRONMENT` (default "sandbox").
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

/// Named weight table selected by a threshold alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStyle {
    Scalper,
    #[default]
    Swing,
}

/// Indicators that contribute a cell to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreIndicator {
    Rsi,
    Macd,
    EmaCross,
    TrendStop,
    Cloud,
}

impl ScoreIndicator {
    /// Momentum-sensitive cells are damped in quiet markets.
    pub fn is_momentum(&self) -> bool {
        matches!(self, ScoreIndicator::Rsi | ScoreIndicator::Macd)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreIndicator::Rsi => "rsi",
            ScoreIndicator::Macd => "macd",
            ScoreIndicator::EmaCross => "ema_cross",
            ScoreIndicator::TrendStop => "trend_stop",
            ScoreIndicator::Cloud => "cloud",
        }
    }
}

/// One style's timeframe and indicator weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightProfile {
    pub timeframe_weights: HashMap<Timeframe, f64>,
    pub indicator_weights: HashMap<ScoreIndicator, f64>,
}

impl WeightProfile {
    pub fn timeframe_weight(&self, tf: Timeframe) -> f64 {
        self.timeframe_weights.get(&tf).copied().unwrap_or(1.0)
    }

    pub fn indicator_weight(&self, ind: ScoreIndicator) -> f64 {
        self.indicator_weights.get(&ind).copied().unwrap_or(1.0)
    }

    /// Short-timeframe-heavy preset.
    pub fn scalper() -> Self {
        Self {
            timeframe_weights: HashMap::from([
                (Timeframe::M1, 3.0),
                (Timeframe::M5, 2.5),
                (Timeframe::M15, 2.0),
                (Timeframe::M30, 1.5),
                (Timeframe::H1, 1.0),
                (Timeframe::H4, 0.5),
                (Timeframe::D1, 0.25),
            ]),
            indicator_weights: HashMap::from([
                (ScoreIndicator::Rsi, 1.25),
                (ScoreIndicator::Macd, 1.25),
                (ScoreIndicator::EmaCross, 1.0),
                (ScoreIndicator::TrendStop, 0.75),
                (ScoreIndicator::Cloud, 0.75),
            ]),
        }
    }

    /// Long-timeframe-heavy preset.
    pub fn swing() -> Self {
        Self {
            timeframe_weights: HashMap::from([
                (Timeframe::M1, 0.25),
                (Timeframe::M5, 0.5),
                (Timeframe::M15, 1.0),
                (Timeframe::M30, 1.5),
                (Timeframe::H1, 2.0),
                (Timeframe::H4, 2.5),
                (Timeframe::D1, 3.0),
            ]),
            indicator_weights: HashMap::from([
                (ScoreIndicator::Rsi, 1.0),
                (ScoreIndicator::Macd, 1.0),
                (ScoreIndicator::EmaCross, 1.0),
                (ScoreIndicator::TrendStop, 1.25),
                (ScoreIndicator::Cloud, 1.0),
            ]),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    /// Indicators computed for every (symbol, timeframe) key.
    pub indicators: Vec<IndicatorKind>,
    /// Closed bars requested from the provider per fetch.
    pub fetch_count: usize,
    pub fetch_timeout: Duration,
    /// Ring buffer capacity per indicator series.
    pub cache_capacity: usize,
    /// Poll cadence for bar fetches, in seconds.
    pub poll_interval_secs: u64,
    /// Coarse refresh cadence for alert definitions, in seconds.
    pub definitions_refresh_secs: u64,
    pub weight_profiles: HashMap<ScoringStyle, WeightProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC".to_string()],
            timeframes: vec![Timeframe::M5, Timeframe::M30, Timeframe::H1],
            indicators: IndicatorKind::default_set(),
            fetch_count: 250,
            fetch_timeout: Duration::from_secs(10),
            cache_capacity: 500,
            poll_interval_secs: 30,
            definitions_refresh_secs: 300,
            weight_profiles: default_profiles(),
        }
    }
}

fn default_profiles() -> HashMap<ScoringStyle, WeightProfile> {
    HashMap::from([
        (ScoringStyle::Scalper, WeightProfile::scalper()),
        (ScoringStyle::Swing, WeightProfile::swing()),
    ])
}

impl Config {
    /// Build from environment variables, falling back to defaults.
    ///
    /// `SYMBOLS` and `TIMEFRAMES` are comma-separated;
    /// `WEIGHT_PROFILES_JSON` replaces the preset weight tables.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(symbols) = env::var("SYMBOLS") {
            let parsed: Vec<String> = symbols
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.symbols = parsed;
            }
        }

        if let Ok(tfs) = env::var("TIMEFRAMES") {
            let parsed: Vec<Timeframe> = tfs
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if !parsed.is_empty() {
                config.timeframes = parsed;
            }
        }

        if let Some(v) = env_parse::<usize>("FETCH_COUNT") {
            config.fetch_count = v;
        }
        if let Some(v) = env_parse::<u64>("FETCH_TIMEOUT_SECONDS") {
            config.fetch_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("CACHE_CAPACITY") {
            config.cache_capacity = v;
        }
        if let Some(v) = env_parse::<u64>("POLL_INTERVAL_SECONDS") {
            config.poll_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("DEFINITIONS_REFRESH_SECONDS") {
            config.definitions_refresh_secs = v;
        }

        if let Ok(json) = env::var("WEIGHT_PROFILES_JSON") {
            match serde_json::from_str::<HashMap<ScoringStyle, WeightProfile>>(&json) {
                Ok(profiles) if !profiles.is_empty() => config.weight_profiles = profiles,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "ignoring malformed WEIGHT_PROFILES_JSON"),
            }
        }

        config
    }

    pub fn rsi_kind(&self) -> Option<IndicatorKind> {
        self.indicators
            .iter()
            .find(|k| matches!(k, IndicatorKind::Rsi { .. }))
            .copied()
    }

    pub fn macd_kind(&self) -> Option<IndicatorKind> {
        self.indicators
            .iter()
            .find(|k| matches!(k, IndicatorKind::Macd { .. }))
            .copied()
    }

    pub fn atr_kind(&self) -> Option<IndicatorKind> {
        self.indicators
            .iter()
            .find(|k| matches!(k, IndicatorKind::Atr { .. }))
            .copied()
    }

    pub fn ichimoku_kind(&self) -> Option<IndicatorKind> {
        self.indicators
            .iter()
            .find(|k| matches!(k, IndicatorKind::Ichimoku { .. }))
            .copied()
    }

    pub fn trend_stop_kind(&self) -> Option<IndicatorKind> {
        self.indicators
            .iter()
            .find(|k| matches!(k, IndicatorKind::TrendStop { .. }))
            .copied()
    }

    /// Fast and slow EMA kinds, by ascending period.
    pub fn ema_pair(&self) -> Option<(IndicatorKind, IndicatorKind)> {
        let mut periods: Vec<u32> = self
            .indicators
            .iter()
            .filter_map(|k| match k {
                IndicatorKind::Ema { period } => Some(*period),
                _ => None,
            })
            .collect();
        periods.sort_unstable();
        periods.dedup();
        if periods.len() < 2 {
            return None;
        }
        Some((
            IndicatorKind::Ema { period: periods[0] },
            IndicatorKind::Ema { period: periods[1] },
        ))
    }

    pub fn profile(&self, style: ScoringStyle) -> WeightProfile {
        self.weight_profiles
            .get(&style)
            .cloned()
            .unwrap_or_else(WeightProfile::swing)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
