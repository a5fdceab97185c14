//! Error taxonomy.
//!
//! Real failures (`ProviderError`, `DefinitionError`) are typed errors;
//! the various per-cycle skip conditions are deliberately *not* errors and
//! travel as `SkipReason` so they are never propagated as failures.

use thiserror::Error;

/// Market data provider failures. Treated identically to "no new data"
/// for the affected cycle; the scheduler retries at the next tick.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("provider returned malformed data: {0}")]
    MalformedData(String),
}

/// Alert definition failures, rejected at load time.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("invalid alert definition {id}: {reason}")]
    Invalid { id: i64, reason: String },
    #[error("configuration store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Top-level engine failures (startup, configuration).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Why a cycle or evaluation was skipped. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not enough closed bars for the indicator's warm-up.
    WarmupIncomplete,
    /// Newest closed bar is older than 2x the timeframe duration.
    StaleData,
    /// Another cycle holds this key's lock; skipped, not queued.
    LockBusy,
    /// Fetch succeeded but produced no strictly newer closed bar.
    NoNewBar,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::WarmupIncomplete => "warmup_incomplete",
            SkipReason::StaleData => "stale_data",
            SkipReason::LockBusy => "lock_busy",
            SkipReason::NoNewBar => "no_new_bar",
        }
    }
}
