//! Trigger events handed to the delivery collaborator.

use crate::models::bar::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a fired alert side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSide {
    Buy,
    Sell,
}

impl TriggerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSide::Buy => "buy",
            TriggerSide::Sell => "sell",
        }
    }
}

/// One fired alert. Constructed, handed to delivery, and discarded; the
/// engine keeps no history of emitted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub alert_id: i64,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Human-readable condition label, e.g. `strength_cross_buy` or
    /// `ema_cross_12_26`.
    pub condition: String,
    /// Snapshot of the metric values that produced the decision.
    pub metrics: serde_json::Value,
    pub fired_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(
        alert_id: i64,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        condition: impl Into<String>,
        metrics: serde_json::Value,
    ) -> Self {
        Self {
            alert_id,
            symbol: symbol.into(),
            timeframe,
            condition: condition.into(),
            metrics,
            fired_at: Utc::now(),
        }
    }
}
