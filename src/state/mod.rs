//! Alert runtime state store.
//!
//! One record per (alert, symbol, timeframe[, facet]) for the lifetime of
//! the process. Per side the machine is armed -> triggered (disarm
//! immediately) -> re-armed once the metric crosses back past the
//! hysteresis margin. The first evaluation after an alert becomes active
//! seeds a baseline and fires nothing.

use crate::models::bar::Timeframe;
use crate::models::trigger::TriggerSide;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Identity of one runtime-state record. `facet` disambiguates records a
/// single alert keeps per side-or-indicator (flip rule label, pair label).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub alert_id: i64,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub facet: Option<String>,
}

impl StateKey {
    pub fn new(alert_id: i64, symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            alert_id,
            symbol: symbol.into(),
            timeframe,
            facet: None,
        }
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facet = Some(facet.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AlertRuntimeState {
    pub last_value: Option<f64>,
    pub armed_buy: bool,
    pub armed_sell: bool,
    pub last_trigger: Option<DateTime<Utc>>,
    /// Family-specific label: flip regime, correlation classification.
    pub last_status: Option<String>,
}

impl Default for AlertRuntimeState {
    fn default() -> Self {
        Self {
            last_value: None,
            armed_buy: true,
            armed_sell: true,
            last_trigger: None,
            last_status: None,
        }
    }
}

impl AlertRuntimeState {
    /// Whether the record has seen at least one evaluation.
    pub fn is_seeded(&self) -> bool {
        self.last_value.is_some() || self.last_status.is_some()
    }

    pub fn is_armed(&self, side: TriggerSide) -> bool {
        match side {
            TriggerSide::Buy => self.armed_buy,
            TriggerSide::Sell => self.armed_sell,
        }
    }

    pub fn set_armed(&mut self, side: TriggerSide, armed: bool) {
        match side {
            TriggerSide::Buy => self.armed_buy = armed,
            TriggerSide::Sell => self.armed_sell = armed,
        }
    }

    /// Disarm the side and stamp the trigger time.
    pub fn record_trigger(&mut self, side: TriggerSide, at: DateTime<Utc>) {
        self.set_armed(side, false);
        self.last_trigger = Some(at);
    }

    /// Uniform time floor between triggers, independent of per-family
    /// re-arm discipline. A zero cooldown always passes.
    pub fn cooldown_elapsed(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        match self.last_trigger {
            Some(last) => now - last >= cooldown,
            None => true,
        }
    }
}

pub struct AlertStateStore {
    records: RwLock<HashMap<StateKey, AlertRuntimeState>>,
}

impl AlertStateStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` with mutable access to the record for `key`, creating it
    /// lazily (unseeded, both sides armed) on first use.
    pub async fn with_state<R>(
        &self,
        key: StateKey,
        f: impl FnOnce(&mut AlertRuntimeState) -> R,
    ) -> R {
        let mut records = self.records.write().await;
        f(records.entry(key).or_default())
    }

    /// Snapshot of one record.
    pub async fn get(&self, key: &StateKey) -> Option<AlertRuntimeState> {
        let records = self.records.read().await;
        records.get(key).cloned()
    }

    /// Drop records belonging to alerts that are no longer active.
    pub async fn retain_alerts(&self, active_ids: &HashSet<i64>) {
        let mut records = self.records.write().await;
        records.retain(|key, _| active_ids.contains(&key.alert_id));
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for AlertStateStore {
    fn default() -> Self {
        Self::new()
    }
}
