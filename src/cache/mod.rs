//! Indicator cache: bounded per-key ring buffers of computed samples.
//!
//! The single source of truth for indicator values. Writes happen only on
//! a bar-closed event under the owning key's lock; reads return owned
//! snapshots so consumers never hold the map lock across their own work.

pub mod bars;

pub use bars::BarHistory;

use crate::models::indicator::{CacheKey, IndicatorSample};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

pub const DEFAULT_CAPACITY: usize = 500;

pub struct IndicatorCache {
    capacity: usize,
    series: RwLock<HashMap<CacheKey, VecDeque<IndicatorSample>>>,
}

impl IndicatorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Append one sample for a key, evicting the oldest when full.
    ///
    /// Idempotent per bar: a sample whose `bar_time` is not strictly newer
    /// than the newest stored sample is a no-op. Returns whether the
    /// sample was appended.
    pub async fn append(&self, key: CacheKey, sample: IndicatorSample) -> bool {
        let mut map = self.series.write().await;
        let buf = map.entry(key).or_default();

        if let Some(newest) = buf.back() {
            if sample.bar_time <= newest.bar_time {
                return false;
            }
        }

        buf.push_back(sample);
        while buf.len() > self.capacity {
            buf.pop_front();
        }
        true
    }

    /// Most recent sample for a key.
    pub async fn latest(&self, key: &CacheKey) -> Option<IndicatorSample> {
        let map = self.series.read().await;
        map.get(key).and_then(|buf| buf.back().cloned())
    }

    /// Sample `n` bars back from the newest (`n = 0` is the newest).
    pub async fn nth_back(&self, key: &CacheKey, n: usize) -> Option<IndicatorSample> {
        let map = self.series.read().await;
        let buf = map.get(key)?;
        if n >= buf.len() {
            return None;
        }
        buf.get(buf.len() - 1 - n).cloned()
    }

    /// Full window snapshot, oldest to newest.
    pub async fn window(&self, key: &CacheKey) -> Vec<IndicatorSample> {
        let map = self.series.read().await;
        map.get(key)
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of cached samples for a key.
    pub async fn len(&self, key: &CacheKey) -> usize {
        let map = self.series.read().await;
        map.get(key).map(|buf| buf.len()).unwrap_or(0)
    }
}

impl Default for IndicatorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
