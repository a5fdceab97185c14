//! Bar boundary detection.
//!
//! Converts polled fetches into discrete "new closed bar" events. Detection
//! is bar-time-based, not schedule-based, so a daily timeframe is detected
//! correctly even when the poll interval is seconds.

use crate::models::bar::{OhlcBar, Timeframe};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FeedKey {
    symbol: String,
    timeframe: Timeframe,
}

pub struct BarBoundaryDetector {
    last_open: RwLock<HashMap<FeedKey, DateTime<Utc>>>,
}

impl BarBoundaryDetector {
    pub fn new() -> Self {
        Self {
            last_open: RwLock::new(HashMap::new()),
        }
    }

    /// Inspect a fresh fetch and emit the newest closed bar if it is
    /// strictly newer than the last processed one for this key.
    ///
    /// An empty fetch (or one with no closed bars) mutates nothing and
    /// emits nothing. Replaying the same fetch emits nothing the second
    /// time.
    pub async fn detect(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[OhlcBar],
    ) -> Option<OhlcBar> {
        let newest = bars.iter().rev().find(|b| b.is_closed)?.clone();

        let key = FeedKey {
            symbol: symbol.to_string(),
            timeframe,
        };

        let mut last_open = self.last_open.write().await;
        match last_open.get(&key) {
            Some(&prev) if newest.open_time <= prev => None,
            _ => {
                last_open.insert(key, newest.open_time);
                Some(newest)
            }
        }
    }
}

impl Default for BarBoundaryDetector {
    fn default() -> Self {
        Self::new()
    }
}
