//! Trailing closed-bar history per (symbol, timeframe) feed.
//!
//! Holds the most recent provider fetch so evaluators can read closes and
//! peer-symbol bars without re-fetching. Indicator values are never derived
//! from this store by consumers; that is the indicator cache's job.

use crate::models::bar::{OhlcBar, Timeframe};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

pub struct BarHistory {
    capacity: usize,
    bars: RwLock<HashMap<(String, Timeframe), VecDeque<OhlcBar>>>,
}

impl BarHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            bars: RwLock::new(HashMap::new()),
        }
    }

    /// Merge a fetch of closed bars, keyed and deduplicated by open time.
    pub async fn update(&self, symbol: &str, timeframe: Timeframe, fetched: &[OhlcBar]) {
        let mut map = self.bars.write().await;
        let buf = map
            .entry((symbol.to_string(), timeframe))
            .or_insert_with(VecDeque::new);

        for bar in fetched.iter().filter(|b| b.is_closed) {
            match buf.back() {
                Some(last) if bar.open_time <= last.open_time => {
                    // Already have this bar (or an older one out of order).
                }
                _ => buf.push_back(bar.clone()),
            }
        }
        while buf.len() > self.capacity {
            buf.pop_front();
        }
    }

    /// Snapshot of the stored closed bars, oldest to newest.
    pub async fn window(&self, symbol: &str, timeframe: Timeframe) -> Vec<OhlcBar> {
        let map = self.bars.read().await;
        map.get(&(symbol.to_string(), timeframe))
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Newest stored closed bar.
    pub async fn latest(&self, symbol: &str, timeframe: Timeframe) -> Option<OhlcBar> {
        let map = self.bars.read().await;
        map.get(&(symbol.to_string(), timeframe))
            .and_then(|buf| buf.back().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn bar(ts: i64) -> OhlcBar {
        OhlcBar::new(
            "EURUSD",
            Timeframe::M5,
            DateTime::from_timestamp(ts, 0).unwrap(),
            1.0,
            1.1,
            0.9,
            1.05,
            100.0,
        )
    }

    #[tokio::test]
    async fn update_dedups_by_open_time() {
        let history = BarHistory::new(10);
        history
            .update("EURUSD", Timeframe::M5, &[bar(0), bar(300)])
            .await;
        history
            .update("EURUSD", Timeframe::M5, &[bar(300), bar(600)])
            .await;
        let window = history.window("EURUSD", Timeframe::M5).await;
        assert_eq!(window.len(), 3);
        assert_eq!(
            history.latest("EURUSD", Timeframe::M5).await.unwrap().open_time,
            DateTime::from_timestamp(600, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn forming_bars_are_ignored() {
        let history = BarHistory::new(10);
        history
            .update("EURUSD", Timeframe::M5, &[bar(0), bar(300).forming()])
            .await;
        assert_eq!(history.window("EURUSD", Timeframe::M5).await.len(), 1);
    }

    #[tokio::test]
    async fn bounded_capacity() {
        let history = BarHistory::new(2);
        history
            .update("EURUSD", Timeframe::M5, &[bar(0), bar(300), bar(600)])
            .await;
        let window = history.window("EURUSD", Timeframe::M5).await;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].open_time, DateTime::from_timestamp(300, 0).unwrap());
    }
}
