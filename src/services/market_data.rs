//! Market data provider interface.

use crate::errors::ProviderError;
use crate::models::bar::{OhlcBar, Timeframe};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Source of closed OHLC bars. Implementations own their transport,
/// retries and parsing; the pipeline only sees bars or a typed error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent bars for a key, oldest to newest. The newest element
    /// may be a still-forming bar; callers must check `is_closed`.
    async fn fetch_closed_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<OhlcBar>, ProviderError>;
}

/// Scripted provider used by tests and local runs. Bars are pushed in
/// ahead of time and served back per key.
#[derive(Default)]
pub struct InMemoryMarketData {
    bars: RwLock<HashMap<(String, Timeframe), Vec<OhlcBar>>>,
    fail: RwLock<bool>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_bar(&self, bar: OhlcBar) {
        let mut map = self.bars.write().await;
        map.entry((bar.symbol.clone(), bar.timeframe))
            .or_default()
            .push(bar);
    }

    pub async fn set_bars(&self, symbol: &str, timeframe: Timeframe, bars: Vec<OhlcBar>) {
        let mut map = self.bars.write().await;
        map.insert((symbol.to_string(), timeframe), bars);
    }

    /// Make every subsequent fetch fail with `ProviderError::Unavailable`.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail.write().await = failing;
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    async fn fetch_closed_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<OhlcBar>, ProviderError> {
        if *self.fail.read().await {
            return Err(ProviderError::Unavailable("scripted failure".to_string()));
        }
        let map = self.bars.read().await;
        let bars = map
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default();
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }
}
