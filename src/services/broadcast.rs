//! Indicator snapshot broadcast interface.

use crate::models::indicator::IndicatorSnapshot;
use async_trait::async_trait;
use tracing::debug;

/// Outbound fan-out for per-bar indicator snapshots, published once per
/// closed bar after the cache write. Best effort: a slow or absent
/// consumer never blocks the pipeline.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    async fn publish(&self, snapshot: IndicatorSnapshot);
}

/// Transport that logs the snapshot at debug level.
#[derive(Default)]
pub struct LogBroadcast;

#[async_trait]
impl BroadcastTransport for LogBroadcast {
    async fn publish(&self, snapshot: IndicatorSnapshot) {
        debug!(
            symbol = %snapshot.symbol,
            timeframe = %snapshot.timeframe.as_str(),
            bar_time = snapshot.bar_time,
            indicators = snapshot.indicators.len(),
            "indicator snapshot"
        );
    }
}

/// Transport backed by a tokio broadcast channel. Lagging receivers drop
/// messages rather than apply backpressure.
pub struct ChannelBroadcast {
    sender: tokio::sync::broadcast::Sender<IndicatorSnapshot>,
}

impl ChannelBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<IndicatorSnapshot> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl BroadcastTransport for ChannelBroadcast {
    async fn publish(&self, snapshot: IndicatorSnapshot) {
        // Err means no live receivers, which is fine for best effort.
        let _ = self.sender.send(snapshot);
    }
}
