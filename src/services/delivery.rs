//! Trigger delivery interface.

use crate::models::trigger::TriggerEvent;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

/// Outbound channel for fired alerts. Delivery is fire-and-forget: an
/// implementation absorbs its own failures, the engine keeps no event
/// history and never retries.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, event: TriggerEvent);
}

/// Delivery that writes the event to the structured log.
#[derive(Default)]
pub struct LogDelivery;

#[async_trait]
impl DeliveryChannel for LogDelivery {
    async fn deliver(&self, event: TriggerEvent) {
        info!(
            alert_id = event.alert_id,
            symbol = %event.symbol,
            timeframe = %event.timeframe.as_str(),
            condition = %event.condition,
            "alert triggered"
        );
    }
}

/// Collects events for assertions in tests.
#[derive(Default)]
pub struct CollectingDelivery {
    events: Mutex<Vec<TriggerEvent>>,
}

impl CollectingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn take(&self) -> Vec<TriggerEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl DeliveryChannel for CollectingDelivery {
    async fn deliver(&self, event: TriggerEvent) {
        self.events.lock().await.push(event);
    }
}
