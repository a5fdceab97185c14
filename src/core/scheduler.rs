//! Cron-based tick scheduler.

use crate::errors::EngineError;
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Drives a repeating async tick on a fixed cadence. Each consumer of the
/// scheduler owns one instance per task; `stop` aborts the loop.
pub struct TickScheduler {
    name: String,
    schedule: Schedule,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl TickScheduler {
    /// Build a scheduler ticking every `interval_seconds`.
    ///
    /// Cron format is second-resolution: intervals below a minute use the
    /// seconds field, anything larger rounds to whole minutes.
    pub fn new(name: impl Into<String>, interval_seconds: u64) -> Result<Self, EngineError> {
        if interval_seconds == 0 {
            return Err(EngineError::Config(
                "scheduler interval must be greater than zero".to_string(),
            ));
        }

        let cron_expr = if interval_seconds >= 60 {
            format!("0 */{} * * * *", (interval_seconds / 60).max(1))
        } else {
            format!("*/{} * * * * *", interval_seconds)
        };
        let schedule = Schedule::from_str(&cron_expr)
            .map_err(|e| EngineError::Config(format!("bad cron expression {}: {}", cron_expr, e)))?;

        Ok(Self {
            name: name.into(),
            schedule,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Spawn the tick loop. The previous tick must have finished before
    /// the next fires; long ticks therefore stretch, never overlap, within
    /// one scheduler.
    pub async fn start<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let name = self.name.clone();
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!(scheduler = %name, "tick loop started");
            loop {
                let next = match schedule.upcoming(chrono::Utc).next() {
                    Some(t) => t,
                    None => {
                        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                        continue;
                    }
                };
                let now = chrono::Utc::now();
                if next > now {
                    if let Ok(wait) = (next - now).to_std() {
                        tokio::time::sleep(wait).await;
                    }
                }
                debug!(scheduler = %name, "tick");
                tick().await;
            }
        });

        *self.handle.write().await = Some(handle);
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.handle.write().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        assert!(TickScheduler::new("poll", 0).is_err());
    }

    #[test]
    fn interval_maps_to_cron_fields() {
        assert!(TickScheduler::new("poll", 30).is_ok());
        assert!(TickScheduler::new("refresh", 300).is_ok());
    }
}
