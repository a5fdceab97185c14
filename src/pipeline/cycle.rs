//! One evaluation cycle for one (symbol, timeframe) key.
//!
//! The cycle is poll-driven but bar-gated: every tick fetches, yet
//! indicator computation, cache writes, broadcast and alert evaluation
//! happen only when the fetch reveals a newly closed bar. Any upstream
//! failure leaves cache and state untouched; the next tick retries from
//! scratch.

use crate::cache::{BarHistory, IndicatorCache};
use crate::config::Config;
use crate::errors::SkipReason;
use crate::evaluators::AlertEvaluator;
use crate::indicators;
use crate::metrics::Metrics;
use crate::models::alert::AlertDefinition;
use crate::models::bar::Timeframe;
use crate::models::indicator::{CacheKey, IndicatorSample, IndicatorSnapshot};
use crate::pipeline::boundary::BarBoundaryDetector;
use crate::pipeline::locks::KeyedLocks;
use crate::services::{BroadcastTransport, DeliveryChannel, MarketDataProvider};
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CycleRunner {
    provider: Arc<dyn MarketDataProvider>,
    history: Arc<BarHistory>,
    cache: Arc<IndicatorCache>,
    boundary: Arc<BarBoundaryDetector>,
    locks: Arc<KeyedLocks>,
    evaluator: Arc<AlertEvaluator>,
    delivery: Arc<dyn DeliveryChannel>,
    broadcast: Arc<dyn BroadcastTransport>,
    config: Arc<Config>,
    metrics: Arc<Metrics>,
}

impl CycleRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        history: Arc<BarHistory>,
        cache: Arc<IndicatorCache>,
        boundary: Arc<BarBoundaryDetector>,
        locks: Arc<KeyedLocks>,
        evaluator: Arc<AlertEvaluator>,
        delivery: Arc<dyn DeliveryChannel>,
        broadcast: Arc<dyn BroadcastTransport>,
        config: Arc<Config>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            provider,
            history,
            cache,
            boundary,
            locks,
            evaluator,
            delivery,
            broadcast,
            config,
            metrics,
        }
    }

    /// Run one tick for a key. Skips without queueing when a previous
    /// tick for the same key is still in flight.
    pub async fn run_cycle(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        definitions: &[AlertDefinition],
    ) {
        let lock_key = format!("{}:{}", symbol, timeframe.as_str());
        let _guard = match self.locks.try_acquire(&lock_key).await {
            Some(guard) => guard,
            None => {
                debug!(key = %lock_key, "previous cycle still running, skipping tick");
                self.metrics.record_skip(SkipReason::LockBusy.as_str());
                return;
            }
        };

        let timer = self.metrics.cycle_duration_seconds.start_timer();

        let fetched = match tokio::time::timeout(
            self.config.fetch_timeout,
            self.provider
                .fetch_closed_bars(symbol, timeframe, self.config.fetch_count),
        )
        .await
        {
            Ok(Ok(bars)) => bars,
            Ok(Err(err)) => {
                warn!(key = %lock_key, error = %err, "bar fetch failed");
                self.metrics.cycles_errored_total.inc();
                timer.observe_duration();
                return;
            }
            Err(_) => {
                warn!(key = %lock_key, "bar fetch timed out");
                self.metrics.cycles_errored_total.inc();
                timer.observe_duration();
                return;
            }
        };

        self.history.update(symbol, timeframe, &fetched).await;

        let closed = match self.boundary.detect(symbol, timeframe, &fetched).await {
            Some(bar) => bar,
            None => {
                self.metrics.record_skip(SkipReason::NoNewBar.as_str());
                timer.observe_duration();
                return;
            }
        };

        debug!(
            key = %lock_key,
            open_time = %closed.open_time,
            close = closed.close,
            "new closed bar"
        );

        let bars = self.history.window(symbol, timeframe).await;
        let mut snapshot = IndicatorSnapshot::new(symbol, timeframe, closed.open_time);

        for kind in &self.config.indicators {
            let value = match indicators::compute(kind, &bars) {
                Some(value) => value,
                None => continue, // not enough bars yet for this kind
            };
            let appended = self
                .cache
                .append(
                    CacheKey::new(symbol, timeframe, *kind),
                    IndicatorSample {
                        bar_time: closed.open_time,
                        value: value.clone(),
                    },
                )
                .await;
            if appended {
                self.metrics.samples_cached_total.inc();
            }
            snapshot.insert(kind, &value);
        }

        if !snapshot.indicators.is_empty() {
            self.broadcast.publish(snapshot).await;
        }

        let events = self
            .evaluator
            .evaluate(definitions, symbol, timeframe, Utc::now())
            .await;
        join_all(
            events
                .into_iter()
                .map(|event| self.delivery.deliver(event)),
        )
        .await;

        self.metrics.cycles_processed_total.inc();
        timer.observe_duration();
    }
}
