//! Engine runtime: wires the caches, pipeline and schedulers together.

use crate::cache::{BarHistory, IndicatorCache};
use crate::config::Config;
use crate::errors::EngineError;
use crate::evaluators::AlertEvaluator;
use crate::metrics::Metrics;
use crate::models::alert::AlertDefinition;
use crate::pipeline::{BarBoundaryDetector, CycleRunner, KeyedLocks};
use crate::services::{BroadcastTransport, ConfigurationStore, DeliveryChannel, MarketDataProvider};
use crate::state::AlertStateStore;
use super::scheduler::TickScheduler;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Owns every long-lived component and the per-key tick tasks.
///
/// One poll scheduler runs per (symbol, timeframe) key, plus one coarse
/// scheduler that refreshes the cached alert definition set.
pub struct EngineRuntime {
    config: Arc<Config>,
    runner: Arc<CycleRunner>,
    store: Arc<dyn ConfigurationStore>,
    states: Arc<AlertStateStore>,
    definitions: Arc<RwLock<Arc<Vec<AlertDefinition>>>>,
    schedulers: RwLock<Vec<TickScheduler>>,
}

impl EngineRuntime {
    pub fn new(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn ConfigurationStore>,
        delivery: Arc<dyn DeliveryChannel>,
        broadcast: Arc<dyn BroadcastTransport>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(IndicatorCache::new(config.cache_capacity));
        let history = Arc::new(BarHistory::new(config.cache_capacity));
        let states = Arc::new(AlertStateStore::new());
        let evaluator = Arc::new(AlertEvaluator::new(
            cache.clone(),
            history.clone(),
            states.clone(),
            config.clone(),
            metrics.clone(),
        ));
        let runner = Arc::new(CycleRunner::new(
            provider,
            history,
            cache,
            Arc::new(BarBoundaryDetector::new()),
            Arc::new(KeyedLocks::new()),
            evaluator,
            delivery,
            broadcast,
            config.clone(),
            metrics,
        ));

        Self {
            config,
            runner,
            store,
            states,
            definitions: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            schedulers: RwLock::new(Vec::new()),
        }
    }

    /// Load definitions, then start the per-key poll loops and the
    /// definitions refresh loop.
    pub async fn start(&self) -> Result<(), EngineError> {
        self.refresh_definitions().await;

        let mut schedulers = self.schedulers.write().await;

        for symbol in &self.config.symbols {
            for &timeframe in &self.config.timeframes {
                let name = format!("poll:{}:{}", symbol, timeframe.as_str());
                let scheduler = TickScheduler::new(&name, self.config.poll_interval_secs)?;

                let runner = self.runner.clone();
                let definitions = self.definitions.clone();
                let symbol = symbol.clone();
                scheduler
                    .start(move || {
                        let runner = runner.clone();
                        let definitions = definitions.clone();
                        let symbol = symbol.clone();
                        async move {
                            let defs = definitions.read().await.clone();
                            runner.run_cycle(&symbol, timeframe, &defs).await;
                        }
                    })
                    .await;
                schedulers.push(scheduler);
            }
        }

        let refresh = TickScheduler::new("definitions-refresh", self.config.definitions_refresh_secs)?;
        let store = self.store.clone();
        let states = self.states.clone();
        let definitions = self.definitions.clone();
        refresh
            .start(move || {
                let store = store.clone();
                let states = states.clone();
                let definitions = definitions.clone();
                async move {
                    refresh_from_store(&*store, &states, &definitions).await;
                }
            })
            .await;
        schedulers.push(refresh);

        info!(
            symbols = self.config.symbols.len(),
            timeframes = self.config.timeframes.len(),
            "engine runtime started"
        );
        Ok(())
    }

    /// One coarse refresh pass, also used at startup.
    pub async fn refresh_definitions(&self) {
        refresh_from_store(&*self.store, &self.states, &self.definitions).await;
    }

    /// The definition set currently used for evaluation.
    pub async fn active_definitions(&self) -> Arc<Vec<AlertDefinition>> {
        self.definitions.read().await.clone()
    }

    pub async fn stop(&self) {
        let schedulers = self.schedulers.write().await;
        for scheduler in schedulers.iter() {
            scheduler.stop().await;
        }
        info!("engine runtime stopped");
    }
}

/// Pull the definition set, drop what fails validation, swap the shared
/// snapshot and prune runtime state for vanished alerts.
async fn refresh_from_store(
    store: &dyn ConfigurationStore,
    states: &AlertStateStore,
    definitions: &RwLock<Arc<Vec<AlertDefinition>>>,
) {
    let fetched = match store.list_active_alert_definitions().await {
        Ok(defs) => defs,
        Err(err) => {
            // Keep evaluating against the previous snapshot.
            warn!(error = %err, "definition refresh failed, keeping current set");
            return;
        }
    };

    let mut active = Vec::with_capacity(fetched.len());
    for def in fetched {
        if !def.enabled {
            continue;
        }
        match def.validate() {
            Ok(()) => active.push(def),
            Err(err) => warn!(error = %err, "rejecting alert definition"),
        }
    }

    let ids: HashSet<i64> = active.iter().map(|d| d.id).collect();
    *definitions.write().await = Arc::new(active);
    states.retain_alerts(&ids).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::{AlertPolicy, ThresholdPolicy};
    use crate::models::bar::Timeframe;
    use crate::services::{InMemoryConfigStore, InMemoryMarketData, LogBroadcast, LogDelivery};

    fn definition(id: i64, enabled: bool) -> AlertDefinition {
        AlertDefinition {
            id,
            owner: "tests".to_string(),
            symbols: vec!["EURUSD".to_string()],
            timeframes: vec![Timeframe::M30],
            policy: AlertPolicy::Threshold(ThresholdPolicy {
                buy_min: 70.0,
                sell_max: 30.0,
                margin: 5.0,
                min_alignment: None,
                style: Default::default(),
            }),
            cooldown_secs: 0,
            enabled,
        }
    }

    fn runtime(store: Arc<InMemoryConfigStore>) -> EngineRuntime {
        EngineRuntime::new(
            Config::default(),
            Arc::new(InMemoryMarketData::new()),
            store,
            Arc::new(LogDelivery),
            Arc::new(LogBroadcast),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn refresh_swaps_validated_enabled_set() {
        let store = Arc::new(InMemoryConfigStore::new());
        store
            .set_definitions(vec![definition(1, true), definition(2, false)])
            .await;

        let runtime = runtime(store.clone());
        runtime.refresh_definitions().await;
        let active = runtime.active_definitions().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);

        // Invalid definitions are dropped, not fatal.
        let mut bad = definition(3, true);
        bad.symbols.clear();
        store.set_definitions(vec![definition(1, true), bad]).await;
        runtime.refresh_definitions().await;
        assert_eq!(runtime.active_definitions().await.len(), 1);
    }

    #[tokio::test]
    async fn refresh_prunes_state_of_vanished_alerts() {
        let store = Arc::new(InMemoryConfigStore::new());
        store.set_definitions(vec![definition(1, true)]).await;
        let runtime = runtime(store.clone());
        runtime.refresh_definitions().await;

        runtime
            .states
            .with_state(
                crate::state::StateKey::new(1, "EURUSD", Timeframe::M30),
                |s| s.last_value = Some(55.0),
            )
            .await;
        assert_eq!(runtime.states.len().await, 1);

        store.set_definitions(Vec::new()).await;
        runtime.refresh_definitions().await;
        assert_eq!(runtime.states.len().await, 0);
    }
}
