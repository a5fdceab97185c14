//! Full-pipeline scenarios: provider fetch, boundary detection, indicator
//! caching and alert evaluation driven one closed bar at a time.

use barsentry::cache::{BarHistory, IndicatorCache};
use barsentry::config::Config;
use barsentry::evaluators::AlertEvaluator;
use barsentry::metrics::Metrics;
use barsentry::models::alert::{AlertDefinition, AlertPolicy, FlipPolicy, FlipRule};
use barsentry::models::bar::{OhlcBar, Timeframe};
use barsentry::models::indicator::IndicatorKind;
use barsentry::pipeline::{BarBoundaryDetector, CycleRunner, KeyedLocks};
use barsentry::services::broadcast::ChannelBroadcast;
use barsentry::services::delivery::CollectingDelivery;
use barsentry::services::InMemoryMarketData;
use barsentry::state::AlertStateStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

struct Harness {
    provider: Arc<InMemoryMarketData>,
    delivery: Arc<CollectingDelivery>,
    broadcast: Arc<ChannelBroadcast>,
    runner: CycleRunner,
}

fn harness() -> Harness {
    let provider = Arc::new(InMemoryMarketData::new());
    let delivery = Arc::new(CollectingDelivery::new());
    let broadcast = Arc::new(ChannelBroadcast::new(16));
    let config = Arc::new(Config {
        symbols: vec!["USDCAD".to_string()],
        timeframes: vec![Timeframe::M30],
        indicators: vec![IndicatorKind::Rsi { period: 14 }],
        ..Config::default()
    });
    let cache = Arc::new(IndicatorCache::new(config.cache_capacity));
    let history = Arc::new(BarHistory::new(config.cache_capacity));
    let metrics = Arc::new(Metrics::new().unwrap());
    let evaluator = Arc::new(AlertEvaluator::new(
        cache.clone(),
        history.clone(),
        Arc::new(AlertStateStore::new()),
        config.clone(),
        metrics.clone(),
    ));
    let runner = CycleRunner::new(
        provider.clone(),
        history,
        cache,
        Arc::new(BarBoundaryDetector::new()),
        Arc::new(KeyedLocks::new()),
        evaluator,
        delivery.clone(),
        broadcast.clone(),
        config,
        metrics,
    );
    Harness {
        provider,
        delivery,
        broadcast,
        runner,
    }
}

fn flip_alert() -> AlertDefinition {
    AlertDefinition {
        id: 1,
        owner: "tests".to_string(),
        symbols: vec!["USDCAD".to_string()],
        timeframes: vec![Timeframe::M30],
        policy: AlertPolicy::Flip(FlipPolicy {
            rule: FlipRule::EmaCross { fast: 2, slow: 3 },
            lookback: 3,
            secondary_gate: None,
        }),
        cooldown_secs: 0,
        enabled: true,
    }
}

fn bar_at(open_time: DateTime<Utc>, close: f64) -> OhlcBar {
    OhlcBar::new(
        "USDCAD",
        Timeframe::M30,
        open_time,
        close,
        close + 0.002,
        close - 0.002,
        close,
        1000.0,
    )
}

/// Twenty declining closes followed by a sharp recovery; the 2/3 EMA pair
/// crosses upward on the first recovery bar.
fn scripted_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..20).map(|i| 2.0 - 0.01 * i as f64).collect();
    closes.extend([1.90, 1.95, 2.00]);
    closes
}

/// Open times ending `offset` before now, one bar per 30 minutes.
fn open_times(count: usize, offset: Duration) -> Vec<DateTime<Utc>> {
    let newest = Utc::now() - offset;
    (0..count)
        .map(|i| newest - Duration::minutes(30 * (count - 1 - i) as i64))
        .collect()
}

#[tokio::test]
async fn flip_fires_once_after_one_confirming_bar() {
    let h = harness();
    let alert = flip_alert();
    let closes = scripted_closes();
    // Anchor the series ending in the near future so no cycle's newest bar
    // trips the 2x-timeframe staleness gate.
    let times = open_times(closes.len(), Duration::minutes(-90));

    // Warm history: seeds the flip state in the downtrend.
    let warm: Vec<OhlcBar> = (0..20).map(|i| bar_at(times[i], closes[i])).collect();
    h.provider
        .set_bars("USDCAD", Timeframe::M30, warm)
        .await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    assert_eq!(h.delivery.len().await, 0);

    // Flip bar closes: not yet persisted, no trigger.
    h.provider.push_bar(bar_at(times[20], closes[20])).await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    assert_eq!(h.delivery.len().await, 0);

    // One confirming bar later the flip fires.
    h.provider.push_bar(bar_at(times[21], closes[21])).await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    let events = h.delivery.take().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].condition, "ema_cross_2_3_buy");
    assert_eq!(events[0].symbol, "USDCAD");

    // The same regime persisting never re-fires.
    h.provider.push_bar(bar_at(times[22], closes[22])).await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    assert_eq!(h.delivery.len().await, 0);
}

#[tokio::test]
async fn each_closed_bar_broadcasts_one_snapshot() {
    let h = harness();
    let mut rx = h.broadcast.subscribe();
    let closes = scripted_closes();
    let times = open_times(closes.len(), Duration::minutes(30));

    let warm: Vec<OhlcBar> = (0..20).map(|i| bar_at(times[i], closes[i])).collect();
    h.provider.set_bars("USDCAD", Timeframe::M30, warm).await;
    h.runner.run_cycle("USDCAD", Timeframe::M30, &[]).await;

    let snapshot = rx.try_recv().unwrap();
    assert_eq!(snapshot.symbol, "USDCAD");
    assert_eq!(snapshot.timeframe, Timeframe::M30);
    assert_eq!(snapshot.bar_time, times[19].timestamp_millis());
    assert!(snapshot.indicators.contains_key("rsi_14"));

    let wire = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(wire["timeframe"], "30m");
    assert_eq!(wire["bar_time"], serde_json::json!(times[19].timestamp_millis()));

    // Replaying the same fetch crosses no boundary and publishes nothing.
    h.runner.run_cycle("USDCAD", Timeframe::M30, &[]).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn replaying_the_same_fetch_is_idempotent() {
    let h = harness();
    let alert = flip_alert();
    let closes = scripted_closes();
    // Anchor in the near future to stay inside the staleness window.
    let times = open_times(closes.len(), Duration::minutes(-90));

    let warm: Vec<OhlcBar> = (0..20).map(|i| bar_at(times[i], closes[i])).collect();
    h.provider.set_bars("USDCAD", Timeframe::M30, warm).await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;

    for i in 20..22 {
        h.provider.push_bar(bar_at(times[i], closes[i])).await;
        h.runner
            .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
            .await;
    }
    assert_eq!(h.delivery.len().await, 1);

    // Same data fetched twice more: no new boundary, no duplicate trigger.
    for _ in 0..2 {
        h.runner
            .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
            .await;
    }
    assert_eq!(h.delivery.len().await, 1);
}

#[tokio::test]
async fn stale_feed_suppresses_evaluation() {
    let h = harness();
    let alert = flip_alert();
    let closes = scripted_closes();
    // Entire feed a day old: boundaries still advance, evaluation does not.
    let times = open_times(closes.len(), Duration::days(1));

    let warm: Vec<OhlcBar> = (0..20).map(|i| bar_at(times[i], closes[i])).collect();
    h.provider.set_bars("USDCAD", Timeframe::M30, warm).await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    for i in 20..closes.len() {
        h.provider.push_bar(bar_at(times[i], closes[i])).await;
        h.runner
            .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
            .await;
    }
    assert_eq!(h.delivery.len().await, 0);
}

#[tokio::test]
async fn warmup_suppresses_until_enough_bars() {
    let h = harness();
    let alert = flip_alert();
    let times = open_times(2, Duration::minutes(30));

    // Two closed bars cannot seed a 2/3 EMA pair.
    h.provider
        .set_bars(
            "USDCAD",
            Timeframe::M30,
            vec![bar_at(times[0], 1.40), bar_at(times[1], 1.41)],
        )
        .await;
    h.runner
        .run_cycle("USDCAD", Timeframe::M30, std::slice::from_ref(&alert))
        .await;
    assert_eq!(h.delivery.len().await, 0);
}
