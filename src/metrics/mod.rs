//! Prometheus metrics for cycle observability.
//!
//! Per-cycle outcomes are counted rather than re-raised: a failure on one
//! key never aborts any other key, so counters are the only place a single
//! bad cycle is visible.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    /// Cycles that ran to completion (whether or not a new bar appeared).
    pub cycles_processed_total: IntCounter,
    /// Cycles skipped, labelled by skip reason.
    pub cycles_skipped_total: IntCounterVec,
    /// Cycles that hit a provider failure.
    pub cycles_errored_total: IntCounter,
    /// Indicator samples appended to the cache.
    pub samples_cached_total: IntCounter,
    /// Trigger events handed to the delivery channel.
    pub triggers_emitted_total: IntCounterVec,
    /// Alert evaluations skipped by gating, labelled by reason.
    pub evaluations_skipped_total: IntCounterVec,
    pub cycle_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles_processed_total = IntCounter::with_opts(Opts::new(
            "barsentry_cycles_processed_total",
            "Evaluation cycles completed",
        ))?;
        let cycles_skipped_total = IntCounterVec::new(
            Opts::new("barsentry_cycles_skipped_total", "Evaluation cycles skipped"),
            &["reason"],
        )?;
        let cycles_errored_total = IntCounter::with_opts(Opts::new(
            "barsentry_cycles_errored_total",
            "Evaluation cycles that hit a provider failure",
        ))?;
        let samples_cached_total = IntCounter::with_opts(Opts::new(
            "barsentry_samples_cached_total",
            "Indicator samples appended to the cache",
        ))?;
        let triggers_emitted_total = IntCounterVec::new(
            Opts::new(
                "barsentry_triggers_emitted_total",
                "Trigger events handed to delivery",
            ),
            &["family"],
        )?;
        let evaluations_skipped_total = IntCounterVec::new(
            Opts::new(
                "barsentry_evaluations_skipped_total",
                "Alert evaluations skipped by gating",
            ),
            &["reason"],
        )?;
        let cycle_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "barsentry_cycle_duration_seconds",
            "Wall time of one evaluation cycle",
        ))?;

        registry.register(Box::new(cycles_processed_total.clone()))?;
        registry.register(Box::new(cycles_skipped_total.clone()))?;
        registry.register(Box::new(cycles_errored_total.clone()))?;
        registry.register(Box::new(samples_cached_total.clone()))?;
        registry.register(Box::new(triggers_emitted_total.clone()))?;
        registry.register(Box::new(evaluations_skipped_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            cycles_processed_total,
            cycles_skipped_total,
            cycles_errored_total,
            samples_cached_total,
            triggers_emitted_total,
            evaluations_skipped_total,
            cycle_duration_seconds,
        })
    }

    pub fn record_skip(&self, reason: &str) {
        self.cycles_skipped_total.with_label_values(&[reason]).inc();
    }

    pub fn record_evaluation_skip(&self, reason: &str) {
        self.evaluations_skipped_total
            .with_label_values(&[reason])
            .inc();
    }
}
