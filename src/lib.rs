//! Closed-bar indicator computation and alert evaluation engine.
//!
//! Ingests a market bar feed, computes technical indicators on fully closed
//! bars only, caches them per (symbol, timeframe, indicator) key, and runs
//! threshold / flip / correlation alert state machines with hysteresis,
//! cooldown, warm-up and staleness gating.

pub mod cache;
pub mod config;
pub mod core;
pub mod errors;
pub mod evaluators;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod state;
