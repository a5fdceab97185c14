//! Shared data models spanning the engine layers.

pub mod alert;
pub mod bar;
pub mod indicator;
pub mod trigger;

pub use alert::{
    AlertDefinition, AlertPolicy, CorrelationMode, CorrelationPolicy, ExpectedSign, FlipPolicy,
    FlipRule, SecondaryGate, ThresholdPolicy,
};
pub use bar::{OhlcBar, Timeframe};
pub use indicator::{
    CacheKey, IndicatorKind, IndicatorSample, IndicatorSnapshot, IndicatorValue, TrendDirection,
};
pub use trigger::{TriggerEvent, TriggerSide};
