pub mod ema;
pub mod supertrend;
