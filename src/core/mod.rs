//! Engine orchestration: runtime wiring and tick scheduling.

pub mod runtime;
pub mod scheduler;

pub use runtime::EngineRuntime;
pub use scheduler::TickScheduler;
