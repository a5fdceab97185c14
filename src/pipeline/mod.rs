//! Per-key processing pipeline: poll, detect the bar boundary, compute,
//! cache, broadcast, evaluate.

pub mod boundary;
pub mod cycle;
pub mod locks;

pub use boundary::BarBoundaryDetector;
pub use cycle::CycleRunner;
pub use locks::KeyedLocks;
