//! Next / past / closest / series-window queries

pub mod cache;
pub mod engine;

pub use cache::{CacheStats, Direction, IntervalCache};
pub use engine::{Eclipses, Engine};
