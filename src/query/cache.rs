//! Single-slot interval cache
//!
//! A next/past answer stays correct for every timestamp between two
//! neighbouring catalog events, so one remembered answer plus the interval
//! over which it holds is enough to skip the binary search for clustered
//! queries.

use crate::catalog::{EventResult, Timestamp};
use serde::Serialize;

/// Which query produced the cached answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Past,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    direction: Direction,
    /// Inclusive bounds of the interval over which `result` holds
    lo: Timestamp,
    hi: Timestamp,
    result: EventResult,
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// Most recent next/past answer and its validity interval
#[derive(Debug, Clone, Default)]
pub struct IntervalCache {
    slot: Option<Slot>,
    stats: CacheStats,
}

impl IntervalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for a `direction` query at `ts`, if the slot covers it
    pub fn lookup(&mut self, direction: Direction, ts: Timestamp) -> Option<EventResult> {
        match self.slot {
            Some(slot) if slot.direction == direction && slot.lo <= ts && ts <= slot.hi => {
                self.stats.hits += 1;
                Some(slot.result)
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Replace the slot with `result`, valid for `lo..=hi`
    pub fn store(&mut self, direction: Direction, lo: Timestamp, hi: Timestamp, result: EventResult) {
        debug_assert!(lo <= hi);
        self.slot = Some(Slot {
            direction,
            lo,
            hi,
            result,
        });
    }

    /// Drop the cached answer; counters are kept
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Direction and interval of the cached answer
    pub fn interval(&self) -> Option<(Direction, Timestamp, Timestamp)> {
        self.slot.map(|s| (s.direction, s.lo, s.hi))
    }
}
