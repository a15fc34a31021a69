//! Per-region failure counting with a TTL.
//!
//! Results-page failures are expected near the end of a roster (the last
//! page has no next button) and during network weather. The counter only
//! escalates after repeated failures inside a short window; an entry that
//! has aged past the TTL restarts from zero, so stale failures from hours
//! ago never trip the end-of-roster check.

use rollcall_core::RegionId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a failure streak stays relevant.
pub const FAIL_COUNTER_TTL: Duration = Duration::from_secs(600);

/// Failures tolerated before classification escalates.
pub const MAX_RESULTS_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy)]
struct Streak {
    count: u32,
    started: Instant,
}

/// TTL-bounded per-region failure counter.
#[derive(Debug, Default)]
pub struct FailCounter {
    streaks: Mutex<HashMap<RegionId, Streak>>,
}

impl FailCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure and return the streak length including it.
    pub fn record_failure(&self, region: &RegionId) -> u32 {
        let mut streaks = self.streaks.lock().expect("acquire fail counter lock");
        let now = Instant::now();

        let streak = streaks
            .entry(region.clone())
            .and_modify(|s| {
                if now.duration_since(s.started) > FAIL_COUNTER_TTL {
                    s.count = 0;
                    s.started = now;
                }
                s.count += 1;
            })
            .or_insert(Streak {
                count: 1,
                started: now,
            });

        streak.count
    }

    /// Clear a region's streak after a successful results-page parse.
    pub fn reset(&self, region: &RegionId) {
        let mut streaks = self.streaks.lock().expect("acquire fail counter lock");
        streaks.remove(region);
    }

    /// Current streak length for a region.
    #[must_use]
    pub fn count(&self, region: &RegionId) -> u32 {
        let streaks = self.streaks.lock().expect("acquire fail counter lock");
        streaks.get(region).map_or(0, |s| {
            if s.started.elapsed() > FAIL_COUNTER_TTL {
                0
            } else {
                s.count
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(code: &str) -> RegionId {
        RegionId::new(code).expect("valid region ID")
    }

    #[test]
    fn test_streak_increments() {
        let counter = FailCounter::new();
        let us_ny = region("us_ny");

        assert_eq!(counter.record_failure(&us_ny), 1);
        assert_eq!(counter.record_failure(&us_ny), 2);
        assert_eq!(counter.record_failure(&us_ny), 3);
        assert_eq!(counter.count(&us_ny), 3);
    }

    #[test]
    fn test_regions_are_independent() {
        let counter = FailCounter::new();
        let us_ny = region("us_ny");
        let us_fl = region("us_fl");

        counter.record_failure(&us_ny);
        counter.record_failure(&us_ny);
        assert_eq!(counter.count(&us_fl), 0);
        assert_eq!(counter.record_failure(&us_fl), 1);
    }

    #[test]
    fn test_reset_clears_streak() {
        let counter = FailCounter::new();
        let us_ny = region("us_ny");

        counter.record_failure(&us_ny);
        counter.record_failure(&us_ny);
        counter.reset(&us_ny);

        assert_eq!(counter.count(&us_ny), 0);
        assert_eq!(counter.record_failure(&us_ny), 1);
    }
}
