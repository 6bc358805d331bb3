use crate::error::ScheduleError;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Produces wall-clock aligned collection ticks.
///
/// Ticks form the sequence `seed, seed + interval, seed + 2*interval, ...`
/// in epoch milliseconds. When a cycle overruns, the following ticks are
/// handed out immediately until the schedule catches up; no tick is ever
/// skipped.
#[derive(Debug)]
pub struct IntervalSynchronizer<C: Clock = SystemClock> {
    clock: C,
    interval_ms: i64,
    next_tick_ms: i64,
}

impl IntervalSynchronizer<SystemClock> {
    /// `seed_ts` is an epoch timestamp in seconds; `None` starts now.
    pub fn new(interval: Duration, seed_ts: Option<i64>) -> Result<Self, ScheduleError> {
        Self::with_clock(SystemClock, interval, seed_ts)
    }
}

impl<C: Clock> IntervalSynchronizer<C> {
    pub fn with_clock(clock: C, interval: Duration, seed_ts: Option<i64>) -> Result<Self, ScheduleError> {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        if interval_ms <= 0 {
            return Err(ScheduleError::ZeroInterval);
        }

        let now_ms = clock.now_ms();
        let next_tick_ms = match seed_ts {
            Some(seed) => {
                let seed_ms = seed.saturating_mul(1000);
                if seed_ms < now_ms {
                    return Err(ScheduleError::SeedInPast { seed_ms, now_ms });
                }
                seed_ms
            }
            None => now_ms,
        };

        debug!(interval_ms, first_tick_ms = next_tick_ms, "interval schedule created");
        Ok(Self {
            clock,
            interval_ms,
            next_tick_ms,
        })
    }

    /// Sleep until the next tick is due, then return it.
    pub async fn wait_for_next_interval(&mut self) -> i64 {
        let tick = self.next_tick_ms;
        let wait_ms = tick - self.clock.now_ms();
        if wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(wait_ms as u64)).await;
        } else if -wait_ms >= self.interval_ms {
            warn!(tick_ms = tick, behind_ms = -wait_ms, "collection is running behind schedule");
        }
        self.next_tick_ms = tick.saturating_add(self.interval_ms);
        tick
    }

    /// The tick the next call to `wait_for_next_interval` will return.
    pub fn next_tick_ms(&self) -> i64 {
        self.next_tick_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct ManualClock(Arc<AtomicI64>);

    impl ManualClock {
        fn at(ms: i64) -> Self {
            Self(Arc::new(AtomicI64::new(ms)))
        }

        fn set(&self, ms: i64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = IntervalSynchronizer::with_clock(ManualClock::at(0), Duration::ZERO, None)
            .unwrap_err();
        assert_eq!(err, ScheduleError::ZeroInterval);
    }

    #[test]
    fn test_seed_in_past_rejected() {
        let clock = ManualClock::at(50_000);
        let err = IntervalSynchronizer::with_clock(clock, Duration::from_secs(10), Some(10))
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::SeedInPast {
                seed_ms: 10_000,
                now_ms: 50_000
            }
        );
    }

    #[test]
    fn test_seed_converted_to_millis() {
        let clock = ManualClock::at(1_000);
        let sync =
            IntervalSynchronizer::with_clock(clock, Duration::from_secs(10), Some(60)).unwrap();
        assert_eq!(sync.next_tick_ms(), 60_000);
        assert_eq!(sync.interval(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_overrun_emits_every_tick_back_to_back() {
        let clock = ManualClock::at(0);
        let mut sync =
            IntervalSynchronizer::with_clock(clock.clone(), Duration::from_secs(10), None).unwrap();

        assert_eq!(sync.wait_for_next_interval().await, 0);
        // a cycle that took 35 seconds
        clock.set(35_000);
        let started = std::time::Instant::now();
        let ticks = vec![
            sync.wait_for_next_interval().await,
            sync.wait_for_next_interval().await,
            sync.wait_for_next_interval().await,
        ];
        assert_eq!(ticks, vec![10_000, 20_000, 30_000]);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(sync.next_tick_ms(), 40_000);
    }

    #[tokio::test]
    async fn test_ticks_increase_by_interval_on_real_clock() {
        let mut sync = IntervalSynchronizer::new(Duration::from_millis(50), None).unwrap();
        let mut previous = sync.wait_for_next_interval().await;
        for _ in 0..3 {
            let tick = sync.wait_for_next_interval().await;
            assert_eq!(tick - previous, 50);
            previous = tick;
        }
    }
}
