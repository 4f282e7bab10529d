//! Fixed-cadence tick timing.
//!
//! Each tick's deadline is its start plus the frame interval. A tick that
//! overruns its deadline is followed immediately by the next one; there is
//! no frame skipping and no catch-up, so sustained overruns let wall-clock
//! time drift ahead of the tick count.

use std::time::{Duration, Instant};

/// Timing handed to modules for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTime {
    /// Seconds since the first tick
    pub seconds: f64,
    /// Seconds since the previous tick (0 on the first)
    pub delta: f64,
    /// Zero-based tick index
    pub frame: u64,
}

#[derive(Debug, Clone)]
pub struct TickClock {
    interval: Duration,
    origin: Option<Instant>,
    last_start: Option<Instant>,
    deadline: Option<Instant>,
    frame: u64,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            origin: None,
            last_start: None,
            deadline: None,
            frame: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start a tick at `now`; the next deadline becomes `now + interval`
    pub fn begin_tick(&mut self, now: Instant) -> TickTime {
        let origin = *self.origin.get_or_insert(now);
        let delta = self
            .last_start
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        let time = TickTime {
            seconds: now.saturating_duration_since(origin).as_secs_f64(),
            delta,
            frame: self.frame,
        };
        self.frame += 1;
        self.last_start = Some(now);
        self.deadline = Some(now + self.interval);
        time
    }

    /// When the next tick should start; `None` before the first tick
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the next tick (zero once overrun)
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the current tick ran past its deadline
    pub fn is_overrun(&self, now: Instant) -> bool {
        self.deadline.map(|d| now > d).unwrap_or(false)
    }

    /// Ticks started so far
    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(16);

    #[test]
    fn test_first_tick_starts_at_zero() {
        let mut clock = TickClock::new(INTERVAL);
        let start = Instant::now();
        let time = clock.begin_tick(start);
        assert_eq!(time.frame, 0);
        assert_eq!(time.seconds, 0.0);
        assert_eq!(time.delta, 0.0);
        assert_eq!(clock.next_deadline(), Some(start + INTERVAL));
    }

    #[test]
    fn test_remaining_counts_down_to_deadline() {
        let mut clock = TickClock::new(INTERVAL);
        let start = Instant::now();
        clock.begin_tick(start);
        assert_eq!(clock.remaining(start + Duration::from_millis(6)), Duration::from_millis(10));
        assert!(!clock.is_overrun(start + INTERVAL));
    }

    #[test]
    fn test_overrun_does_not_catch_up() {
        let mut clock = TickClock::new(INTERVAL);
        let start = Instant::now();
        clock.begin_tick(start);

        // tick took 40 ms: next starts immediately, deadline measured from its own start
        let late = start + Duration::from_millis(40);
        assert!(clock.is_overrun(late));
        assert_eq!(clock.remaining(late), Duration::ZERO);

        let time = clock.begin_tick(late);
        assert_eq!(time.frame, 1);
        assert!((time.delta - 0.040).abs() < 1e-9);
        assert_eq!(clock.next_deadline(), Some(late + INTERVAL));
    }
}
