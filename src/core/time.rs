pub use core::time::Duration;

// `std::time::Instant::now()` can panic on `wasm32-unknown-unknown` depending on
// how the runtime is configured. `web-time` provides a browser-backed monotonic
// clock via `performance.now()`.
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Measures the gap between consecutive events on a monotonic clock.
#[derive(Debug, Clone, Default)]
pub struct ArrivalClock {
    last: Option<Instant>,
}

impl ArrivalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival at `now`; returns seconds since the previous one.
    pub fn mark(&mut self, now: Instant) -> Option<f64> {
        let prev = self.last.replace(now);
        prev.map(|p| now.saturating_duration_since(p).as_secs_f64())
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Lets at most one event through per `interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True (and the window restarts) when more than `interval` has passed since
    /// the last accepted event, or nothing has been accepted yet.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let ready = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        };
        if ready {
            self.last = Some(now);
        }
        ready
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_one_event_per_window() {
        let t0 = Instant::now();
        let mut rl = RateLimiter::new(Duration::from_millis(100));
        assert!(rl.try_acquire(t0));
        assert!(!rl.try_acquire(t0 + Duration::from_millis(50)));
        assert!(!rl.try_acquire(t0 + Duration::from_millis(100)));
        assert!(rl.try_acquire(t0 + Duration::from_millis(101)));
        assert!(!rl.try_acquire(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn arrival_clock_reports_gaps() {
        let t0 = Instant::now();
        let mut c = ArrivalClock::new();
        assert_eq!(c.mark(t0), None);
        let dt = c.mark(t0 + Duration::from_millis(33)).unwrap();
        assert!((dt - 0.033).abs() < 1.0e-9);
        c.reset();
        assert_eq!(c.mark(t0), None);
    }
}
