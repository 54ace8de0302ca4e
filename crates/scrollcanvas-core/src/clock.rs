#![forbid(unsafe_code)]

//! Time sources for the close debounce.
//!
//! The activation engine takes `now` as an argument and never reads a
//! clock itself. Hosts pick one of two sources: [`MonotonicClock`] (real
//! time, `wasm32` included through `web-time`) or [`ManualClock`] for tests
//! and replays driven by `performance.now()`-style millisecond stamps.

use web_time::{Duration, Instant};

/// Monotonic time since an arbitrary origin.
pub trait Clock {
    fn now_mono(&self) -> Duration;
}

/// Host-stepped clock in microsecond resolution.
///
/// Millisecond inputs that are not finite, negative, or would move time
/// backwards are rejected and leave the clock untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManualClock {
    elapsed: Duration,
}

/// Convert host milliseconds, keeping microsecond precision.
fn from_ms(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    let micros = (ms * 1000.0).round();
    Some(if micros >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_micros(micros as u64)
    })
}

impl ManualClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
        }
    }

    /// Jump to an absolute stamp. Returns whether the clock moved.
    pub fn set_ms(&mut self, stamp_ms: f64) -> bool {
        match from_ms(stamp_ms) {
            Some(at) if at > self.elapsed => {
                self.elapsed = at;
                true
            }
            _ => false,
        }
    }

    /// Step forward by `dt_ms`. Returns whether the clock moved.
    pub fn advance_ms(&mut self, dt_ms: f64) -> bool {
        match from_ms(dt_ms) {
            Some(dt) if !dt.is_zero() => {
                self.elapsed = self.elapsed.saturating_add(dt);
                true
            }
            _ => false,
        }
    }

    /// Current time as host milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.elapsed.as_micros() as f64 / 1000.0
    }
}

impl Clock for ManualClock {
    fn now_mono(&self) -> Duration {
        self.elapsed
    }
}

/// Real monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Clock whose origin is the moment of the call.
    #[must_use]
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_accumulate() {
        let mut clock = ManualClock::new();
        assert!(clock.advance_ms(16.0));
        assert!(clock.advance_ms(16.5));
        assert_eq!(clock.now_mono(), Duration::from_micros(32_500));
        assert_eq!(clock.now_ms(), 32.5);
    }

    #[test]
    fn rejected_inputs_leave_time_alone() {
        let mut clock = ManualClock::new();
        assert!(clock.set_ms(100.0));
        assert!(!clock.set_ms(50.0));
        assert!(!clock.set_ms(f64::NAN));
        assert!(!clock.advance_ms(-1.0));
        assert!(!clock.advance_ms(0.0));
        assert!(!clock.advance_ms(f64::INFINITY));
        assert_eq!(clock.now_ms(), 100.0);
    }

    #[test]
    fn monotonic_clock_does_not_run_backwards() {
        let clock = MonotonicClock::start();
        let a = clock.now_mono();
        assert!(clock.now_mono() >= a);
    }
}
