//! Audio clock sources.
//!
//! All scheduling (transport position, metronome look-ahead) reads time from an
//! `AudioClock`, never from UI frame timing.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Monotonic audio-subsystem time in seconds.
pub trait AudioClock: Send {
    fn now(&self) -> f64;
}

/// Wall-clock backed audio time, starting at 0 on construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock. Clones share the same time, so a test can keep one
/// handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { time: Arc::new(Mutex::new(start)) }
    }

    pub fn set(&self, secs: f64) {
        if let Ok(mut t) = self.time.lock() {
            *t = secs;
        }
    }

    pub fn advance(&self, secs: f64) {
        if let Ok(mut t) = self.time.lock() {
            *t += secs;
        }
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.time.lock().map(|t| *t).unwrap_or(0.0)
    }
}

/// Fires at most once per `interval` of audio-clock time. The first check
/// always fires.
#[derive(Debug, Clone, Copy)]
pub struct IntervalGate {
    interval: f64,
    last: Option<f64>,
}

impl IntervalGate {
    pub fn new(interval: f64) -> Self {
        Self { interval: interval.max(0.0), last: None }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Whether the gated loop should run at `now`. Marks the run when it should.
    pub fn ready(&mut self, now: f64) -> bool {
        match self.last {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Forget the last run so the next check fires.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(1.0);
        let handle = clock.clone();
        handle.advance(0.5);
        assert_eq!(clock.now(), 1.5);
        handle.set(10.0);
        assert_eq!(clock.now(), 10.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn gate_fires_once_per_interval() {
        let mut gate = IntervalGate::new(0.1);
        assert!(gate.ready(5.0));
        assert!(!gate.ready(5.05));
        assert!(gate.ready(5.25));
        assert!(!gate.ready(5.3));
        gate.reset();
        assert!(gate.ready(5.3));
    }
}
