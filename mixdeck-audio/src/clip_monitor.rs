//! Clip detection: periodic peak polling of the playing tracks' taps.

use mixdeck_types::TrackId;

use crate::clock::IntervalGate;
use crate::engine::{AudioBackend, NodeId};

/// Peak at or above this level counts as clipping.
pub const CLIP_THRESHOLD: f32 = 1.0;
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 0.1;

/// Polls per-track peak taps on a fixed interval and reports tracks whose
/// peak reached `CLIP_THRESHOLD`. Stateless about clipping itself: the
/// consumer decides how long a clip indication lasts.
pub struct ClipMonitor {
    gate: IntervalGate,
    has_consumer: bool,
}

impl ClipMonitor {
    pub fn new(poll_interval: f64) -> Self {
        Self { gate: IntervalGate::new(poll_interval), has_consumer: false }
    }

    pub fn has_consumer(&self) -> bool {
        self.has_consumer
    }

    /// Register a consumer. Idempotent.
    pub fn enable(&mut self) {
        if !self.has_consumer {
            self.has_consumer = true;
            self.gate.reset();
        }
    }

    /// Drop the consumer. Idempotent.
    pub fn disable(&mut self) {
        self.has_consumer = false;
    }

    /// Tracks that clipped since the last poll. Empty between polls and
    /// without a consumer.
    pub fn poll<I>(&mut self, now: f64, backend: &dyn AudioBackend, taps: I) -> Vec<TrackId>
    where
        I: IntoIterator<Item = (TrackId, NodeId)>,
    {
        if !self.has_consumer || !self.gate.ready(now) {
            return Vec::new();
        }
        let mut clipped: Vec<TrackId> = taps
            .into_iter()
            .filter(|(track_id, tap)| match backend.read_peak(*tap) {
                Ok(peak) => peak >= CLIP_THRESHOLD,
                Err(e) => {
                    log::debug!(target: "audio", "peak read failed for track {}: {}", track_id, e);
                    false
                }
            })
            .map(|(track_id, _)| track_id)
            .collect();
        clipped.sort();
        clipped
    }
}

impl Default for ClipMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TestBackend;

    fn taps() -> Vec<(TrackId, NodeId)> {
        vec![(TrackId::new(1), 10), (TrackId::new(2), 20), (TrackId::new(3), 30)]
    }

    #[test]
    fn reports_peaks_at_threshold() {
        let backend = TestBackend::new();
        backend.set_peak(10, 0.99);
        backend.set_peak(20, 1.0);
        backend.set_peak(30, 1.7);
        let mut monitor = ClipMonitor::default();
        monitor.enable();
        assert_eq!(monitor.poll(0.0, &backend, taps()), vec![TrackId::new(2), TrackId::new(3)]);
    }

    #[test]
    fn silent_without_consumer() {
        let backend = TestBackend::new();
        backend.set_peak(10, 2.0);
        let mut monitor = ClipMonitor::default();
        assert!(monitor.poll(0.0, &backend, taps()).is_empty());
        monitor.enable();
        monitor.enable();
        assert!(monitor.has_consumer());
        monitor.disable();
        monitor.disable();
        assert!(monitor.poll(1.0, &backend, taps()).is_empty());
    }

    #[test]
    fn polls_on_its_own_interval() {
        let backend = TestBackend::new();
        backend.set_peak(10, 1.2);
        let mut monitor = ClipMonitor::new(0.1);
        monitor.enable();
        assert_eq!(monitor.poll(2.0, &backend, taps()).len(), 1);
        assert!(monitor.poll(2.05, &backend, taps()).is_empty());
        assert_eq!(monitor.poll(2.25, &backend, taps()).len(), 1);
    }
}
