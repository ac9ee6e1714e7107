use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: f32 = 120.0;
pub const DEFAULT_DURATION_SECS: f64 = 32.0;

/// UI-visible transport state. `current_time` is written only by the
/// transport clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    #[serde(skip)]
    pub playing: bool,
    pub bpm: f32,
    pub metronome_on: bool,
    pub loop_enabled: bool,
    #[serde(skip)]
    pub current_time: f64,
    pub duration: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            playing: false,
            bpm: DEFAULT_BPM,
            metronome_on: false,
            loop_enabled: false,
            current_time: 0.0,
            duration: DEFAULT_DURATION_SECS,
        }
    }
}

impl TransportState {
    /// Grow the timeline to fit a clip of `clip_secs`, rounded up to whole
    /// seconds. Never shrinks.
    pub fn fit_clip(&mut self, clip_secs: f64) {
        if clip_secs.is_finite() {
            self.duration = self.duration.max(clip_secs.ceil());
        }
    }

    /// Seconds between metronome clicks.
    pub fn beat_interval(&self) -> f64 {
        60.0 / self.bpm.max(f32::EPSILON) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_only_grows() {
        let mut t = TransportState::default();
        t.fit_clip(40.2);
        assert_eq!(t.duration, 41.0);
        t.fit_clip(3.0);
        assert_eq!(t.duration, 41.0);
    }

    #[test]
    fn beat_interval_at_120() {
        let t = TransportState::default();
        assert!((t.beat_interval() - 0.5).abs() < 1e-9);
    }
}
