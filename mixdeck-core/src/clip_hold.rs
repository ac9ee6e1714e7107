use std::collections::HashMap;

use mixdeck_types::TrackId;

/// How long a track stays flagged after its last clip event.
pub const CLIP_HOLD_SECS: f64 = 1.5;

/// Dwell timer for clip indications: one deadline per track, re-triggering
/// replaces the deadline, expiry clears the indication.
#[derive(Debug, Default)]
pub struct ClipHold {
    deadlines: HashMap<TrackId, f64>,
}

impl ClipHold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a clip event at `now`. Returns true if the track was not
    /// already held.
    pub fn trigger(&mut self, track_id: TrackId, now: f64) -> bool {
        self.deadlines.insert(track_id, now + CLIP_HOLD_SECS).is_none()
    }

    /// Tracks whose hold ran out by `now`, in id order.
    pub fn expire(&mut self, now: f64) -> Vec<TrackId> {
        let mut expired: Vec<TrackId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        expired.sort();
        for id in &expired {
            self.deadlines.remove(id);
        }
        expired
    }

    pub fn is_holding(&self, track_id: TrackId) -> bool {
        self.deadlines.contains_key(&track_id)
    }

    pub fn deadline(&self, track_id: TrackId) -> Option<f64> {
        self.deadlines.get(&track_id).copied()
    }

    pub fn release(&mut self, track_id: TrackId) {
        self.deadlines.remove(&track_id);
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
