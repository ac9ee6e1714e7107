//! Transport clock: the authoritative playhead, reconciled against the audio
//! clock.
//!
//! Position is always recomputed as `seek + (now - reference)` from the
//! audio-clock time captured when playback started. It is never accumulated
//! from frame deltas, so a stalled UI loop cannot drift it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stopped,
    Playing,
    Paused,
}

/// Outcome of a transport tick while playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportTick {
    Position(f64),
    /// Reached the end of a non-looping timeline. Reported once.
    Finished,
}

/// Playhead position for a playback that started at audio time `reference`
/// from `seek` seconds.
pub fn compute_position(reference: f64, now: f64, seek: f64, loop_enabled: bool, duration: f64) -> f64 {
    let position = seek + (now - reference).max(0.0);
    if loop_enabled && duration > 0.0 {
        position % duration
    } else {
        position
    }
}

#[derive(Debug, Clone)]
pub struct TransportClock {
    mode: TransportMode,
    reference: f64,
    seek_offset: f64,
    position: f64,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock {
    pub fn new() -> Self {
        Self {
            mode: TransportMode::Stopped,
            reference: 0.0,
            seek_offset: 0.0,
            position: 0.0,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode == TransportMode::Playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Playhead at audio time `now`, without advancing the clock.
    pub fn position_at(&self, now: f64, loop_enabled: bool, duration: f64) -> f64 {
        match self.mode {
            TransportMode::Playing => {
                compute_position(self.reference, now, self.seek_offset, loop_enabled, duration)
            }
            _ => self.position,
        }
    }

    /// Where the next playback starts.
    pub fn seek_offset(&self) -> f64 {
        self.seek_offset
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Enter `Playing` with the audio-clock time the sources were started at.
    pub fn start(&mut self, reference: f64) {
        self.mode = TransportMode::Playing;
        self.reference = reference;
        self.position = self.seek_offset;
        log::debug!(target: "transport", "playing from {:.3}s (reference {:.3})", self.seek_offset, reference);
    }

    /// Advance the playhead. `None` unless playing.
    pub fn tick(&mut self, now: f64, loop_enabled: bool, duration: f64) -> Option<TransportTick> {
        if self.mode != TransportMode::Playing {
            return None;
        }
        let position = compute_position(self.reference, now, self.seek_offset, loop_enabled, duration);
        if !loop_enabled && position >= duration {
            self.stop();
            log::debug!(target: "transport", "reached end of timeline ({:.3}s)", duration);
            return Some(TransportTick::Finished);
        }
        self.position = position;
        Some(TransportTick::Position(position))
    }

    /// Freeze the playhead at its current position; the next start resumes there.
    pub fn pause(&mut self, now: f64, loop_enabled: bool, duration: f64) -> f64 {
        if self.mode == TransportMode::Playing {
            self.position = compute_position(self.reference, now, self.seek_offset, loop_enabled, duration);
            if !loop_enabled && self.position >= duration {
                self.position = 0.0;
            }
        }
        self.seek_offset = self.position;
        self.mode = TransportMode::Paused;
        self.position
    }

    pub fn stop(&mut self) {
        self.mode = TransportMode::Stopped;
        self.position = 0.0;
        self.seek_offset = 0.0;
    }

    /// Move the playhead. While playing the caller restarts playback from the
    /// new offset.
    pub fn seek(&mut self, position: f64) {
        let position = position.max(0.0);
        self.seek_offset = position;
        self.position = position;
    }
}
