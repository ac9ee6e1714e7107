use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::buffer::AudioBuffer;
use super::device::OutputTarget;
use super::effect::EffectConfig;
use crate::TrackId;

/// Curated track color palette. The first entry is the default.
pub const TRACK_COLORS: [&str; 11] = [
    "#78909C", "#EF5350", "#EC407A", "#AB47BC", "#5C6BC0", "#42A5F5", "#26C6DA", "#26A69A",
    "#66BB6A", "#FFEE58", "#FFA726",
];

pub const DEFAULT_TRACK_VOLUME: f32 = 0.8;

/// Effective playable region of a track's buffer, in buffer seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBounds {
    pub start: f64,
    pub end: f64,
}

impl ClipBounds {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether playback starting `offset` seconds into the clip produces audio.
    pub fn accepts_offset(&self, offset: f64) -> bool {
        offset.max(0.0) < self.duration()
    }
}

/// A mixer track: clip, mix controls, effect and routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip)]
    pub buffer: Option<Arc<AudioBuffer>>,
    pub muted: bool,
    pub solo: bool,
    /// 0.0 to 1.0
    pub volume: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
    pub effect: EffectConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    #[serde(default)]
    pub output: OutputTarget,
    /// Seconds into the buffer where the clip starts
    pub trim_start: f64,
    /// Seconds into the buffer where the clip ends; <= 0 means the full buffer
    pub trim_end: f64,
    #[serde(skip)]
    pub clipping: bool,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: TRACK_COLORS[0].to_string(),
            icon: None,
            buffer: None,
            muted: false,
            solo: false,
            volume: DEFAULT_TRACK_VOLUME,
            pan: 0.0,
            effect: EffectConfig::default(),
            input_device: None,
            output: OutputTarget::Master,
            trim_start: 0.0,
            trim_end: 0.0,
            clipping: false,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.buffer.is_some()
    }

    /// Playable region of the loaded buffer, or `None` without a buffer.
    pub fn clip_bounds(&self) -> Option<ClipBounds> {
        let buffer = self.buffer.as_ref()?;
        let start = self.trim_start.max(0.0);
        let end = if self.trim_end > 0.0 {
            self.trim_end
        } else {
            buffer.duration()
        };
        Some(ClipBounds { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_seconds(secs: usize) -> Track {
        let mut track = Track::new(TrackId::new(1), "Track 1");
        track.buffer = Some(Arc::new(AudioBuffer::silent(100, 1, secs * 100)));
        track
    }

    #[test]
    fn no_buffer_no_bounds() {
        assert!(Track::new(TrackId::new(1), "x").clip_bounds().is_none());
    }

    #[test]
    fn non_positive_trim_end_means_full_buffer() {
        let mut track = track_with_seconds(10);
        for trim_end in [0.0, -1.0] {
            track.trim_end = trim_end;
            let bounds = track.clip_bounds().unwrap();
            assert!((bounds.end - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn trimmed_clip_offsets() {
        let mut track = track_with_seconds(10);
        track.trim_start = 2.0;
        track.trim_end = 8.0;
        let bounds = track.clip_bounds().unwrap();
        assert!((bounds.duration() - 6.0).abs() < 1e-9);
        assert!(bounds.accepts_offset(5.9));
        assert!(!bounds.accepts_offset(6.0));
        assert!(bounds.accepts_offset(-3.0));
    }

    #[test]
    fn inverted_trim_has_zero_duration() {
        let mut track = track_with_seconds(10);
        track.trim_start = 8.0;
        track.trim_end = 2.0;
        let bounds = track.clip_bounds().unwrap();
        assert_eq!(bounds.duration(), 0.0);
        assert!(!bounds.accepts_offset(0.0));
    }
}
