use super::track::Track;
use crate::TrackId;

/// Ordered track list plus id allocation and selection.
#[derive(Debug, Clone)]
pub struct TrackState {
    pub tracks: Vec<Track>,
    pub selected: Option<TrackId>,
    next_id: u64,
}

impl Default for TrackState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackState {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            selected: None,
            next_id: 1,
        }
    }

    /// A project with `count` empty tracks, the first one selected.
    pub fn with_empty_tracks(count: usize) -> Self {
        let mut state = Self::new();
        for _ in 0..count {
            state.add_track();
        }
        state.selected = state.tracks.first().map(|t| t.id);
        state
    }

    /// Replace all tracks (project load). Id allocation continues above the
    /// highest installed id.
    pub fn install(&mut self, tracks: Vec<Track>) {
        self.next_id = tracks.iter().map(|t| t.id.get() + 1).max().unwrap_or(1).max(self.next_id);
        self.selected = tracks.first().map(|t| t.id);
        self.tracks = tracks;
    }

    pub fn add_track(&mut self) -> TrackId {
        let id = TrackId::new(self.next_id);
        self.next_id += 1;
        let name = format!("Track {}", self.tracks.len() + 1);
        self.tracks.push(Track::new(id, name));
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        let removed = self.tracks.remove(pos);
        if self.selected == Some(id) {
            self.selected = self.tracks.get(pos.min(self.tracks.len().saturating_sub(1))).map(|t| t.id);
        }
        Some(removed)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    /// Longest loaded buffer, in seconds.
    pub fn longest_clip(&self) -> f64 {
        self.tracks
            .iter()
            .filter_map(|t| t.buffer.as_ref())
            .map(|b| b.duration())
            .fold(0.0, f64::max)
    }
}
