pub use mixdeck_types::{SessionState, TrackState, TransportState};

use mixdeck_types::{MixerSettings, Track, TrackId};

use crate::config::ProjectDefaults;

/// Top-level application state, owned by `Mixdeck`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub tracks: TrackState,
    pub session: SessionState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new_with_defaults(&ProjectDefaults::default())
    }
}

impl AppState {
    /// A fresh project: empty tracks and transport/mixer defaults from config.
    pub fn new_with_defaults(defaults: &ProjectDefaults) -> Self {
        let mut session = SessionState::new();
        session.transport.bpm = defaults.bpm;
        session.transport.duration = defaults.duration_secs;
        session.mixer = MixerSettings {
            master_volume: defaults.master_volume,
            metronome_volume: defaults.metronome_volume,
            metronome_sound: defaults.metronome_sound,
            ..MixerSettings::default()
        };
        Self {
            tracks: TrackState::with_empty_tracks(defaults.track_count),
            session,
        }
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.track(id)
    }

    pub fn transport(&self) -> &TransportState {
        &self.session.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdeck_types::MetronomeSound;

    #[test]
    fn defaults_shape_new_project() {
        let defaults = ProjectDefaults {
            bpm: 90.0,
            track_count: 3,
            metronome_sound: MetronomeSound::Beep,
            ..ProjectDefaults::default()
        };
        let state = AppState::new_with_defaults(&defaults);
        assert_eq!(state.tracks.tracks.len(), 3);
        assert_eq!(state.tracks.tracks[2].name, "Track 3");
        assert_eq!(state.tracks.selected, Some(state.tracks.tracks[0].id));
        assert_eq!(state.transport().bpm, 90.0);
        assert!(!state.transport().playing);
        assert_eq!(state.session.mixer.metronome_sound, MetronomeSound::Beep);
    }

    #[test]
    fn default_project_has_eight_tracks() {
        let state = AppState::default();
        assert_eq!(state.tracks.tracks.len(), 8);
        assert_eq!(state.transport().duration, 32.0);
        assert_eq!(state.session.project_name, "New Project");
    }
}
