//! # mixdeck-core
//!
//! Mixer engine library: application state, action dispatch, the transport
//! clock and MIDI control, bound to an injected `AudioSession`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mixdeck_audio::{NullBackend, SystemClock};
//! use mixdeck_core::config::Config;
//! use mixdeck_core::Mixdeck;
//! use mixdeck_types::{Action, TransportAction};
//!
//! let config = Config::load();
//! let mut deck = Mixdeck::from_config(&config, Box::new(NullBackend), Box::new(SystemClock::new()))?;
//! deck.load_audio(deck.state().tracks.tracks[0].id, "drums.wav", &bytes)?;
//! deck.dispatch(&Action::Transport(TransportAction::Play));
//! loop {
//!     let result = deck.tick();
//!     // render deck.state(), show result.notices
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`state`]: `AppState`, tracks plus session
//! - [`dispatch`]: `dispatch_action()`, the single entry point for state mutation
//! - [`transport`]: `TransportClock`, the playhead reconciled against the audio clock
//! - [`clip_hold`]: dwell timer behind each track's `clipping` flag
//! - [`midi`]: raw MIDI parsing, `MidiInputManager` and the mapping dispatcher
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`project`]: serializable project snapshots and WAV export

pub mod clip_hold;
pub mod config;
pub mod dispatch;
pub mod midi;
pub mod project;
pub mod state;
pub mod transport;

use mixdeck_audio::{decode_wav, AudioBackend, AudioClock, AudioSession, BackendResult, LoadError};
use mixdeck_types::{
    Action, AudioEffect, DispatchResult, MixerSettings, Track, TrackAction, TrackId, TransportAction,
    TransportState,
};

use crate::clip_hold::ClipHold;
use crate::config::Config;
use crate::dispatch::dispatch_action;
use crate::midi::{process_midi_event, MidiEvent};
use crate::project::ProjectSnapshot;
use crate::state::AppState;
use crate::transport::{TransportClock, TransportTick};

/// Owns the application state and the audio session, and keeps the two in
/// step. Every mutation goes through [`Mixdeck::dispatch`].
pub struct Mixdeck {
    state: AppState,
    audio: AudioSession,
    transport: TransportClock,
    clip_hold: ClipHold,
}

impl Mixdeck {
    /// Bind `state` to `audio`: bus levels, routing and click sound are
    /// pushed to the session and the clip monitor gets its consumer.
    pub fn new(state: AppState, audio: AudioSession) -> Self {
        let mut deck = Self {
            state,
            audio,
            transport: TransportClock::new(),
            clip_hold: ClipHold::new(),
        };
        deck.apply_mixer();
        deck.audio.enable_clip_monitor();
        deck
    }

    /// A fresh project shaped by `config`, on a new audio session.
    pub fn from_config(
        config: &Config,
        backend: Box<dyn AudioBackend>,
        clock: Box<dyn AudioClock>,
    ) -> BackendResult<Self> {
        let audio = AudioSession::new(backend, clock, config.session_config())?;
        let state = AppState::new_with_defaults(&config.defaults());
        Ok(Self::new(state, audio))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn audio(&self) -> &AudioSession {
        &self.audio
    }

    pub fn transport(&self) -> &TransportClock {
        &self.transport
    }

    pub fn clip_hold(&self) -> &ClipHold {
        &self.clip_hold
    }

    /// Apply an action to state, then to the audio session.
    pub fn dispatch(&mut self, action: &Action) -> DispatchResult {
        let before = self.state.session.transport.clone();
        let result = dispatch_action(action, &mut self.state);
        for effect in &result.audio_effects {
            self.apply_effect(effect, action, &before);
        }
        result
    }

    /// Translate a MIDI event into its action and dispatch it.
    pub fn handle_midi(&mut self, device_id: &str, event: &MidiEvent) -> DispatchResult {
        let action = process_midi_event(&self.state, device_id, &event.kind);
        if action == Action::None {
            return DispatchResult::none();
        }
        self.dispatch(&action)
    }

    /// Run the periodic loops: reap ended sources, schedule clicks, poll
    /// clips, expire clip holds and advance the playhead.
    pub fn tick(&mut self) -> DispatchResult {
        let mut result = DispatchResult::none();
        let tick = self.audio.tick(self.state.session.transport.bpm);

        for id in &tick.finished {
            log::debug!(target: "transport", "track {} reached the end of its clip", id);
        }
        for id in self.clip_hold.expire(tick.now) {
            result.merge(self.dispatch(&Action::Track(TrackAction::SetClipping(id, false))));
        }
        for id in tick.clipped {
            if self.clip_hold.trigger(id, tick.now) {
                log::debug!(target: "audio", "track {} clipping", id);
                result.merge(self.dispatch(&Action::Track(TrackAction::SetClipping(id, true))));
            }
        }

        let transport = &self.state.session.transport;
        match self.transport.tick(tick.now, transport.loop_enabled, transport.duration) {
            Some(TransportTick::Position(position)) => {
                self.state.session.transport.current_time = position;
            }
            Some(TransportTick::Finished) => {
                result.merge(self.dispatch(&Action::Transport(TransportAction::Finished)));
            }
            None => {}
        }
        result
    }

    /// Decode WAV bytes at the session rate and attach them to a track.
    pub fn load_audio(
        &mut self,
        track_id: TrackId,
        source_name: &str,
        bytes: &[u8],
    ) -> Result<DispatchResult, LoadError> {
        let buffer = decode_wav(bytes, self.audio.sample_rate()).map_err(|e| {
            log::error!(target: "audio", "could not load {} into track {}: {}", source_name, track_id, e);
            e
        })?;
        log::info!(
            target: "audio",
            "loaded {} ({:.2}s) into track {}",
            source_name,
            buffer.duration(),
            track_id
        );
        Ok(self.dispatch(&Action::Track(TrackAction::LoadAudio {
            id: track_id,
            source_name: source_name.to_string(),
            buffer: std::sync::Arc::new(buffer),
        })))
    }

    /// Replace the whole project. Playback stops, the audio session returns
    /// to its fresh state and the mixer falls back to default levels.
    pub fn install_project(&mut self, tracks: Vec<Track>, transport: TransportState) {
        self.audio.stop_playback();
        self.audio.reset();
        self.transport.stop();
        self.clip_hold.clear();

        let mut tracks = tracks;
        for track in &mut tracks {
            track.clipping = false;
        }
        self.state.tracks.install(tracks);
        self.state.session.transport = TransportState {
            playing: false,
            current_time: 0.0,
            ..transport
        };
        self.state.session.mixer = MixerSettings::default();
        self.apply_mixer();
        log::info!(target: "audio", "installed project with {} track(s)", self.state.tracks.tracks.len());
    }

    /// Install a saved project. Track audio is attached afterwards with
    /// [`Mixdeck::load_audio`].
    pub fn restore(&mut self, snapshot: &ProjectSnapshot) {
        self.install_project(snapshot.tracks(), snapshot.transport.clone());
        self.state.session.project_name = snapshot.name.clone();
        self.state.session.mixer = snapshot.mixer.clone();
        self.state.session.midi.mappings = snapshot.midi_mappings.clone();
        self.state.session.midi.learn = false;
        self.state.session.midi.pending_target = None;
        self.apply_mixer();
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot::from_state(&self.state)
    }

    /// Stop everything and free every audio node.
    pub fn shutdown(&mut self) {
        self.transport.stop();
        self.state.session.transport.playing = false;
        self.audio.shutdown();
    }

    // ── Effect application ──────────────────────────────────────────

    fn apply_effect(&mut self, effect: &AudioEffect, action: &Action, before: &TransportState) {
        match effect {
            AudioEffect::TrackParams(id) => {
                if let Some(track) = self.state.track(*id) {
                    self.audio.update_track(track);
                }
            }
            AudioEffect::TrackRebuild(id) => self.rebuild_track(*id),
            AudioEffect::TrackAudio(id) => self.audio.forget_buffer(*id),
            AudioEffect::TrackRouting(id) => {
                if let Some(track) = self.state.tracks.track(*id) {
                    self.audio.route_track(track);
                }
            }
            AudioEffect::TrackRemoved(id) => {
                self.audio.remove_track(*id);
                self.clip_hold.release(*id);
            }
            AudioEffect::MasterLevels => {
                let mixer = &self.state.session.mixer;
                self.audio.set_master_volume(mixer.master_volume);
                self.audio.set_metronome_volume(mixer.metronome_volume);
                self.audio.set_metronome_pan(mixer.metronome_pan);
            }
            AudioEffect::MasterRouting => {
                let target = self.state.session.mixer.master_output.clone();
                self.audio.set_master_output(&target);
            }
            AudioEffect::MetronomeRouting => {
                let target = self.state.session.mixer.metronome_output.clone();
                self.audio.set_metronome_output(&target);
            }
            AudioEffect::MetronomeSound => self.apply_metronome_sound(),
            AudioEffect::PreviewMetronome(sound) => self.audio.preview_metronome(*sound),
            AudioEffect::Transport => {
                if let Action::Transport(transport_action) = action {
                    self.apply_transport(transport_action, before);
                }
            }
        }
    }

    /// Restart a playing track's chain at the playhead so a structural
    /// change is heard now.
    fn rebuild_track(&mut self, id: TrackId) {
        if !self.transport.is_playing() {
            return;
        }
        let Some(track) = self.state.tracks.track(id) else {
            return;
        };
        let transport = &self.state.session.transport;
        let offset = self
            .transport
            .position_at(self.audio.now(), transport.loop_enabled, transport.duration);
        self.audio.rebuild_track(track, transport.loop_enabled, offset);
    }

    fn apply_metronome_sound(&mut self) {
        let wanted = self.state.session.mixer.metronome_sound;
        if !self.audio.select_metronome_sound(wanted) {
            let current = self.audio.metronome_sound();
            log::warn!(
                target: "audio",
                "metronome sound {} is not loaded, keeping {}",
                wanted.name(),
                current.name()
            );
            self.state.session.mixer.metronome_sound = current;
        }
    }

    /// Push every mixer setting to the audio session.
    fn apply_mixer(&mut self) {
        let mixer = self.state.session.mixer.clone();
        self.audio.set_master_volume(mixer.master_volume);
        self.audio.set_metronome_volume(mixer.metronome_volume);
        self.audio.set_metronome_pan(mixer.metronome_pan);
        self.audio.set_master_output(&mixer.master_output);
        self.audio.set_metronome_output(&mixer.metronome_output);
        self.apply_metronome_sound();
    }

    fn apply_transport(&mut self, action: &TransportAction, before: &TransportState) {
        let loop_enabled = self.state.session.transport.loop_enabled;
        let duration = self.state.session.transport.duration;

        match action {
            TransportAction::Stop | TransportAction::Finished => {
                self.audio.stop_playback();
                self.transport.stop();
            }
            TransportAction::Seek(_) => {
                let position = self.state.session.transport.current_time;
                if self.transport.is_playing() {
                    self.audio.stop_playback();
                    self.transport.seek(position);
                    self.start_playback();
                } else {
                    self.transport.seek(position);
                }
            }
            TransportAction::ToggleLoop => {
                // the running sources were started with the old loop flag
                if self.transport.is_playing() {
                    let now = self.audio.now();
                    self.transport.pause(now, before.loop_enabled, duration);
                    self.audio.stop_playback();
                    self.start_playback();
                }
            }
            TransportAction::Play | TransportAction::Pause | TransportAction::TogglePlay => {
                let playing = self.state.session.transport.playing;
                if playing && !self.transport.is_playing() {
                    self.start_playback();
                } else if !playing && self.transport.is_playing() {
                    let now = self.audio.now();
                    let position = self.transport.pause(now, loop_enabled, duration);
                    self.audio.stop_playback();
                    self.state.session.transport.current_time = position;
                    log::debug!(target: "transport", "paused at {:.3}s", position);
                }
            }
            TransportAction::SetBpm(_) | TransportAction::ToggleMetronome => {}
        }

        let after = &self.state.session.transport;
        if after.playing != before.playing
            || after.metronome_on != before.metronome_on
            || after.bpm != before.bpm
        {
            let should_run = after.playing && after.metronome_on;
            self.audio.sync_metronome(should_run);
        }
    }

    fn start_playback(&mut self) {
        let transport = &self.state.session.transport;
        let start = self.audio.play(&self.state.tracks.tracks, transport.loop_enabled, self.transport.seek_offset());
        self.transport.start(start.reference);
        self.state.session.transport.current_time = self.transport.position();
    }
}

impl Drop for Mixdeck {
    fn drop(&mut self) {
        self.audio.stop_playback();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use mixdeck_audio::{ManualClock, SessionConfig, TestBackend};
    use mixdeck_types::{AudioBuffer, MetronomeSound, MixerAction};

    fn deck() -> (Mixdeck, Arc<TestBackend>, ManualClock) {
        let backend = Arc::new(TestBackend::new());
        let clock = ManualClock::new(10.0);
        let config = SessionConfig { sample_rate: 8_000, ..SessionConfig::default() };
        let audio = AudioSession::new(
            Box::new(mixdeck_audio::SharedTestBackend(backend.clone())),
            Box::new(clock.clone()),
            config,
        )
        .unwrap();
        (Mixdeck::new(AppState::default(), audio), backend, clock)
    }

    fn attach(deck: &mut Mixdeck, index: usize, secs: f64) -> TrackId {
        let id = deck.state.tracks.tracks[index].id;
        let frames = (secs * 8_000.0) as usize;
        let buffer = Arc::new(AudioBuffer::from_channels(8_000, vec![vec![0.25; frames]]));
        deck.dispatch(&Action::Track(TrackAction::LoadAudio {
            id,
            source_name: format!("t{}.wav", index),
            buffer,
        }));
        id
    }

    #[test]
    fn play_pause_resume_keeps_position() {
        let (mut deck, _backend, clock) = deck();
        let id = attach(&mut deck, 0, 20.0);
        deck.dispatch(&Action::Transport(TransportAction::Play));
        assert!(deck.audio.playback().chain(id).is_some());

        clock.advance(2.0);
        deck.tick();
        assert!((deck.state.transport().current_time - 2.0).abs() < 1e-9);

        deck.dispatch(&Action::Transport(TransportAction::TogglePlay));
        assert!(!deck.audio.is_playing());
        assert!((deck.transport.seek_offset() - 2.0).abs() < 1e-9);

        clock.advance(5.0);
        deck.dispatch(&Action::Transport(TransportAction::TogglePlay));
        clock.advance(1.0);
        deck.tick();
        assert!((deck.state.transport().current_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn seek_while_playing_restarts_at_new_offset() {
        let (mut deck, _backend, clock) = deck();
        attach(&mut deck, 0, 20.0);
        deck.dispatch(&Action::Transport(TransportAction::Play));
        clock.advance(1.0);
        deck.dispatch(&Action::Transport(TransportAction::Seek(12.0)));
        assert!(deck.transport.is_playing());
        clock.advance(0.5);
        deck.tick();
        assert!((deck.state.transport().current_time - 12.5).abs() < 1e-9);
    }

    #[test]
    fn metronome_follows_play_and_toggle() {
        let (mut deck, _backend, _clock) = deck();
        deck.dispatch(&Action::Transport(TransportAction::ToggleMetronome));
        assert!(!deck.audio.metronome_running());
        deck.dispatch(&Action::Transport(TransportAction::Play));
        assert!(deck.audio.metronome_running());
        deck.dispatch(&Action::Transport(TransportAction::ToggleMetronome));
        assert!(!deck.audio.metronome_running());
        deck.dispatch(&Action::Transport(TransportAction::ToggleMetronome));
        deck.dispatch(&Action::Transport(TransportAction::Stop));
        assert!(!deck.audio.metronome_running());
    }

    #[test]
    fn sound_selection_reaches_session() {
        let (mut deck, _backend, _clock) = deck();
        deck.dispatch(&Action::Mixer(MixerAction::SetMetronomeSound(MetronomeSound::Cowbell)));
        assert_eq!(deck.audio.metronome_sound(), MetronomeSound::Cowbell);
        assert_eq!(deck.state.session.mixer.metronome_sound, MetronomeSound::Cowbell);
    }

    #[test]
    fn removing_track_releases_hold() {
        let (mut deck, _backend, _clock) = deck();
        let id = attach(&mut deck, 1, 4.0);
        deck.clip_hold.trigger(id, 0.0);
        deck.dispatch(&Action::Track(TrackAction::Remove(id)));
        assert!(!deck.clip_hold.is_holding(id));
        assert!(deck.state.track(id).is_none());
    }

    #[test]
    fn install_project_resets_session() {
        let (mut deck, _backend, _clock) = deck();
        attach(&mut deck, 0, 4.0);
        deck.dispatch(&Action::Mixer(MixerAction::SetMasterVolume(0.2)));
        deck.dispatch(&Action::Transport(TransportAction::Play));

        let transport = TransportState { bpm: 140.0, playing: true, ..TransportState::default() };
        deck.install_project(vec![Track::new(TrackId::new(40), "Bass")], transport);

        assert!(!deck.audio.is_playing());
        assert!(!deck.transport.is_playing());
        assert!(!deck.state.transport().playing);
        assert_eq!(deck.state.transport().bpm, 140.0);
        assert_eq!(deck.state.session.mixer.master_volume, 0.8);
        assert_eq!(deck.state.tracks.tracks.len(), 1);
        assert_eq!(deck.state.tracks.add_track(), TrackId::new(41));
    }
}
