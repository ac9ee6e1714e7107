#![allow(dead_code)]
//! Test harness utilities for mixdeck-core integration tests.

use std::sync::Arc;

use mixdeck_audio::{AudioSession, ManualClock, SessionConfig, SharedTestBackend, TestBackend};
use mixdeck_core::config::ProjectDefaults;
use mixdeck_core::state::AppState;
use mixdeck_core::Mixdeck;
use mixdeck_types::{Action, AudioBuffer, TrackAction, TrackId};

pub const RATE: u32 = 8_000;

/// A deck on a recording backend and a manual clock starting at `start`.
pub struct Harness {
    pub deck: Mixdeck,
    pub backend: Arc<TestBackend>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(start: f64) -> Self {
        Self::with_tracks(start, 3)
    }

    pub fn with_tracks(start: f64, track_count: usize) -> Self {
        let backend = Arc::new(TestBackend::new());
        let clock = ManualClock::new(start);
        let config = SessionConfig { sample_rate: RATE, ..SessionConfig::default() };
        let audio = AudioSession::new(
            Box::new(SharedTestBackend(Arc::clone(&backend))),
            Box::new(clock.clone()),
            config,
        )
        .unwrap();
        let defaults = ProjectDefaults { track_count, ..ProjectDefaults::default() };
        let deck = Mixdeck::new(AppState::new_with_defaults(&defaults), audio);
        Self { deck, backend, clock }
    }

    pub fn track_id(&self, index: usize) -> TrackId {
        self.deck.state().tracks.tracks[index].id
    }

    /// Attach `secs` of constant audio to the track at `index`.
    pub fn load(&mut self, index: usize, secs: f64) -> TrackId {
        let id = self.track_id(index);
        self.deck.dispatch(&Action::Track(TrackAction::LoadAudio {
            id,
            source_name: format!("clip{}.wav", index),
            buffer: Arc::new(buffer(secs)),
        }));
        id
    }

    pub fn act(&mut self, action: Action) {
        self.deck.dispatch(&action);
    }

    /// Advance the clock in `step` increments up to `until`, ticking each time.
    pub fn run_until(&mut self, until: f64, step: f64) {
        loop {
            self.deck.tick();
            let now = self.deck.audio().now();
            if now >= until {
                break;
            }
            self.clock.set((now + step).min(until));
        }
    }

    pub fn is_playing_track(&self, id: TrackId) -> bool {
        self.deck.audio().playback().chain(id).is_some()
    }
}

pub fn buffer(secs: f64) -> AudioBuffer {
    let frames = (secs * RATE as f64).round() as usize;
    AudioBuffer::from_channels(RATE, vec![vec![0.25; frames]])
}

/// Mono 16-bit WAV bytes.
pub fn wav_bytes(secs: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..(secs * sample_rate as f64) as usize {
            writer.write_sample(8_000i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
