//! Look-ahead metronome.
//!
//! `MetronomeScheduler` decides *when* clicks sound; `MetronomeVoices` owns the
//! rendered click buffers and the one-shot sources that play them.

use std::collections::{HashMap, HashSet};

use mixdeck_types::MetronomeSound;

use crate::engine::{
    AudioBackend, BackendResult, BufferId, GraphContext, NodeAllocator, NodeId, NodeKind,
    SourcePlayback,
};
use crate::render::metronome_sound;

pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.1;
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: f64 = 0.025;

const OWNER: &str = "metronome";

/// Schedules clicks a short window ahead of the audio clock.
#[derive(Debug, Clone)]
pub struct MetronomeScheduler {
    lookahead: f64,
    next_note_time: f64,
    running: bool,
}

impl MetronomeScheduler {
    pub fn new(lookahead: f64) -> Self {
        Self { lookahead, next_note_time: 0.0, running: false }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    /// Start scheduling from `now`. Returns `false` if already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.next_note_time = now;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Stop, then start from `now`.
    pub fn restart(&mut self, now: f64) {
        self.stop();
        self.start(now);
    }

    /// Note times inside the look-ahead window, in order. Advances past them.
    pub fn tick(&mut self, now: f64, bpm: f32) -> Vec<f64> {
        if !self.running || !bpm.is_finite() || bpm <= 0.0 {
            return Vec::new();
        }
        let interval = 60.0 / bpm as f64;
        let horizon = now + self.lookahead;
        let mut notes = Vec::new();
        while self.next_note_time < horizon {
            notes.push(self.next_note_time);
            self.next_note_time += interval;
        }
        notes
    }
}

impl Default for MetronomeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_SECS)
    }
}

/// Rendered click buffers plus the one-shot sources currently sounding.
#[derive(Default)]
pub struct MetronomeVoices {
    sounds: HashMap<MetronomeSound, BufferId>,
    selected: MetronomeSound,
    one_shots: HashSet<NodeId>,
}

impl MetronomeVoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render and upload every sound. A sound that fails to upload is left
    /// unavailable and cannot be selected.
    pub fn load_sounds(&mut self, backend: &dyn AudioBackend, alloc: &mut NodeAllocator, sample_rate: u32) {
        for sound in MetronomeSound::ALL {
            let buffer = metronome_sound(sound, sample_rate);
            let bufnum = alloc.buffer();
            match backend.load_buffer(bufnum, &buffer) {
                Ok(()) => {
                    self.sounds.insert(sound, bufnum);
                }
                Err(e) => log::warn!(target: "audio", "metronome sound {} unavailable: {}", sound.id(), e),
            }
        }
    }

    pub fn is_loaded(&self, sound: MetronomeSound) -> bool {
        self.sounds.contains_key(&sound)
    }

    pub fn selected(&self) -> MetronomeSound {
        self.selected
    }

    /// Select the sound for future clicks. Ignored unless it is loaded.
    pub fn select(&mut self, sound: MetronomeSound) -> bool {
        if !self.is_loaded(sound) {
            log::debug!(target: "audio", "ignoring unloaded metronome sound {}", sound.id());
            return false;
        }
        self.selected = sound;
        true
    }

    /// Play `sound` once at `when` into `bus`.
    pub fn trigger(
        &mut self,
        ctx: &mut GraphContext<'_>,
        sound: MetronomeSound,
        when: f64,
        bus: NodeId,
    ) -> BackendResult<NodeId> {
        let Some(&bufnum) = self.sounds.get(&sound) else {
            return Err(format!("metronome sound {} not loaded", sound.id()).into());
        };
        let source = ctx.create(NodeKind::BufferSource, OWNER)?;
        self.one_shots.insert(source);
        ctx.backend.assign_buffer(source, bufnum)?;
        ctx.backend.connect(source, bus)?;
        ctx.backend.start_source(
            source,
            &SourcePlayback { when, offset: 0.0, duration: None, loop_region: None },
        )?;
        Ok(source)
    }

    /// Free one-shots that finished. Ids this object does not own are ignored.
    pub fn release_ended(&mut self, ctx: &mut GraphContext<'_>, ended: &[NodeId]) -> usize {
        let mut released = 0;
        for node in ended {
            if self.one_shots.remove(node) {
                ctx.release(*node);
                released += 1;
            }
        }
        released
    }

    pub fn active_count(&self) -> usize {
        self.one_shots.len()
    }

    /// Stop and free every sounding one-shot.
    pub fn silence(&mut self, ctx: &mut GraphContext<'_>) {
        for node in self.one_shots.drain() {
            let _ = ctx.backend.stop_source(node);
            ctx.release(node);
        }
    }
}
