//! The audio session: one explicit object owning the backend, the fixed
//! master and metronome buses, and every per-play resource.
//!
//! ```text
//! track panners ──> master gain ─> compressor ─> destination
//! clicks ─> metronome gain ─> metronome panner ─> master gain (or a device)
//! ```

use std::collections::HashSet;

use mixdeck_types::state::mixer::{DEFAULT_MASTER_VOLUME, DEFAULT_METRONOME_VOLUME};
use mixdeck_types::{MetronomeSound, OutputTarget, Track, TrackId};

use crate::buffers::BufferCache;
use crate::chain::{ChainResources, PlaybackSession, StartOptions};
use crate::clip_monitor::{ClipMonitor, DEFAULT_POLL_INTERVAL_SECS};
use crate::clock::{AudioClock, IntervalGate};
use crate::engine::{
    AudioBackend, AudioParam, BackendResult, BufferId, GraphContext, NodeAllocator, NodeId,
    NodeKind, NodeRegistry, DESTINATION,
};
use crate::metronome::{
    MetronomeScheduler, MetronomeVoices, DEFAULT_LOOKAHEAD_SECS, DEFAULT_SCHEDULE_INTERVAL_SECS,
};
use crate::render::reverb_impulse;
use crate::router::OutputRouter;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_PARAM_SMOOTHING_SECS: f64 = 0.05;

const OWNER: &str = "session";

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub lookahead: f64,
    pub schedule_interval: f64,
    pub clip_poll_interval: f64,
    /// Time constant for live parameter changes
    pub param_smoothing: f64,
    /// Seed of the reverb impulse noise
    pub impulse_seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            lookahead: DEFAULT_LOOKAHEAD_SECS,
            schedule_interval: DEFAULT_SCHEDULE_INTERVAL_SECS,
            clip_poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            param_smoothing: DEFAULT_PARAM_SMOOTHING_SECS,
            impulse_seed: 0x1337_5eed,
        }
    }
}

/// Result of starting playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayStart {
    /// Audio-clock time playback started at
    pub reference: f64,
    pub started: Vec<TrackId>,
}

/// What happened during one session tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTick {
    pub now: f64,
    /// Tracks whose sources reached the end of their clip
    pub finished: Vec<TrackId>,
    /// Tracks whose peak tap reached the clip threshold
    pub clipped: Vec<TrackId>,
    /// Metronome clicks scheduled this tick
    pub clicks: usize,
}

/// Borrow the graph context from disjoint session fields.
macro_rules! graph_ctx {
    ($s:ident) => {
        GraphContext {
            backend: &*$s.backend,
            alloc: &mut $s.alloc,
            registry: &mut $s.registry,
        }
    };
}

pub struct AudioSession {
    backend: Box<dyn AudioBackend>,
    clock: Box<dyn AudioClock>,
    config: SessionConfig,
    alloc: NodeAllocator,
    registry: NodeRegistry,
    buffers: BufferCache,
    /// Tracks whose uploaded buffer is out of date but still playing
    stale_buffers: HashSet<TrackId>,
    impulse: Option<BufferId>,
    master_gain: NodeId,
    compressor: NodeId,
    metronome_gain: NodeId,
    metronome_panner: NodeId,
    router: OutputRouter,
    playback: PlaybackSession,
    scheduler: MetronomeScheduler,
    schedule_gate: IntervalGate,
    voices: MetronomeVoices,
    monitor: ClipMonitor,
}

impl AudioSession {
    /// Build the fixed buses, render the reverb impulse and the metronome
    /// sounds. Fails only if the buses cannot be created.
    pub fn new(
        backend: Box<dyn AudioBackend>,
        clock: Box<dyn AudioClock>,
        config: SessionConfig,
    ) -> BackendResult<Self> {
        let mut alloc = NodeAllocator::new();
        let mut registry = NodeRegistry::new();

        let (master_gain, compressor, metronome_gain, metronome_panner) = {
            let mut ctx = GraphContext { backend: &*backend, alloc: &mut alloc, registry: &mut registry };
            let master_gain = ctx.create(NodeKind::Gain, OWNER)?;
            let compressor = ctx.create(NodeKind::Compressor, OWNER)?;
            let metronome_gain = ctx.create(NodeKind::Gain, OWNER)?;
            let metronome_panner = ctx.create(NodeKind::StereoPanner, OWNER)?;
            backend.set_param(master_gain, AudioParam::Gain, DEFAULT_MASTER_VOLUME)?;
            backend.connect(master_gain, compressor)?;
            backend.connect(compressor, DESTINATION)?;
            backend.set_param(metronome_gain, AudioParam::Gain, DEFAULT_METRONOME_VOLUME)?;
            backend.set_param(metronome_panner, AudioParam::Pan, 0.0)?;
            backend.connect(metronome_gain, metronome_panner)?;
            backend.connect(metronome_panner, master_gain)?;
            (master_gain, compressor, metronome_gain, metronome_panner)
        };

        let impulse_buffer = reverb_impulse(config.sample_rate, config.impulse_seed);
        let bufnum = alloc.buffer();
        let impulse = match backend.load_buffer(bufnum, &impulse_buffer) {
            Ok(()) => Some(bufnum),
            Err(e) => {
                log::warn!(target: "audio", "reverb impulse unavailable, reverb falls back to dry: {}", e);
                None
            }
        };

        let mut voices = MetronomeVoices::new();
        voices.load_sounds(&*backend, &mut alloc, config.sample_rate);

        log::info!(
            target: "audio",
            "audio session ready ({} Hz, lookahead {:.0} ms)",
            config.sample_rate,
            config.lookahead * 1000.0
        );

        Ok(Self {
            backend,
            clock,
            config,
            alloc,
            registry,
            buffers: BufferCache::new(),
            stale_buffers: HashSet::new(),
            impulse,
            master_gain,
            compressor,
            metronome_gain,
            metronome_panner,
            router: OutputRouter::new(master_gain),
            playback: PlaybackSession::new(),
            scheduler: MetronomeScheduler::new(config.lookahead),
            schedule_gate: IntervalGate::new(config.schedule_interval),
            voices,
            monitor: ClipMonitor::new(config.clip_poll_interval),
        })
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn backend(&self) -> &dyn AudioBackend {
        &*self.backend
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn master_bus(&self) -> NodeId {
        self.master_gain
    }

    pub fn metronome_bus(&self) -> NodeId {
        self.metronome_gain
    }

    pub fn playback(&self) -> &PlaybackSession {
        &self.playback
    }

    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    // ── Playback ────────────────────────────────────────────────────

    /// Start a playback cycle `offset` seconds into every clip. Any running
    /// cycle is released first.
    pub fn play(&mut self, tracks: &[Track], loop_enabled: bool, offset: f64) -> PlayStart {
        self.stop_playback();
        let reference = self.clock.now();
        let mut ctx = graph_ctx!(self);
        let mut res = ChainResources {
            buffers: &mut self.buffers,
            router: &mut self.router,
            impulse: self.impulse,
        };
        let started = self.playback.start(
            &mut ctx,
            &mut res,
            tracks,
            StartOptions { loop_enabled, offset, when: reference },
        );
        log::info!(target: "audio", "playback started at {:.3}s with {} track(s)", offset, started.len());
        PlayStart { reference, started }
    }

    /// Release every handle of the running cycle. Safe to call when idle.
    pub fn stop_playback(&mut self) {
        if self.playback.is_active() {
            log::debug!(target: "audio", "stopping playback");
        }
        let mut ctx = graph_ctx!(self);
        self.playback.stop_all(&mut ctx);
        self.free_stale_buffers();
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }

    /// Push a track's live parameters into its running chain.
    pub fn update_track(&self, track: &Track) {
        if let Err(e) = self.playback.update_params(&*self.backend, track, self.config.param_smoothing) {
            log::warn!(target: "audio", "failed to update track {}: {}", track.id, e);
        }
    }

    /// Release a playing track's chain and build it again `offset` seconds
    /// into its clip, starting now. Picks up structural changes such as the
    /// effect type. Returns whether the track is playing afterwards; a track
    /// that was not playing is left alone.
    pub fn rebuild_track(&mut self, track: &Track, loop_enabled: bool, offset: f64) -> bool {
        let when = self.clock.now();
        let mut ctx = graph_ctx!(self);
        if !self.playback.release_track(&mut ctx, track.id) {
            return false;
        }
        self.free_stale_buffers();

        let mut ctx = graph_ctx!(self);
        let mut res = ChainResources {
            buffers: &mut self.buffers,
            router: &mut self.router,
            impulse: self.impulse,
        };
        let options = StartOptions { loop_enabled, offset, when };
        let rebuilt = self.playback.start_single(&mut ctx, &mut res, track, options);
        log::debug!(
            target: "audio",
            "track {} rebuilt with {} at {:.3}s",
            track.id,
            track.effect.effect_type.name(),
            offset
        );
        rebuilt
    }

    /// Apply a track's output target to an existing device pair.
    pub fn route_track(&mut self, track: &Track) {
        self.router.rebind_track(&*self.backend, track.id, &track.output);
    }

    /// Tear down everything bound to a removed track.
    pub fn remove_track(&mut self, track_id: TrackId) {
        let mut ctx = graph_ctx!(self);
        self.playback.release_track(&mut ctx, track_id);
        self.router.release_track(&mut ctx, track_id);
        self.buffers.free(&*self.backend, track_id);
        self.stale_buffers.remove(&track_id);
    }

    /// Drop a track's uploaded buffer after its audio was cleared or
    /// replaced. A playing source keeps it until that track's chain is
    /// released.
    pub fn forget_buffer(&mut self, track_id: TrackId) {
        if self.playback.chain(track_id).is_some() {
            self.stale_buffers.insert(track_id);
        } else {
            self.buffers.free(&*self.backend, track_id);
        }
    }

    pub fn buffer_loaded(&self, track_id: TrackId) -> bool {
        self.buffers.is_loaded(track_id)
    }

    fn free_stale_buffers(&mut self) {
        let playback = &self.playback;
        let released: Vec<TrackId> = self
            .stale_buffers
            .iter()
            .copied()
            .filter(|id| playback.chain(*id).is_none())
            .collect();
        for id in released {
            self.stale_buffers.remove(&id);
            self.buffers.free(&*self.backend, id);
            log::debug!(target: "audio", "freed replaced buffer of track {}", id);
        }
    }

    // ── Master and metronome buses ──────────────────────────────────

    fn set_smoothed(&self, node: NodeId, param: AudioParam, value: f32) {
        if let Err(e) = self.backend.set_param_smoothed(node, param, value, self.config.param_smoothing) {
            log::warn!(target: "audio", "failed to set {} on node {}: {}", param.as_str(), node, e);
        }
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.set_smoothed(self.master_gain, AudioParam::Gain, volume.clamp(0.0, 1.0));
    }

    pub fn set_metronome_volume(&self, volume: f32) {
        self.set_smoothed(self.metronome_gain, AudioParam::Gain, volume.clamp(0.0, 1.0));
    }

    pub fn set_metronome_pan(&self, pan: f32) {
        self.set_smoothed(self.metronome_panner, AudioParam::Pan, pan.clamp(-1.0, 1.0));
    }

    pub fn set_master_output(&mut self, target: &OutputTarget) {
        self.router.bind_master(&*self.backend, target);
    }

    pub fn set_metronome_output(&mut self, target: &OutputTarget) {
        let mut ctx = graph_ctx!(self);
        if let Err(e) = self.router.route_metronome(&mut ctx, self.metronome_panner, target) {
            log::warn!(target: "audio::router", "failed to route metronome: {}", e);
        }
    }

    // ── Metronome ───────────────────────────────────────────────────

    /// Select the click sound. Ignored unless the sound is loaded.
    pub fn select_metronome_sound(&mut self, sound: MetronomeSound) -> bool {
        self.voices.select(sound)
    }

    pub fn metronome_sound(&self) -> MetronomeSound {
        self.voices.selected()
    }

    /// Play a sound once, right now, through the metronome bus.
    pub fn preview_metronome(&mut self, sound: MetronomeSound) {
        let now = self.clock.now();
        let bus = self.metronome_gain;
        let mut ctx = graph_ctx!(self);
        if let Err(e) = self.voices.trigger(&mut ctx, sound, now, bus) {
            log::warn!(target: "audio", "metronome preview failed: {}", e);
        }
    }

    /// Run or stop the scheduler. A run request always restarts from now.
    pub fn sync_metronome(&mut self, should_run: bool) {
        if should_run {
            let now = self.clock.now();
            self.scheduler.restart(now);
            self.schedule_gate.reset();
            log::debug!(target: "audio", "metronome scheduling from {:.3}s", now);
        } else {
            self.scheduler.stop();
        }
    }

    pub fn metronome_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // ── Clip monitor ────────────────────────────────────────────────

    pub fn enable_clip_monitor(&mut self) {
        self.monitor.enable();
    }

    pub fn disable_clip_monitor(&mut self) {
        self.monitor.disable();
    }

    pub fn clip_monitor_enabled(&self) -> bool {
        self.monitor.has_consumer()
    }

    // ── Periodic work ───────────────────────────────────────────────

    /// Reap ended sources, schedule due clicks and poll peaks. Each loop runs
    /// on its own interval gate, so this may be called as often as wanted.
    pub fn tick(&mut self, bpm: f32) -> SessionTick {
        let now = self.clock.now();
        let ended = self.backend.drain_ended();

        let mut ctx = graph_ctx!(self);
        self.voices.release_ended(&mut ctx, &ended);
        let finished = self.playback.handle_ended(&mut ctx, &ended);

        let mut clicks = 0;
        if self.scheduler.is_running() && self.schedule_gate.ready(now) {
            let sound = self.voices.selected();
            for when in self.scheduler.tick(now, bpm) {
                match self.voices.trigger(&mut ctx, sound, when, self.metronome_gain) {
                    Ok(_) => clicks += 1,
                    Err(e) => log::warn!(target: "audio", "metronome click at {:.3}s failed: {}", when, e),
                }
            }
        }

        if !finished.is_empty() {
            self.free_stale_buffers();
        }

        let clipped = self.monitor.poll(now, &*self.backend, self.playback.taps());
        SessionTick { now, finished, clipped, clicks }
    }

    /// Return to a fresh-session state: playback and clicks stopped, device
    /// outputs released, default levels and routing restored.
    pub fn reset(&mut self) {
        let mut ctx = graph_ctx!(self);
        self.playback.stop_all(&mut ctx);
        self.voices.silence(&mut ctx);
        self.router.release_all(&mut ctx);
        self.scheduler.stop();
        self.buffers.free_all(&*self.backend);
        self.stale_buffers.clear();

        let backend = &*self.backend;
        let _ = backend.set_param(self.master_gain, AudioParam::Gain, DEFAULT_MASTER_VOLUME);
        let _ = backend.set_param(self.metronome_gain, AudioParam::Gain, DEFAULT_METRONOME_VOLUME);
        let _ = backend.set_param(self.metronome_panner, AudioParam::Pan, 0.0);
        self.router.bind_master(backend, &OutputTarget::Master);
        self.set_metronome_output(&OutputTarget::Master);

        for (owner, count) in self.registry.leaks(OWNER) {
            log::warn!(target: "audio::nodes", "{} {} node(s) survived reset", count, owner);
        }
        log::info!(target: "audio", "audio session reset ({} live nodes)", self.registry.live_count());
    }

    /// Free every node, including the fixed buses.
    pub fn shutdown(&mut self) {
        self.reset();
        let mut ctx = graph_ctx!(self);
        for node in [self.metronome_panner, self.metronome_gain, self.compressor, self.master_gain] {
            ctx.release(node);
        }
        if let Some(impulse) = self.impulse.take() {
            let _ = self.backend.free_buffer(impulse);
        }
    }
}
