//! Signal chain builder and the playback session that owns its handles.
//!
//! Per eligible track:
//!
//! ```text
//! source ─┬─> dry gain ──────────────┐
//!         └─> effect ──> wet gain ───┴─> output gain ─> analyser ─> panner ─> router
//! ```
//!
//! Handles live only for one play cycle. `PlaybackSession::stop_all` is the
//! single release point for a cycle; a natural source end releases just that
//! track.

use std::collections::HashMap;

use mixdeck_types::{Track, TrackId};

use crate::buffers::BufferCache;
use crate::effects::{build_effect, EffectChain};
use crate::engine::{AudioBackend, AudioParam, BackendResult, BufferId, GraphContext, NodeId, NodeKind, SourcePlayback};
use crate::router::OutputRouter;

const OWNER: &str = "chain";

/// Live graph handles for one playing track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChain {
    pub track_id: TrackId,
    pub source: NodeId,
    pub dry: NodeId,
    pub wet: NodeId,
    pub effect: EffectChain,
    pub output_gain: NodeId,
    pub analyser: NodeId,
    pub panner: NodeId,
}

impl TrackChain {
    fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.source, self.dry, self.wet];
        nodes.extend(self.effect.nodes());
        nodes.extend([self.output_gain, self.analyser, self.panner]);
        nodes
    }

    /// Stop the source (if still running) and free every node.
    fn release(&self, ctx: &mut GraphContext<'_>, stop_source: bool) {
        if stop_source {
            let _ = ctx.backend.stop_source(self.source);
        }
        for node in [self.source, self.dry, self.wet, self.output_gain, self.analyser, self.panner] {
            ctx.release(node);
        }
        self.effect.release(ctx);
    }
}

/// Parameters of one playback start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartOptions {
    pub loop_enabled: bool,
    /// Seconds into every clip
    pub offset: f64,
    /// Audio-clock time the sources start at
    pub when: f64,
}

/// Shared resources a chain build draws on.
pub struct ChainResources<'r> {
    pub buffers: &'r mut BufferCache,
    pub router: &'r mut OutputRouter,
    pub impulse: Option<BufferId>,
}

/// Tracks that take part in playback: with audio, not muted, and soloed if
/// any track is soloed.
pub fn eligible_tracks(tracks: &[Track]) -> impl Iterator<Item = &Track> {
    let any_solo = tracks.iter().any(|t| t.solo);
    tracks
        .iter()
        .filter(move |t| t.has_audio() && !t.muted && (!any_solo || t.solo))
}

/// How a source plays a clip from `offset`, or `None` when the offset is past
/// the clip.
pub fn clip_playback(track: &Track, options: &StartOptions) -> Option<SourcePlayback> {
    let bounds = track.clip_bounds()?;
    let offset = options.offset.max(0.0);
    if !bounds.accepts_offset(offset) {
        return None;
    }
    Some(SourcePlayback {
        when: options.when,
        offset: bounds.start + offset,
        duration: if options.loop_enabled {
            None
        } else {
            Some(bounds.duration() - offset)
        },
        loop_region: options.loop_enabled.then_some((bounds.start, bounds.end)),
    })
}

/// The handles of one play cycle, keyed by track id.
#[derive(Default)]
pub struct PlaybackSession {
    chains: HashMap<TrackId, TrackChain>,
    sources: HashMap<NodeId, TrackId>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.chains.is_empty()
    }

    pub fn chain(&self, track_id: TrackId) -> Option<&TrackChain> {
        self.chains.get(&track_id)
    }

    pub fn playing_tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.chains.keys().copied()
    }

    /// Peak taps of every playing track.
    pub fn taps(&self) -> impl Iterator<Item = (TrackId, NodeId)> + '_ {
        self.chains.values().map(|c| (c.track_id, c.analyser))
    }

    /// Build and start chains for every eligible track. Any previous cycle is
    /// released first. Returns the tracks that started.
    pub fn start(
        &mut self,
        ctx: &mut GraphContext<'_>,
        res: &mut ChainResources<'_>,
        tracks: &[Track],
        options: StartOptions,
    ) -> Vec<TrackId> {
        self.stop_all(ctx);

        let mut started = Vec::new();
        for track in eligible_tracks(tracks) {
            let Some(playback) = clip_playback(track, &options) else {
                log::debug!(
                    target: "audio::chain",
                    "track {} skipped: offset {:.3}s is past the clip",
                    track.id,
                    options.offset
                );
                continue;
            };
            if self.insert_track(ctx, res, track, &playback) {
                started.push(track.id);
            }
        }
        log::debug!(target: "audio::chain", "started {} track(s) at {:.3}s", started.len(), options.offset);
        started
    }

    /// Build and start one track's chain from `options`, for a track that
    /// was released out of a running cycle. Returns whether it started.
    pub fn start_single(
        &mut self,
        ctx: &mut GraphContext<'_>,
        res: &mut ChainResources<'_>,
        track: &Track,
        options: StartOptions,
    ) -> bool {
        if self.chains.contains_key(&track.id) {
            return true;
        }
        match clip_playback(track, &options) {
            Some(playback) => self.insert_track(ctx, res, track, &playback),
            None => {
                log::debug!(
                    target: "audio::chain",
                    "track {} not restarted: offset {:.3}s is past the clip",
                    track.id,
                    options.offset
                );
                false
            }
        }
    }

    fn insert_track(
        &mut self,
        ctx: &mut GraphContext<'_>,
        res: &mut ChainResources<'_>,
        track: &Track,
        playback: &SourcePlayback,
    ) -> bool {
        match self.start_track(ctx, res, track, playback) {
            Ok(chain) => {
                self.sources.insert(chain.source, track.id);
                self.chains.insert(track.id, chain);
                true
            }
            Err(e) => {
                log::warn!(target: "audio::chain", "track {} failed to start: {}", track.id, e);
                false
            }
        }
    }

    fn start_track(
        &mut self,
        ctx: &mut GraphContext<'_>,
        res: &mut ChainResources<'_>,
        track: &Track,
        playback: &SourcePlayback,
    ) -> BackendResult<TrackChain> {
        let Some(buffer) = track.buffer.as_ref() else {
            return Err("track has no buffer".to_string().into());
        };
        let bufnum = res.buffers.ensure(ctx.backend, ctx.alloc, track.id, buffer)?;

        let mut created: Vec<NodeId> = Vec::new();
        let result = build_chain(ctx, res, track, bufnum, playback, &mut created);
        if result.is_err() {
            for node in created {
                ctx.release(node);
            }
        }
        result
    }

    /// Push a track's volume, pan, dry/wet and effect parameters into its
    /// live chain. No-op if the track is not playing. A changed effect type
    /// needs a rebuild; its parameters are left alone here.
    pub fn update_params(&self, backend: &dyn AudioBackend, track: &Track, time_constant: f64) -> BackendResult {
        let Some(chain) = self.chains.get(&track.id) else {
            return Ok(());
        };
        backend.set_param_smoothed(chain.output_gain, AudioParam::Gain, track.volume, time_constant)?;
        backend.set_param_smoothed(chain.panner, AudioParam::Pan, track.pan, time_constant)?;
        backend.set_param_smoothed(chain.dry, AudioParam::Gain, track.effect.dry_gain(), time_constant)?;
        backend.set_param_smoothed(chain.wet, AudioParam::Gain, track.effect.wet_gain(), time_constant)?;
        if chain.effect.effect_type == track.effect.effect_type {
            chain.effect.update_params(backend, &track.effect.params, time_constant)?;
        }
        Ok(())
    }

    /// Stop and release one track's chain. Returns whether it was playing.
    pub fn release_track(&mut self, ctx: &mut GraphContext<'_>, track_id: TrackId) -> bool {
        match self.chains.remove(&track_id) {
            Some(chain) => {
                self.sources.remove(&chain.source);
                chain.release(ctx, true);
                true
            }
            None => false,
        }
    }

    /// Release chains whose sources ended naturally. Returns their tracks.
    /// Sources not owned by this cycle are ignored.
    pub fn handle_ended(&mut self, ctx: &mut GraphContext<'_>, ended: &[NodeId]) -> Vec<TrackId> {
        let mut finished = Vec::new();
        for source in ended {
            let Some(track_id) = self.sources.remove(source) else {
                continue;
            };
            if let Some(chain) = self.chains.remove(&track_id) {
                chain.release(ctx, false);
                log::debug!(target: "audio::chain", "track {} reached the end of its clip", track_id);
                finished.push(track_id);
            }
        }
        finished
    }

    /// Stop every source and release every handle.
    pub fn stop_all(&mut self, ctx: &mut GraphContext<'_>) {
        for (_, chain) in self.chains.drain() {
            chain.release(ctx, true);
        }
        self.sources.clear();
    }
}

fn build_chain(
    ctx: &mut GraphContext<'_>,
    res: &mut ChainResources<'_>,
    track: &Track,
    bufnum: BufferId,
    playback: &SourcePlayback,
    created: &mut Vec<NodeId>,
) -> BackendResult<TrackChain> {
    let mut node = |ctx: &mut GraphContext<'_>, kind: NodeKind| -> BackendResult<NodeId> {
        let id = ctx.create(kind, OWNER)?;
        created.push(id);
        Ok(id)
    };

    let source = node(ctx, NodeKind::BufferSource)?;
    let dry = node(ctx, NodeKind::Gain)?;
    let wet = node(ctx, NodeKind::Gain)?;
    let output_gain = node(ctx, NodeKind::Gain)?;
    let analyser = node(ctx, NodeKind::Analyser)?;
    let panner = node(ctx, NodeKind::StereoPanner)?;

    let effect = build_effect(
        ctx,
        track.effect.effect_type,
        &track.effect.params,
        res.impulse,
        playback.when,
    )?;
    created.extend(effect.nodes());

    let backend = ctx.backend;
    backend.assign_buffer(source, bufnum)?;
    backend.connect(source, dry)?;
    backend.connect(source, effect.input)?;
    backend.connect(effect.output, wet)?;
    backend.connect(dry, output_gain)?;
    backend.connect(wet, output_gain)?;
    backend.connect(output_gain, analyser)?;
    backend.connect(analyser, panner)?;

    backend.set_param(dry, AudioParam::Gain, track.effect.dry_gain())?;
    backend.set_param(wet, AudioParam::Gain, track.effect.wet_gain())?;
    backend.set_param(output_gain, AudioParam::Gain, track.volume)?;
    backend.set_param(panner, AudioParam::Pan, track.pan)?;

    let destination = res.router.track_destination(ctx, track.id, &track.output);
    ctx.backend.connect(panner, destination)?;
    ctx.backend.start_source(source, playback)?;

    Ok(TrackChain {
        track_id: track.id,
        source,
        dry,
        wet,
        effect,
        output_gain,
        analyser,
        panner,
    })
}
