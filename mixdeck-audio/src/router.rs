//! Output routing: master bus, per-track device outputs and the metronome bus.
//!
//! A track routed to a device gets a dedicated delivery pair (stream
//! destination + device sink). Pairs are created lazily the first time a
//! track plays to a device and are reused across playback sessions until the
//! track is removed or the session is reset. Device binding failures are
//! logged and never fatal: the graph stays wired and audio simply keeps its
//! previous route.

use std::collections::HashMap;

use mixdeck_types::{OutputTarget, TrackId};

use crate::engine::{AudioBackend, BackendResult, GraphContext, NodeId, NodeKind, SinkId};

const OWNER: &str = "router";

/// A stream destination delivered to a hardware device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceOutput {
    pub stream: NodeId,
    pub sink: SinkId,
    /// Device the sink is currently bound to. `None` until a bind succeeds.
    pub bound_device: Option<String>,
}

impl DeviceOutput {
    fn create(ctx: &mut GraphContext<'_>) -> BackendResult<Self> {
        let stream = ctx.create(NodeKind::StreamDestination, OWNER)?;
        let sink = ctx.alloc.sink();
        ctx.backend.create_sink(sink, stream)?;
        Ok(Self { stream, sink, bound_device: None })
    }

    /// Bind the sink to a device. Rebinding to the current device is a no-op.
    fn bind(&mut self, backend: &dyn AudioBackend, device_id: &str, what: &str) {
        if self.bound_device.as_deref() == Some(device_id) {
            return;
        }
        match backend.bind_sink(self.sink, device_id) {
            Ok(()) => self.bound_device = Some(device_id.to_string()),
            Err(e) => log::warn!(
                target: "audio::router",
                "failed to bind {} output to device {}: {}",
                what,
                device_id,
                e
            ),
        }
    }

    fn release(self, ctx: &mut GraphContext<'_>) {
        let _ = ctx.backend.release_sink(self.sink);
        ctx.release(self.stream);
    }
}

/// Routes track panners and the metronome bus to the master bus or to
/// dedicated device outputs.
pub struct OutputRouter {
    master_input: NodeId,
    track_outputs: HashMap<TrackId, DeviceOutput>,
    metronome_output: Option<DeviceOutput>,
    master_device: Option<String>,
}

impl OutputRouter {
    /// `master_input` is the node that feeds the master bus.
    pub fn new(master_input: NodeId) -> Self {
        Self {
            master_input,
            track_outputs: HashMap::new(),
            metronome_output: None,
            master_device: None,
        }
    }

    pub fn master_input(&self) -> NodeId {
        self.master_input
    }

    /// Node a track's panned signal should feed. Creates and binds the
    /// track's device pair on first use.
    pub fn track_destination(
        &mut self,
        ctx: &mut GraphContext<'_>,
        track_id: TrackId,
        target: &OutputTarget,
    ) -> NodeId {
        let OutputTarget::Device(device_id) = target else {
            return self.master_input;
        };
        if !self.track_outputs.contains_key(&track_id) {
            match DeviceOutput::create(ctx) {
                Ok(output) => {
                    log::debug!(
                        target: "audio::router",
                        "created device output for track {} (stream {})",
                        track_id,
                        output.stream
                    );
                    self.track_outputs.insert(track_id, output);
                }
                Err(e) => {
                    log::warn!(
                        target: "audio::router",
                        "device output for track {} unavailable, using master: {}",
                        track_id,
                        e
                    );
                    return self.master_input;
                }
            }
        }
        match self.track_outputs.get_mut(&track_id) {
            Some(output) => {
                output.bind(ctx.backend, device_id, "track");
                output.stream
            }
            None => self.master_input,
        }
    }

    /// Rebind an existing device pair after the track's device changed.
    /// Tracks without a pair get one lazily on their next playback.
    pub fn rebind_track(&mut self, backend: &dyn AudioBackend, track_id: TrackId, target: &OutputTarget) {
        if let (Some(output), OutputTarget::Device(device_id)) =
            (self.track_outputs.get_mut(&track_id), target)
        {
            output.bind(backend, device_id, "track");
        }
    }

    pub fn track_output(&self, track_id: TrackId) -> Option<&DeviceOutput> {
        self.track_outputs.get(&track_id)
    }

    /// Release a track's device pair.
    pub fn release_track(&mut self, ctx: &mut GraphContext<'_>, track_id: TrackId) {
        if let Some(output) = self.track_outputs.remove(&track_id) {
            output.release(ctx);
        }
    }

    /// Re-wire the metronome bus output (its panner) to master or a device.
    pub fn route_metronome(
        &mut self,
        ctx: &mut GraphContext<'_>,
        panner: NodeId,
        target: &OutputTarget,
    ) -> BackendResult {
        let _ = ctx.backend.disconnect(panner);
        let OutputTarget::Device(device_id) = target else {
            return ctx.backend.connect(panner, self.master_input);
        };
        if self.metronome_output.is_none() {
            match DeviceOutput::create(ctx) {
                Ok(output) => self.metronome_output = Some(output),
                Err(e) => {
                    log::warn!(
                        target: "audio::router",
                        "metronome device output unavailable, using master: {}",
                        e
                    );
                    return ctx.backend.connect(panner, self.master_input);
                }
            }
        }
        match self.metronome_output.as_mut() {
            Some(output) => {
                ctx.backend.connect(panner, output.stream)?;
                output.bind(ctx.backend, device_id, "metronome");
                Ok(())
            }
            None => ctx.backend.connect(panner, self.master_input),
        }
    }

    /// Deliver the master bus to a device (or the system default).
    pub fn bind_master(&mut self, backend: &dyn AudioBackend, target: &OutputTarget) {
        let device = target.device_id();
        if self.master_device.as_deref() == device {
            return;
        }
        match backend.bind_master_output(device) {
            Ok(()) => self.master_device = device.map(str::to_string),
            Err(e) => log::warn!(
                target: "audio::router",
                "failed to set master output device {}: {}",
                device.unwrap_or("default"),
                e
            ),
        }
    }

    pub fn master_device(&self) -> Option<&str> {
        self.master_device.as_deref()
    }

    /// Release every device output (track and metronome pairs).
    pub fn release_all(&mut self, ctx: &mut GraphContext<'_>) {
        let ids: Vec<TrackId> = self.track_outputs.keys().copied().collect();
        for id in ids {
            self.release_track(ctx, id);
        }
        if let Some(output) = self.metronome_output.take() {
            output.release(ctx);
        }
    }

    pub fn device_output_count(&self) -> usize {
        self.track_outputs.len() + usize::from(self.metronome_output.is_some())
    }
}
