//! Audio backend trait: a semantic-level abstraction over a node-graph audio
//! subsystem.
//!
//! `AudioBackend` captures what the engine *means* to do (create a gain, wire
//! a source into a panner, ramp a parameter) independently of how the host
//! audio graph carries it out. This enables unit testing of chain and routing
//! logic without a running audio device.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use mixdeck_types::AudioBuffer;

/// Result type for backend operations.
pub type BackendResult<T = ()> = Result<T, BackendError>;

/// Handle of a graph node, allocated by the session.
pub type NodeId = i32;

/// Handle of a buffer uploaded to the backend.
pub type BufferId = i32;

/// Handle of a device sink (stream destination delivered to a hardware device).
pub type SinkId = i32;

/// The hardware default destination. Always present, never freed.
pub const DESTINATION: NodeId = 0;

/// Error from a backend operation.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError(e.to_string())
    }
}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

/// Kinds of node the engine builds graphs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Gain,
    StereoPanner,
    BufferSource,
    Convolver,
    LowPass,
    Delay,
    /// Sine oscillator (LFO)
    Oscillator,
    /// Peak tap
    Analyser,
    Compressor,
    /// Stream destination feeding a device sink
    StreamDestination,
}

/// Automatable parameters on nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioParam {
    Gain,
    Pan,
    Frequency,
    Q,
    DelayTime,
}

impl AudioParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioParam::Gain => "gain",
            AudioParam::Pan => "pan",
            AudioParam::Frequency => "frequency",
            AudioParam::Q => "Q",
            AudioParam::DelayTime => "delayTime",
        }
    }
}

/// How a buffer source plays its buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePlayback {
    /// Audio-clock time to start at
    pub when: f64,
    /// Seconds into the buffer
    pub offset: f64,
    /// Seconds to play; `None` plays until stopped (looping) or the buffer ends
    pub duration: Option<f64>,
    /// Loop region in buffer seconds
    pub loop_region: Option<(f64, f64)>,
}

/// Semantic-level audio backend trait.
///
/// Each method represents a meaningful audio-graph operation. Implementations
/// translate these into host graph calls or record them for testing.
pub trait AudioBackend: Send {
    /// Create a node with the given id.
    fn create_node(&self, node_id: NodeId, kind: NodeKind) -> BackendResult;

    /// Connect a node's output to another node's input.
    fn connect(&self, from: NodeId, to: NodeId) -> BackendResult;

    /// Connect a node's output to a parameter of another node (modulation).
    fn connect_param(&self, from: NodeId, to: NodeId, param: AudioParam) -> BackendResult;

    /// Disconnect all outputs of a node.
    fn disconnect(&self, node_id: NodeId) -> BackendResult;

    /// Free (remove) a node from the graph.
    fn free_node(&self, node_id: NodeId) -> BackendResult;

    /// Set a parameter immediately.
    fn set_param(&self, node_id: NodeId, param: AudioParam, value: f32) -> BackendResult;

    /// Approach a target value exponentially from now with the given time constant.
    fn set_param_smoothed(
        &self,
        node_id: NodeId,
        param: AudioParam,
        target: f32,
        time_constant: f64,
    ) -> BackendResult;

    /// Upload decoded PCM into a backend buffer.
    fn load_buffer(&self, bufnum: BufferId, buffer: &AudioBuffer) -> BackendResult;

    /// Free a backend buffer.
    fn free_buffer(&self, bufnum: BufferId) -> BackendResult;

    /// Attach a buffer to a buffer source or convolver.
    fn assign_buffer(&self, node_id: NodeId, bufnum: BufferId) -> BackendResult;

    /// Start a buffer source.
    fn start_source(&self, node_id: NodeId, playback: &SourcePlayback) -> BackendResult;

    /// Stop a buffer source. Stopping is never reported as a natural end.
    fn stop_source(&self, node_id: NodeId) -> BackendResult;

    /// Start an oscillator at the given audio-clock time.
    fn start_oscillator(&self, node_id: NodeId, when: f64) -> BackendResult;

    /// Current absolute peak seen by an analyser node.
    fn read_peak(&self, node_id: NodeId) -> BackendResult<f32>;

    /// Create a device sink playing the stream of a stream-destination node.
    fn create_sink(&self, sink_id: SinkId, stream: NodeId) -> BackendResult;

    /// Deliver a sink to a hardware output device.
    fn bind_sink(&self, sink_id: SinkId, device_id: &str) -> BackendResult;

    /// Stop and release a device sink.
    fn release_sink(&self, sink_id: SinkId) -> BackendResult;

    /// Deliver the hardware default destination to a device (`None` = system default).
    fn bind_master_output(&self, device_id: Option<&str>) -> BackendResult;

    /// Buffer sources that finished on their own since the last call.
    fn drain_ended(&self) -> Vec<NodeId>;
}

// ─── Test Backend ───────────────────────────────────────────────────

/// An operation recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    CreateNode { node_id: NodeId, kind: NodeKind },
    Connect { from: NodeId, to: NodeId },
    ConnectParam { from: NodeId, to: NodeId, param: AudioParam },
    Disconnect(NodeId),
    FreeNode(NodeId),
    SetParam { node_id: NodeId, param: AudioParam, value: f32 },
    SetParamSmoothed { node_id: NodeId, param: AudioParam, target: f32, time_constant: f64 },
    LoadBuffer { bufnum: BufferId, frames: usize, channels: usize },
    FreeBuffer(BufferId),
    AssignBuffer { node_id: NodeId, bufnum: BufferId },
    StartSource { node_id: NodeId, playback: SourcePlayback },
    StopSource(NodeId),
    StartOscillator { node_id: NodeId, when: f64 },
    CreateSink { sink_id: SinkId, stream: NodeId },
    BindSink { sink_id: SinkId, device_id: String },
    ReleaseSink(SinkId),
    BindMasterOutput(Option<String>),
}

/// A test backend that records all operations into a vector for assertions.
/// All operations succeed by default. Peaks, sink-binding and param
/// connection failures and natural source ends can be injected. Uses `Mutex` for interior
/// mutability so the backend is `Send + Sync`.
pub struct TestBackend {
    ops: Mutex<Vec<TestOp>>,
    peaks: Mutex<HashMap<NodeId, f32>>,
    ended: Mutex<Vec<NodeId>>,
    fail_sink_binding: Mutex<bool>,
    fail_param_connections: Mutex<bool>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            peaks: Mutex::new(HashMap::new()),
            ended: Mutex::new(Vec::new()),
            fail_sink_binding: Mutex::new(false),
            fail_param_connections: Mutex::new(false),
        }
    }

    fn record(&self, op: TestOp) -> BackendResult {
        self.ops.lock().unwrap().push(op);
        Ok(())
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Find the first operation matching a predicate.
    pub fn find<F: Fn(&TestOp) -> bool>(&self, f: F) -> Option<TestOp> {
        self.ops.lock().unwrap().iter().find(|op| f(op)).cloned()
    }

    /// Ids of created nodes of the given kind, in creation order.
    pub fn nodes_created(&self, kind: NodeKind) -> Vec<NodeId> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::CreateNode { node_id, kind: k } if *k == kind => Some(*node_id),
                _ => None,
            })
            .collect()
    }

    /// Return all FreeNode operations.
    pub fn nodes_freed(&self) -> Vec<NodeId> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::FreeNode(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Every started buffer source with its playback.
    pub fn sources_started(&self) -> Vec<(NodeId, SourcePlayback)> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::StartSource { node_id, playback } => Some((*node_id, *playback)),
                _ => None,
            })
            .collect()
    }

    /// Last value written to a parameter, immediate or smoothed.
    pub fn last_param(&self, node_id: NodeId, param: AudioParam) -> Option<f32> {
        self.ops.lock().unwrap().iter().rev().find_map(|op| match op {
            TestOp::SetParam { node_id: n, param: p, value } if *n == node_id && *p == param => {
                Some(*value)
            }
            TestOp::SetParamSmoothed { node_id: n, param: p, target, .. }
                if *n == node_id && *p == param =>
            {
                Some(*target)
            }
            _ => None,
        })
    }

    /// Outgoing connections of a node, in order.
    pub fn connections_from(&self, node_id: NodeId) -> Vec<NodeId> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TestOp::Connect { from, to } if *from == node_id => Some(*to),
                _ => None,
            })
            .collect()
    }

    /// Inject the peak an analyser node will report.
    pub fn set_peak(&self, node_id: NodeId, peak: f32) {
        self.peaks.lock().unwrap().insert(node_id, peak);
    }

    /// Simulate a buffer source reaching the end of its buffer.
    pub fn finish_source(&self, node_id: NodeId) {
        self.ended.lock().unwrap().push(node_id);
    }

    /// Make every subsequent `bind_sink` / `bind_master_output` fail.
    pub fn fail_sink_binding(&self, fail: bool) {
        *self.fail_sink_binding.lock().unwrap() = fail;
    }

    /// Make every subsequent `connect_param` fail after recording.
    pub fn fail_param_connections(&self, fail: bool) {
        *self.fail_param_connections.lock().unwrap() = fail;
    }

    fn sink_binding_result(&self, device_id: &str) -> BackendResult {
        if *self.fail_sink_binding.lock().unwrap() {
            Err(BackendError(format!("device not found: {}", device_id)))
        } else {
            Ok(())
        }
    }
}

impl AudioBackend for TestBackend {
    fn create_node(&self, node_id: NodeId, kind: NodeKind) -> BackendResult {
        self.record(TestOp::CreateNode { node_id, kind })
    }

    fn connect(&self, from: NodeId, to: NodeId) -> BackendResult {
        self.record(TestOp::Connect { from, to })
    }

    fn connect_param(&self, from: NodeId, to: NodeId, param: AudioParam) -> BackendResult {
        self.record(TestOp::ConnectParam { from, to, param })?;
        if *self.fail_param_connections.lock().unwrap() {
            return Err(BackendError(format!("cannot modulate {} on node {}", param.as_str(), to)));
        }
        Ok(())
    }

    fn disconnect(&self, node_id: NodeId) -> BackendResult {
        self.record(TestOp::Disconnect(node_id))
    }

    fn free_node(&self, node_id: NodeId) -> BackendResult {
        self.peaks.lock().unwrap().remove(&node_id);
        self.record(TestOp::FreeNode(node_id))
    }

    fn set_param(&self, node_id: NodeId, param: AudioParam, value: f32) -> BackendResult {
        self.record(TestOp::SetParam { node_id, param, value })
    }

    fn set_param_smoothed(
        &self,
        node_id: NodeId,
        param: AudioParam,
        target: f32,
        time_constant: f64,
    ) -> BackendResult {
        self.record(TestOp::SetParamSmoothed { node_id, param, target, time_constant })
    }

    fn load_buffer(&self, bufnum: BufferId, buffer: &AudioBuffer) -> BackendResult {
        self.record(TestOp::LoadBuffer {
            bufnum,
            frames: buffer.frames(),
            channels: buffer.channel_count(),
        })
    }

    fn free_buffer(&self, bufnum: BufferId) -> BackendResult {
        self.record(TestOp::FreeBuffer(bufnum))
    }

    fn assign_buffer(&self, node_id: NodeId, bufnum: BufferId) -> BackendResult {
        self.record(TestOp::AssignBuffer { node_id, bufnum })
    }

    fn start_source(&self, node_id: NodeId, playback: &SourcePlayback) -> BackendResult {
        self.record(TestOp::StartSource { node_id, playback: *playback })
    }

    fn stop_source(&self, node_id: NodeId) -> BackendResult {
        self.record(TestOp::StopSource(node_id))
    }

    fn start_oscillator(&self, node_id: NodeId, when: f64) -> BackendResult {
        self.record(TestOp::StartOscillator { node_id, when })
    }

    fn read_peak(&self, node_id: NodeId) -> BackendResult<f32> {
        Ok(self.peaks.lock().unwrap().get(&node_id).copied().unwrap_or(0.0))
    }

    fn create_sink(&self, sink_id: SinkId, stream: NodeId) -> BackendResult {
        self.record(TestOp::CreateSink { sink_id, stream })
    }

    fn bind_sink(&self, sink_id: SinkId, device_id: &str) -> BackendResult {
        self.record(TestOp::BindSink { sink_id, device_id: device_id.to_string() })?;
        self.sink_binding_result(device_id)
    }

    fn release_sink(&self, sink_id: SinkId) -> BackendResult {
        self.record(TestOp::ReleaseSink(sink_id))
    }

    fn bind_master_output(&self, device_id: Option<&str>) -> BackendResult {
        self.record(TestOp::BindMasterOutput(device_id.map(str::to_string)))?;
        match device_id {
            Some(id) => self.sink_binding_result(id),
            None => Ok(()),
        }
    }

    fn drain_ended(&self) -> Vec<NodeId> {
        std::mem::take(&mut *self.ended.lock().unwrap())
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps `Arc<TestBackend>` to implement `AudioBackend` so the session can
/// own a `Box<dyn AudioBackend>` while tests retain an `Arc` for assertions.
pub struct SharedTestBackend(pub Arc<TestBackend>);

impl AudioBackend for SharedTestBackend {
    fn create_node(&self, node_id: NodeId, kind: NodeKind) -> BackendResult {
        self.0.create_node(node_id, kind)
    }
    fn connect(&self, from: NodeId, to: NodeId) -> BackendResult {
        self.0.connect(from, to)
    }
    fn connect_param(&self, from: NodeId, to: NodeId, param: AudioParam) -> BackendResult {
        self.0.connect_param(from, to, param)
    }
    fn disconnect(&self, node_id: NodeId) -> BackendResult {
        self.0.disconnect(node_id)
    }
    fn free_node(&self, node_id: NodeId) -> BackendResult {
        self.0.free_node(node_id)
    }
    fn set_param(&self, node_id: NodeId, param: AudioParam, value: f32) -> BackendResult {
        self.0.set_param(node_id, param, value)
    }
    fn set_param_smoothed(&self, node_id: NodeId, param: AudioParam, target: f32, time_constant: f64) -> BackendResult {
        self.0.set_param_smoothed(node_id, param, target, time_constant)
    }
    fn load_buffer(&self, bufnum: BufferId, buffer: &AudioBuffer) -> BackendResult {
        self.0.load_buffer(bufnum, buffer)
    }
    fn free_buffer(&self, bufnum: BufferId) -> BackendResult {
        self.0.free_buffer(bufnum)
    }
    fn assign_buffer(&self, node_id: NodeId, bufnum: BufferId) -> BackendResult {
        self.0.assign_buffer(node_id, bufnum)
    }
    fn start_source(&self, node_id: NodeId, playback: &SourcePlayback) -> BackendResult {
        self.0.start_source(node_id, playback)
    }
    fn stop_source(&self, node_id: NodeId) -> BackendResult {
        self.0.stop_source(node_id)
    }
    fn start_oscillator(&self, node_id: NodeId, when: f64) -> BackendResult {
        self.0.start_oscillator(node_id, when)
    }
    fn read_peak(&self, node_id: NodeId) -> BackendResult<f32> {
        self.0.read_peak(node_id)
    }
    fn create_sink(&self, sink_id: SinkId, stream: NodeId) -> BackendResult {
        self.0.create_sink(sink_id, stream)
    }
    fn bind_sink(&self, sink_id: SinkId, device_id: &str) -> BackendResult {
        self.0.bind_sink(sink_id, device_id)
    }
    fn release_sink(&self, sink_id: SinkId) -> BackendResult {
        self.0.release_sink(sink_id)
    }
    fn bind_master_output(&self, device_id: Option<&str>) -> BackendResult {
        self.0.bind_master_output(device_id)
    }
    fn drain_ended(&self) -> Vec<NodeId> {
        self.0.drain_ended()
    }
}

// ─── NullBackend ────────────────────────────────────────────────────

/// A no-op backend that silently succeeds. Useful as a default when no
/// audio device is attached (headless runs, dry runs).
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn create_node(&self, _: NodeId, _: NodeKind) -> BackendResult { Ok(()) }
    fn connect(&self, _: NodeId, _: NodeId) -> BackendResult { Ok(()) }
    fn connect_param(&self, _: NodeId, _: NodeId, _: AudioParam) -> BackendResult { Ok(()) }
    fn disconnect(&self, _: NodeId) -> BackendResult { Ok(()) }
    fn free_node(&self, _: NodeId) -> BackendResult { Ok(()) }
    fn set_param(&self, _: NodeId, _: AudioParam, _: f32) -> BackendResult { Ok(()) }
    fn set_param_smoothed(&self, _: NodeId, _: AudioParam, _: f32, _: f64) -> BackendResult { Ok(()) }
    fn load_buffer(&self, _: BufferId, _: &AudioBuffer) -> BackendResult { Ok(()) }
    fn free_buffer(&self, _: BufferId) -> BackendResult { Ok(()) }
    fn assign_buffer(&self, _: NodeId, _: BufferId) -> BackendResult { Ok(()) }
    fn start_source(&self, _: NodeId, _: &SourcePlayback) -> BackendResult { Ok(()) }
    fn stop_source(&self, _: NodeId) -> BackendResult { Ok(()) }
    fn start_oscillator(&self, _: NodeId, _: f64) -> BackendResult { Ok(()) }
    fn read_peak(&self, _: NodeId) -> BackendResult<f32> { Ok(0.0) }
    fn create_sink(&self, _: SinkId, _: NodeId) -> BackendResult { Ok(()) }
    fn bind_sink(&self, _: SinkId, _: &str) -> BackendResult { Ok(()) }
    fn release_sink(&self, _: SinkId) -> BackendResult { Ok(()) }
    fn bind_master_output(&self, _: Option<&str>) -> BackendResult { Ok(()) }
    fn drain_ended(&self) -> Vec<NodeId> { Vec::new() }
}
