//! # mixdeck-audio
//!
//! The audio-graph layer: builds and tears down per-track signal chains on an
//! abstract node-graph backend, routes them to the master bus or hardware
//! devices, schedules the metronome against the audio clock and watches
//! per-track peaks for clipping.

pub mod buffers;
pub mod chain;
pub mod clip_monitor;
pub mod clock;
pub mod effects;
pub mod engine;
pub mod metronome;
pub mod render;
pub mod router;
pub mod session;
pub mod wav;

pub use clip_monitor::{ClipMonitor, CLIP_THRESHOLD};
pub use clock::{AudioClock, IntervalGate, ManualClock, SystemClock};
pub use engine::{AudioBackend, BackendError, BackendResult, NullBackend, SharedTestBackend, TestBackend, TestOp};
pub use metronome::MetronomeScheduler;
pub use session::{AudioSession, PlayStart, SessionConfig, SessionTick};
pub use wav::{decode_wav, encode_wav, LoadError};
