pub mod buffer;
pub mod device;
pub mod effect;
pub mod midi;
pub mod mixer;
pub mod track;
pub mod track_state;
pub mod transport;

pub use buffer::AudioBuffer;
pub use device::{AudioDeviceInfo, DeviceKind, DeviceState, MidiDeviceInfo, OutputTarget};
pub use effect::{EffectConfig, EffectParams, EffectType};
pub use midi::{ControlId, MidiControl, MidiMappingTarget, MidiMappings, MidiState};
pub use mixer::{MetronomeSound, MixerSettings};
pub use track::{ClipBounds, Track, TRACK_COLORS};
pub use track_state::TrackState;
pub use transport::TransportState;

/// Session-wide state that is not owned by an individual track.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub project_name: String,
    pub transport: TransportState,
    pub mixer: MixerSettings,
    pub midi: MidiState,
    pub devices: DeviceState,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            project_name: "New Project".to_string(),
            ..Self::default()
        }
    }
}
