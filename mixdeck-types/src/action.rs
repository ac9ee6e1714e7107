//! Action types for the dispatch system.
//!
//! Actions represent user intents (UI, MIDI controller, persistence) that flow
//! through `dispatch_action`. State mutation lives in `crate::reduce`; the
//! audio-side consequences are described by `AudioEffect` values on the
//! returned `DispatchResult`.

use std::sync::Arc;

use crate::{
    AudioBuffer, AudioDeviceInfo, ControlId, EffectType, MetronomeSound, MidiDeviceInfo,
    MidiMappingTarget, OutputTarget, TrackId,
};

/// Identifies one generic effect parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectParamKind {
    Param1,
    Param2,
    Param3,
}

/// Per-track actions.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackAction {
    Add,
    Remove(TrackId),
    Select(TrackId),
    Rename(TrackId, String),
    SetColor(TrackId, String),
    SetIcon(TrackId, Option<String>),
    /// Decoded audio attached to a track (file load or recording import).
    /// Renames from `source_name`, resets trims and grows the timeline.
    LoadAudio {
        id: TrackId,
        source_name: String,
        buffer: Arc<AudioBuffer>,
    },
    ClearAudio(TrackId),
    SetVolume(TrackId, f32),
    SetPan(TrackId, f32),
    ToggleMute(TrackId),
    ToggleSolo(TrackId),
    SetEffectType(TrackId, EffectType),
    SetDryWet(TrackId, f32),
    SetEffectParam(TrackId, EffectParamKind, f32),
    /// `end <= 0` means the full buffer
    SetTrim { id: TrackId, start: f64, end: f64 },
    SetInputDevice(TrackId, Option<String>),
    SetOutput(TrackId, OutputTarget),
    SetClipping(TrackId, bool),
}

/// Transport control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportAction {
    TogglePlay,
    Play,
    Pause,
    /// Full reset: playback halts and the playhead returns to 0
    Stop,
    ToggleLoop,
    SetBpm(f32),
    ToggleMetronome,
    /// Move the playhead. Applied through pause-then-resume while playing.
    Seek(f64),
    /// Playback reached the end of the timeline without looping.
    Finished,
}

/// Master and metronome bus actions.
#[derive(Debug, Clone, PartialEq)]
pub enum MixerAction {
    SetMasterVolume(f32),
    SetMetronomeVolume(f32),
    SetMetronomePan(f32),
    SetMetronomeSound(MetronomeSound),
    /// Play the given sound once through the metronome bus
    PreviewMetronome(MetronomeSound),
    SetMasterOutput(OutputTarget),
    SetMetronomeOutput(OutputTarget),
}

/// MIDI learn and mapping actions.
#[derive(Debug, Clone, PartialEq)]
pub enum MidiAction {
    ToggleLearn,
    /// Designate the logical target the next learned control binds to
    SetLearnTarget(Option<MidiMappingTarget>),
    /// Bind a physical control identity to a target. Ends learn mode.
    Bind(ControlId, MidiMappingTarget),
    Unbind(ControlId),
    SetDevices(Vec<MidiDeviceInfo>),
    SetDeviceEnabled(String, bool),
}

/// Audio device enumeration results from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    SetAudioDevices(Vec<AudioDeviceInfo>),
    SetInputEnabled(String, bool),
    SetOutputEnabled(String, bool),
}

/// Top-level action enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Track(TrackAction),
    Transport(TransportAction),
    Mixer(MixerAction),
    Midi(MidiAction),
    Device(DeviceAction),
    SetProjectName(String),
}

// ============================================================================
// AudioEffect, Notice and DispatchResult
// ============================================================================

/// What the audio session must do after a state change.
///
/// Parameter effects are applied to live handles without a rebuild. An
/// effect type change rebuilds the one track; mute and solo are picked up
/// at the next playback start.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEffect {
    /// Re-read volume, pan, dry/wet and effect params of a track into its live chain
    TrackParams(TrackId),
    /// Effect type changed; rebuild the track's live chain at the playhead
    TrackRebuild(TrackId),
    /// Track audio replaced or cleared; drop the uploaded copy
    TrackAudio(TrackId),
    /// Output target changed; rebind the device pair if it exists
    TrackRouting(TrackId),
    /// Track removed: release its live chain and device pair
    TrackRemoved(TrackId),
    MasterLevels,
    MasterRouting,
    MetronomeRouting,
    MetronomeSound,
    PreviewMetronome(MetronomeSound),
    /// Transport play/pause/stop/seek/bpm/metronome/loop changed
    Transport,
}

/// User-visible notices produced by dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A learned control was bound to a target
    MidiBound { control: ControlId, target: MidiMappingTarget },
    /// Non-looping playback reached the end of the timeline
    PlaybackFinished,
}

/// Result of dispatching an action.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pub notices: Vec<Notice>,
    pub audio_effects: Vec<AudioEffect>,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_effect(effect: AudioEffect) -> Self {
        Self {
            audio_effects: vec![effect],
            ..Self::default()
        }
    }

    pub fn with_notice(notice: Notice) -> Self {
        Self {
            notices: vec![notice],
            ..Self::default()
        }
    }

    pub fn push_effect(&mut self, effect: AudioEffect) {
        self.audio_effects.push(effect);
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn merge(&mut self, other: DispatchResult) {
        self.notices.extend(other.notices);
        self.audio_effects.extend(other.audio_effects);
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty() && self.audio_effects.is_empty()
    }
}
