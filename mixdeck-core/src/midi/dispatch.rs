use mixdeck_types::{Action, ControlId, MidiAction, MidiControl, MidiMappingTarget, TrackAction};

use super::MidiEventKind;
use crate::state::AppState;

/// Turn an incoming MIDI event into the action it stands for.
///
/// Pure: reads state and returns an action for `dispatch_action`, which keeps
/// MIDI handling free of reentrancy. Returns `Action::None` for events from
/// disabled devices, non control-change messages and unmapped controls.
pub fn process_midi_event(state: &AppState, device_id: &str, event: &MidiEventKind) -> Action {
    let midi = &state.session.midi;
    if !midi.is_device_enabled(device_id) {
        return Action::None;
    }
    let MidiEventKind::ControlChange { channel, controller, value } = *event else {
        return Action::None;
    };
    let control = ControlId::new(controller, channel);

    if let Some(target) = midi.learn_target() {
        log::debug!(target: "midi", "learned {} for track {}", control, target.track_id);
        return Action::Midi(MidiAction::Bind(control, target));
    }

    match midi.mappings.get(&control) {
        Some(target) => mapped_action(*target, value),
        None => Action::None,
    }
}

fn mapped_action(target: MidiMappingTarget, value: u8) -> Action {
    let normalized = value as f32 / 127.0;
    let id = target.track_id;
    let action = match target.control {
        MidiControl::Volume => TrackAction::SetVolume(id, normalized),
        MidiControl::Pan => TrackAction::SetPan(id, normalized * 2.0 - 1.0),
        MidiControl::DryWet => TrackAction::SetDryWet(id, normalized),
        MidiControl::Mute if value > 0 => TrackAction::ToggleMute(id),
        MidiControl::Solo if value > 0 => TrackAction::ToggleSolo(id),
        MidiControl::Mute | MidiControl::Solo => return Action::None,
    };
    Action::Track(action)
}
