//! Action dispatch: apply the pure reducer, then describe what the audio
//! session has to do about it.
//!
//! `dispatch_action` never touches audio. The returned `DispatchResult`
//! carries `AudioEffect`s that `Mixdeck` applies afterwards, so every
//! mutation, whether from the UI, a MIDI controller or project load, takes
//! the same path.

mod mixer;
mod track;
mod transport;

use mixdeck_types::reduce::reduce_action;
use mixdeck_types::{Action, AudioEffect, DispatchResult, MidiAction, MixerAction, Notice};

use crate::state::AppState;

/// Apply `action` to `state`. Returns notices and the audio effects to apply.
pub fn dispatch_action(action: &Action, state: &mut AppState) -> DispatchResult {
    // previews change no state but still make a sound
    if let Action::Mixer(MixerAction::PreviewMetronome(sound)) = action {
        return DispatchResult::with_effect(AudioEffect::PreviewMetronome(*sound));
    }

    let changed = reduce_action(action, &mut state.tracks, &mut state.session);
    if !changed {
        return DispatchResult::none();
    }

    match action {
        Action::None | Action::Device(_) | Action::SetProjectName(_) => DispatchResult::none(),
        Action::Track(a) => track::effects(a),
        Action::Transport(a) => transport::effects(a),
        Action::Mixer(a) => mixer::effects(a),
        Action::Midi(MidiAction::Bind(control, target)) => {
            log::info!(target: "midi", "bound {} to track {} {:?}", control, target.track_id, target.control);
            DispatchResult::with_notice(Notice::MidiBound { control: *control, target: *target })
        }
        Action::Midi(_) => DispatchResult::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdeck_types::{
        ControlId, MetronomeSound, MidiControl, MidiMappingTarget, TrackAction, TransportAction,
    };

    #[test]
    fn unchanged_state_has_no_effects() {
        let mut state = AppState::default();
        let r = dispatch_action(&Action::Transport(TransportAction::Pause), &mut state);
        assert!(r.is_empty());
        let r = dispatch_action(&Action::Track(TrackAction::Remove(mixdeck_types::TrackId::new(999))), &mut state);
        assert!(r.is_empty());
    }

    #[test]
    fn preview_needs_no_state_change() {
        let mut state = AppState::default();
        let r = dispatch_action(
            &Action::Mixer(MixerAction::PreviewMetronome(MetronomeSound::Beep)),
            &mut state,
        );
        assert_eq!(r.audio_effects, vec![AudioEffect::PreviewMetronome(MetronomeSound::Beep)]);
    }

    #[test]
    fn bind_emits_notice_and_exits_learn() {
        let mut state = AppState::default();
        let target = MidiMappingTarget { track_id: state.tracks.tracks[1].id, control: MidiControl::Solo };
        dispatch_action(&Action::Midi(MidiAction::ToggleLearn), &mut state);
        dispatch_action(&Action::Midi(MidiAction::SetLearnTarget(Some(target))), &mut state);
        let control = ControlId::new(5, 0);
        let r = dispatch_action(&Action::Midi(MidiAction::Bind(control, target)), &mut state);
        assert_eq!(r.notices, vec![Notice::MidiBound { control, target }]);
        assert!(!state.session.midi.learn);
        assert!(state.session.midi.pending_target.is_none());
        assert_eq!(state.session.midi.mappings.get(&control), Some(&target));
    }
}
