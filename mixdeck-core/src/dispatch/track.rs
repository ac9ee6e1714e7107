use mixdeck_types::{AudioEffect, DispatchResult, TrackAction};

/// Volume, pan, dry/wet and effect parameters are applied to the live chain.
/// A new effect type rebuilds that track's chain. Mute and solo take effect
/// at the next playback start.
pub(super) fn effects(action: &TrackAction) -> DispatchResult {
    match action {
        TrackAction::SetVolume(id, _)
        | TrackAction::SetPan(id, _)
        | TrackAction::SetDryWet(id, _)
        | TrackAction::SetEffectParam(id, _, _) => DispatchResult::with_effect(AudioEffect::TrackParams(*id)),
        TrackAction::SetEffectType(id, _) => DispatchResult::with_effect(AudioEffect::TrackRebuild(*id)),
        TrackAction::LoadAudio { id, .. } | TrackAction::ClearAudio(id) => {
            DispatchResult::with_effect(AudioEffect::TrackAudio(*id))
        }
        TrackAction::SetOutput(id, _) => DispatchResult::with_effect(AudioEffect::TrackRouting(*id)),
        TrackAction::Remove(id) => DispatchResult::with_effect(AudioEffect::TrackRemoved(*id)),
        TrackAction::Add
        | TrackAction::Select(_)
        | TrackAction::Rename(..)
        | TrackAction::SetColor(..)
        | TrackAction::SetIcon(..)
        | TrackAction::ToggleMute(_)
        | TrackAction::ToggleSolo(_)
        | TrackAction::SetTrim { .. }
        | TrackAction::SetInputDevice(..)
        | TrackAction::SetClipping(..) => DispatchResult::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdeck_types::{EffectParamKind, EffectType, OutputTarget, TrackId};

    #[test]
    fn live_params_project_to_track_params() {
        let id = TrackId::new(1);
        for action in [
            TrackAction::SetVolume(id, 0.1),
            TrackAction::SetPan(id, 0.1),
            TrackAction::SetDryWet(id, 0.1),
            TrackAction::SetEffectParam(id, EffectParamKind::Param2, 0.1),
        ] {
            assert_eq!(effects(&action).audio_effects, vec![AudioEffect::TrackParams(id)]);
        }
    }

    #[test]
    fn structural_changes_wait_for_next_play() {
        let id = TrackId::new(1);
        assert!(effects(&TrackAction::ToggleMute(id)).is_empty());
        assert!(effects(&TrackAction::ToggleSolo(id)).is_empty());
        assert_eq!(
            effects(&TrackAction::SetEffectType(id, EffectType::Reverb)).audio_effects,
            vec![AudioEffect::TrackRebuild(id)]
        );
        assert_eq!(
            effects(&TrackAction::SetOutput(id, OutputTarget::Master)).audio_effects,
            vec![AudioEffect::TrackRouting(id)]
        );
    }
}
