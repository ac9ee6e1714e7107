use mixdeck_types::{AudioEffect, DispatchResult, MixerAction};

pub(super) fn effects(action: &MixerAction) -> DispatchResult {
    let effect = match action {
        MixerAction::SetMasterVolume(_)
        | MixerAction::SetMetronomeVolume(_)
        | MixerAction::SetMetronomePan(_) => AudioEffect::MasterLevels,
        MixerAction::SetMetronomeSound(_) => AudioEffect::MetronomeSound,
        MixerAction::PreviewMetronome(sound) => AudioEffect::PreviewMetronome(*sound),
        MixerAction::SetMasterOutput(_) => AudioEffect::MasterRouting,
        MixerAction::SetMetronomeOutput(_) => AudioEffect::MetronomeRouting,
    };
    DispatchResult::with_effect(effect)
}
