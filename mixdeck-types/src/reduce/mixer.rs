use crate::{MixerAction, SessionState};

pub(super) fn reduce(action: &MixerAction, session: &mut SessionState) -> bool {
    let mixer = &mut session.mixer;
    match action {
        MixerAction::SetMasterVolume(v) => mixer.master_volume = v.clamp(0.0, 1.0),
        MixerAction::SetMetronomeVolume(v) => mixer.metronome_volume = v.clamp(0.0, 1.0),
        MixerAction::SetMetronomePan(p) => mixer.metronome_pan = p.clamp(-1.0, 1.0),
        MixerAction::SetMetronomeSound(sound) => mixer.metronome_sound = *sound,
        MixerAction::PreviewMetronome(_) => return false,
        MixerAction::SetMasterOutput(target) => mixer.master_output = target.clone(),
        MixerAction::SetMetronomeOutput(target) => mixer.metronome_output = target.clone(),
    }
    true
}
