use mixdeck_types::{AudioEffect, DispatchResult, Notice, TransportAction};

pub(super) fn effects(action: &TransportAction) -> DispatchResult {
    let mut result = DispatchResult::with_effect(AudioEffect::Transport);
    if *action == TransportAction::Finished {
        result.push_notice(Notice::PlaybackFinished);
    }
    result
}
