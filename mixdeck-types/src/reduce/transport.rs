use crate::{SessionState, TransportAction};

pub(super) fn reduce(action: &TransportAction, session: &mut SessionState) -> bool {
    let transport = &mut session.transport;
    match action {
        TransportAction::TogglePlay => {
            transport.playing = !transport.playing;
        }
        TransportAction::Play => {
            if transport.playing {
                return false;
            }
            transport.playing = true;
        }
        TransportAction::Pause => {
            if !transport.playing {
                return false;
            }
            transport.playing = false;
        }
        TransportAction::Stop | TransportAction::Finished => {
            transport.playing = false;
            transport.current_time = 0.0;
        }
        TransportAction::ToggleLoop => {
            transport.loop_enabled = !transport.loop_enabled;
        }
        TransportAction::SetBpm(bpm) => {
            if !bpm.is_finite() || *bpm <= 0.0 {
                return false;
            }
            transport.bpm = *bpm;
        }
        TransportAction::ToggleMetronome => {
            transport.metronome_on = !transport.metronome_on;
        }
        TransportAction::Seek(position) => {
            if !position.is_finite() {
                return false;
            }
            transport.current_time = position.clamp(0.0, transport.duration.max(0.0));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_resets_playhead() {
        let mut session = SessionState::new();
        reduce(&TransportAction::Play, &mut session);
        session.transport.current_time = 12.5;
        reduce(&TransportAction::Stop, &mut session);
        assert!(!session.transport.playing);
        assert_eq!(session.transport.current_time, 0.0);
    }

    #[test]
    fn invalid_bpm_rejected() {
        let mut session = SessionState::new();
        assert!(!reduce(&TransportAction::SetBpm(0.0), &mut session));
        assert!(!reduce(&TransportAction::SetBpm(-10.0), &mut session));
        assert!(!reduce(&TransportAction::SetBpm(f32::NAN), &mut session));
        assert!(reduce(&TransportAction::SetBpm(93.5), &mut session));
        assert_eq!(session.transport.bpm, 93.5);
    }

    #[test]
    fn seek_clamps_to_timeline() {
        let mut session = SessionState::new();
        reduce(&TransportAction::Seek(50.0), &mut session);
        assert_eq!(session.transport.current_time, 32.0);
        reduce(&TransportAction::Seek(-1.0), &mut session);
        assert_eq!(session.transport.current_time, 0.0);
    }

    #[test]
    fn redundant_play_pause() {
        let mut session = SessionState::new();
        assert!(!reduce(&TransportAction::Pause, &mut session));
        assert!(reduce(&TransportAction::Play, &mut session));
        assert!(!reduce(&TransportAction::Play, &mut session));
    }
}
