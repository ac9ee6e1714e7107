//! Pure state-mutation reducers.
//!
//! These functions are the single source of truth for action → state
//! mutations. They mutate `TrackState` and `SessionState` only; they do not
//! build `DispatchResult`s or touch the audio session.

mod device;
mod midi;
mod mixer;
mod track;
mod transport;

use crate::{Action, SessionState, TrackState};

/// Apply an action's state mutations. Returns true if state changed.
pub fn reduce_action(action: &Action, tracks: &mut TrackState, session: &mut SessionState) -> bool {
    match action {
        Action::None => false,
        Action::Track(a) => track::reduce(a, tracks, session),
        Action::Transport(a) => transport::reduce(a, session),
        Action::Mixer(a) => mixer::reduce(a, session),
        Action::Midi(a) => midi::reduce(a, session),
        Action::Device(a) => device::reduce(a, session),
        Action::SetProjectName(name) => {
            session.project_name = name.clone();
            true
        }
    }
}

/// Display name for a track derived from a loaded file name: extension
/// stripped, at most 20 characters.
pub fn track_name_from_source(source_name: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(dot) if dot > 0 && !source_name[dot + 1..].contains('/') => &source_name[..dot],
        _ => source_name,
    };
    stem.chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names() {
        assert_eq!(track_name_from_source("drums.wav"), "drums");
        assert_eq!(track_name_from_source("take.2.final.wav"), "take.2.final");
        assert_eq!(track_name_from_source("no_extension"), "no_extension");
        assert_eq!(
            track_name_from_source("a_really_long_file_name_for_a_bass.wav"),
            "a_really_long_file_n"
        );
    }

    #[test]
    fn project_name() {
        let mut tracks = TrackState::new();
        let mut session = SessionState::new();
        assert!(reduce_action(&Action::SetProjectName("Demo".into()), &mut tracks, &mut session));
        assert_eq!(session.project_name, "Demo");
        assert!(!reduce_action(&Action::None, &mut tracks, &mut session));
    }
}
