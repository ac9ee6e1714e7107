use crate::{EffectParamKind, SessionState, Track, TrackAction, TrackId, TrackState};

use super::track_name_from_source;

pub(super) fn reduce(action: &TrackAction, tracks: &mut TrackState, session: &mut SessionState) -> bool {
    match action {
        TrackAction::Add => {
            tracks.add_track();
            true
        }
        TrackAction::Remove(id) => {
            if tracks.remove_track(*id).is_none() {
                return false;
            }
            session.midi.mappings.remove_track(*id);
            if session.midi.pending_target.is_some_and(|t| t.track_id == *id) {
                session.midi.pending_target = None;
            }
            true
        }
        TrackAction::Select(id) => {
            if tracks.track(*id).is_none() {
                return false;
            }
            tracks.selected = Some(*id);
            true
        }
        TrackAction::LoadAudio { id, source_name, buffer } => {
            let Some(track) = tracks.track_mut(*id) else {
                return false;
            };
            track.name = track_name_from_source(source_name);
            track.trim_start = 0.0;
            track.trim_end = buffer.duration();
            track.buffer = Some(buffer.clone());
            let longest = tracks.longest_clip();
            session.transport.fit_clip(longest);
            true
        }
        TrackAction::Rename(id, name) => with_track(tracks, *id, |t| t.name = name.clone()),
        TrackAction::SetColor(id, color) => with_track(tracks, *id, |t| t.color = color.clone()),
        TrackAction::SetIcon(id, icon) => with_track(tracks, *id, |t| t.icon = icon.clone()),
        TrackAction::ClearAudio(id) => with_track(tracks, *id, |t| {
            t.buffer = None;
            t.trim_start = 0.0;
            t.trim_end = 0.0;
        }),
        TrackAction::SetVolume(id, v) => with_track(tracks, *id, |t| t.volume = v.clamp(0.0, 1.0)),
        TrackAction::SetPan(id, p) => with_track(tracks, *id, |t| t.pan = p.clamp(-1.0, 1.0)),
        TrackAction::ToggleMute(id) => with_track(tracks, *id, |t| t.muted = !t.muted),
        TrackAction::ToggleSolo(id) => with_track(tracks, *id, |t| t.solo = !t.solo),
        TrackAction::SetEffectType(id, effect_type) => {
            with_track(tracks, *id, |t| t.effect.effect_type = *effect_type)
        }
        TrackAction::SetDryWet(id, v) => {
            with_track(tracks, *id, |t| t.effect.dry_wet = v.clamp(0.0, 1.0))
        }
        TrackAction::SetEffectParam(id, kind, v) => with_track(tracks, *id, |t| {
            let v = v.clamp(0.0, 1.0);
            let params = &mut t.effect.params;
            match kind {
                EffectParamKind::Param1 => params.param1 = v,
                EffectParamKind::Param2 => params.param2 = v,
                EffectParamKind::Param3 => params.param3 = Some(v),
            }
        }),
        TrackAction::SetTrim { id, start, end } => with_track(tracks, *id, |t| {
            t.trim_start = start.max(0.0);
            t.trim_end = *end;
        }),
        TrackAction::SetInputDevice(id, device) => {
            with_track(tracks, *id, |t| t.input_device = device.clone())
        }
        TrackAction::SetOutput(id, target) => with_track(tracks, *id, |t| t.output = target.clone()),
        TrackAction::SetClipping(id, clipping) => with_track(tracks, *id, |t| t.clipping = *clipping),
    }
}

fn with_track(tracks: &mut TrackState, id: TrackId, f: impl FnOnce(&mut Track)) -> bool {
    match tracks.track_mut(id) {
        Some(track) => {
            f(track);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{AudioBuffer, ControlId, MidiControl, MidiMappingTarget, OutputTarget};

    fn setup() -> (TrackState, SessionState) {
        (TrackState::with_empty_tracks(3), SessionState::new())
    }

    #[test]
    fn load_audio_renames_trims_and_grows_duration() {
        let (mut tracks, mut session) = setup();
        let id = tracks.tracks[0].id;
        let buffer = Arc::new(AudioBuffer::silent(100, 2, 4050));
        let action = TrackAction::LoadAudio {
            id,
            source_name: "long_ambient_pad_take_7.wav".into(),
            buffer,
        };
        assert!(reduce(&action, &mut tracks, &mut session));
        let track = tracks.track(id).unwrap();
        assert_eq!(track.name, "long_ambient_pad_tak");
        assert_eq!(track.trim_start, 0.0);
        assert!((track.trim_end - 40.5).abs() < 1e-9);
        assert_eq!(session.transport.duration, 41.0);
    }

    #[test]
    fn short_clip_keeps_duration() {
        let (mut tracks, mut session) = setup();
        let id = tracks.tracks[1].id;
        let action = TrackAction::LoadAudio {
            id,
            source_name: "hat.wav".into(),
            buffer: Arc::new(AudioBuffer::silent(100, 1, 200)),
        };
        reduce(&action, &mut tracks, &mut session);
        assert_eq!(session.transport.duration, 32.0);
    }

    #[test]
    fn levels_are_clamped() {
        let (mut tracks, mut session) = setup();
        let id = tracks.tracks[0].id;
        reduce(&TrackAction::SetVolume(id, 1.7), &mut tracks, &mut session);
        reduce(&TrackAction::SetPan(id, -3.0), &mut tracks, &mut session);
        reduce(&TrackAction::SetDryWet(id, -0.2), &mut tracks, &mut session);
        let track = tracks.track(id).unwrap();
        assert_eq!(track.volume, 1.0);
        assert_eq!(track.pan, -1.0);
        assert_eq!(track.effect.dry_wet, 0.0);
    }

    #[test]
    fn remove_drops_mappings_and_pending_target() {
        let (mut tracks, mut session) = setup();
        let id = tracks.tracks[2].id;
        let target = MidiMappingTarget { track_id: id, control: MidiControl::Volume };
        session.midi.mappings.bind(ControlId::new(7, 0), target);
        session.midi.pending_target = Some(target);
        assert!(reduce(&TrackAction::Remove(id), &mut tracks, &mut session));
        assert!(session.midi.mappings.is_empty());
        assert!(session.midi.pending_target.is_none());
        assert!(!reduce(&TrackAction::Remove(id), &mut tracks, &mut session));
    }

    #[test]
    fn unknown_track_is_ignored() {
        let (mut tracks, mut session) = setup();
        let ghost = TrackId::new(999);
        assert!(!reduce(&TrackAction::ToggleMute(ghost), &mut tracks, &mut session));
        assert!(!reduce(
            &TrackAction::SetOutput(ghost, OutputTarget::Device("hw:1".into())),
            &mut tracks,
            &mut session
        ));
    }

    #[test]
    fn effect_params() {
        let (mut tracks, mut session) = setup();
        let id = tracks.tracks[0].id;
        reduce(&TrackAction::SetEffectParam(id, EffectParamKind::Param3, 0.25), &mut tracks, &mut session);
        reduce(&TrackAction::SetEffectParam(id, EffectParamKind::Param1, 2.0), &mut tracks, &mut session);
        let params = tracks.track(id).unwrap().effect.params;
        assert_eq!(params.param3, Some(0.25));
        assert_eq!(params.param1, 1.0);
    }
}
