use crate::{MidiAction, SessionState};

pub(super) fn reduce(action: &MidiAction, session: &mut SessionState) -> bool {
    let midi = &mut session.midi;
    match action {
        MidiAction::ToggleLearn => {
            midi.learn = !midi.learn;
            midi.pending_target = None;
        }
        MidiAction::SetLearnTarget(target) => {
            midi.pending_target = *target;
        }
        MidiAction::Bind(control, target) => {
            midi.mappings.bind(*control, *target);
            midi.learn = false;
            midi.pending_target = None;
        }
        MidiAction::Unbind(control) => {
            return midi.mappings.unbind(control).is_some();
        }
        MidiAction::SetDevices(devices) => {
            midi.devices = devices.clone();
        }
        MidiAction::SetDeviceEnabled(id, enabled) => {
            return if *enabled {
                midi.enabled_devices.insert(id.clone())
            } else {
                midi.enabled_devices.remove(id)
            };
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlId, MidiControl, MidiMappingTarget, TrackId};

    fn target(control: MidiControl) -> MidiMappingTarget {
        MidiMappingTarget { track_id: TrackId::new(3), control }
    }

    #[test]
    fn toggling_learn_clears_pending_target() {
        let mut session = SessionState::new();
        reduce(&MidiAction::ToggleLearn, &mut session);
        reduce(&MidiAction::SetLearnTarget(Some(target(MidiControl::Pan))), &mut session);
        assert!(session.midi.learn_target().is_some());
        reduce(&MidiAction::ToggleLearn, &mut session);
        assert!(!session.midi.learn);
        assert!(session.midi.pending_target.is_none());
    }

    #[test]
    fn bind_exits_learn() {
        let mut session = SessionState::new();
        reduce(&MidiAction::ToggleLearn, &mut session);
        reduce(&MidiAction::SetLearnTarget(Some(target(MidiControl::Mute))), &mut session);
        let id = ControlId::new(64, 9);
        reduce(&MidiAction::Bind(id, target(MidiControl::Mute)), &mut session);
        assert!(!session.midi.learn);
        assert!(session.midi.pending_target.is_none());
        assert_eq!(session.midi.mappings.get(&id), Some(&target(MidiControl::Mute)));
    }

    #[test]
    fn device_enable_set() {
        let mut session = SessionState::new();
        assert!(reduce(&MidiAction::SetDeviceEnabled("nano".into(), true), &mut session));
        assert!(!reduce(&MidiAction::SetDeviceEnabled("nano".into(), true), &mut session));
        assert!(session.midi.is_device_enabled("nano"));
        assert!(reduce(&MidiAction::SetDeviceEnabled("nano".into(), false), &mut session));
        assert!(!session.midi.is_device_enabled("nano"));
    }
}
