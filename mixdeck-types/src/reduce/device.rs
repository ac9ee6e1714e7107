use crate::{DeviceAction, DeviceKind, SessionState};

pub(super) fn reduce(action: &DeviceAction, session: &mut SessionState) -> bool {
    let devices = &mut session.devices;
    match action {
        DeviceAction::SetAudioDevices(list) => {
            let (inputs, outputs) = list.iter().cloned().partition(|d| d.kind == DeviceKind::Input);
            devices.inputs = inputs;
            devices.outputs = outputs;
            true
        }
        DeviceAction::SetInputEnabled(id, enabled) => toggle(&mut devices.enabled_inputs, id, *enabled),
        DeviceAction::SetOutputEnabled(id, enabled) => toggle(&mut devices.enabled_outputs, id, *enabled),
    }
}

fn toggle(set: &mut std::collections::HashSet<String>, id: &str, enabled: bool) -> bool {
    if enabled {
        set.insert(id.to_string())
    } else {
        set.remove(id)
    }
}
