use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Where a track, the master bus or the metronome bus is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputTarget {
    /// The shared master bus (or, for the master bus itself, the system default sink)
    #[default]
    Master,
    /// A dedicated hardware output device
    Device(String),
}

impl OutputTarget {
    /// Interpret a raw device id as handed out by device selection. Empty,
    /// `"default"` and `"master"` all mean the shared master route.
    pub fn from_device_id(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            None | Some("") | Some("default") | Some("master") => OutputTarget::Master,
            Some(other) => OutputTarget::Device(other.to_string()),
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            OutputTarget::Master => None,
            OutputTarget::Device(id) => Some(id),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, OutputTarget::Master)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Input,
    Output,
}

/// An audio device as reported by device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

/// A MIDI input device as reported by the MIDI subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiDeviceInfo {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
}

/// Known audio devices and the subsets the user enabled.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub inputs: Vec<AudioDeviceInfo>,
    pub outputs: Vec<AudioDeviceInfo>,
    pub enabled_inputs: HashSet<String>,
    pub enabled_outputs: HashSet<String>,
}

impl DeviceState {
    pub fn is_enabled(&self, kind: DeviceKind, device_id: &str) -> bool {
        match kind {
            DeviceKind::Input => self.enabled_inputs.contains(device_id),
            DeviceKind::Output => self.enabled_outputs.contains(device_id),
        }
    }
}
