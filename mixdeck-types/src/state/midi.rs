use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::device::MidiDeviceInfo;
use crate::TrackId;

/// Identity of a physical control-change control: controller number plus
/// channel. Rendered as `cc-<controller>-ch-<channel>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControlId {
    pub controller: u8,
    pub channel: u8,
}

impl ControlId {
    pub fn new(controller: u8, channel: u8) -> Self {
        Self { controller, channel }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cc-{}-ch-{}", self.controller, self.channel)
    }
}

impl FromStr for ControlId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("cc-")
            .ok_or_else(|| format!("not a control id: {s}"))?;
        let (controller, channel) = rest
            .split_once("-ch-")
            .ok_or_else(|| format!("not a control id: {s}"))?;
        let controller = controller
            .parse::<u8>()
            .map_err(|e| format!("bad controller in {s}: {e}"))?;
        let channel = channel
            .parse::<u8>()
            .map_err(|e| format!("bad channel in {s}: {e}"))?;
        if controller > 127 || channel > 15 {
            return Err(format!("control id out of range: {s}"));
        }
        Ok(Self { controller, channel })
    }
}

impl TryFrom<String> for ControlId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControlId> for String {
    fn from(id: ControlId) -> Self {
        id.to_string()
    }
}

/// Which track parameter a mapped control drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiControl {
    Volume,
    Pan,
    Mute,
    Solo,
    DryWet,
}

impl MidiControl {
    /// Momentary controls toggle on press and ignore release.
    pub fn is_trigger(&self) -> bool {
        matches!(self, MidiControl::Mute | MidiControl::Solo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiMappingTarget {
    pub track_id: TrackId,
    pub control: MidiControl,
}

/// Control identity → logical target. One target per identity; binding an
/// identity again replaces the previous target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MidiMappings(HashMap<ControlId, MidiMappingTarget>);

impl MidiMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identity, returning the target it replaced (if any).
    pub fn bind(&mut self, id: ControlId, target: MidiMappingTarget) -> Option<MidiMappingTarget> {
        self.0.insert(id, target)
    }

    pub fn get(&self, id: &ControlId) -> Option<&MidiMappingTarget> {
        self.0.get(id)
    }

    pub fn unbind(&mut self, id: &ControlId) -> Option<MidiMappingTarget> {
        self.0.remove(id)
    }

    /// Drop every mapping that targets a track.
    pub fn remove_track(&mut self, track_id: TrackId) {
        self.0.retain(|_, target| target.track_id != track_id);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ControlId, &MidiMappingTarget)> {
        self.0.iter()
    }
}

/// MIDI learn and mapping state.
#[derive(Debug, Clone, Default)]
pub struct MidiState {
    /// Learn mode active
    pub learn: bool,
    /// Logical target waiting for the next control-change message
    pub pending_target: Option<MidiMappingTarget>,
    pub mappings: MidiMappings,
    /// Device ids whose messages are processed at all
    pub enabled_devices: HashSet<String>,
    pub devices: Vec<MidiDeviceInfo>,
}

impl MidiState {
    pub fn is_device_enabled(&self, device_id: &str) -> bool {
        self.enabled_devices.contains(device_id)
    }

    /// Learn is armed only when the mode is on and a target is selected.
    pub fn learn_target(&self) -> Option<MidiMappingTarget> {
        if self.learn {
            self.pending_target
        } else {
            None
        }
    }
}
