//! MIDI input: raw message parsing and the multi-port input manager.
//!
//! Every open port forwards `(device id, event)` pairs into one shared
//! channel, so refreshing the port list or reconnecting a device never
//! touches the mapping table and never duplicates delivery.

pub mod dispatch;

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection};

use mixdeck_types::MidiDeviceInfo;

pub use dispatch::process_midi_event;

const CLIENT_NAME: &str = "mixdeck";

/// MIDI event with the driver timestamp it arrived with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// Event timestamp in microseconds (driver-specific epoch)
    pub timestamp_us: u64,
    pub kind: MidiEventKind,
}

impl MidiEvent {
    pub fn new(timestamp_us: u64, kind: MidiEventKind) -> Self {
        Self { timestamp_us, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend {
        channel: u8,
        /// -8192 (full down) to +8191 (full up), 0 = center
        value: i16,
    },
    ProgramChange { channel: u8, program: u8 },
    Aftertouch { channel: u8, pressure: u8 },
    PolyAftertouch { channel: u8, note: u8, pressure: u8 },
}

/// A MIDI input port as seen by the last refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPortInfo {
    /// Position in the driver's port list at refresh time
    pub index: usize,
    /// Port name, with ` #n` appended to repeated names. Used as the device
    /// id everywhere else.
    pub id: String,
    pub name: String,
}

/// Port infos for `(index, name)` pairs in driver order. Identical
/// controllers get distinct ids by order of appearance.
pub fn port_infos(ports: impl IntoIterator<Item = (usize, String)>) -> Vec<MidiPortInfo> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    ports
        .into_iter()
        .map(|(index, name)| {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            let id = if *count == 1 {
                name.clone()
            } else {
                format!("{} #{}", name, count)
            };
            MidiPortInfo { index, id, name }
        })
        .collect()
}

pub fn find_port<'a>(ports: &'a [MidiPortInfo], device_id: &str) -> Option<&'a MidiPortInfo> {
    ports.iter().find(|p| p.id == device_id)
}

fn input_ports(midi_in: &MidiInput) -> Vec<MidiPortInfo> {
    let named = midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| midi_in.port_name(port).ok().map(|name| (index, name)))
        .collect::<Vec<_>>();
    port_infos(named)
}

impl From<&MidiPortInfo> for MidiDeviceInfo {
    fn from(port: &MidiPortInfo) -> Self {
        MidiDeviceInfo {
            id: port.id.clone(),
            name: port.name.clone(),
            manufacturer: String::new(),
        }
    }
}

/// Parse a raw MIDI message. Running status and system messages are not
/// supported.
pub fn parse_midi_message(data: &[u8]) -> Option<MidiEventKind> {
    let (&status, rest) = data.split_first()?;
    let channel = status & 0x0F;
    let byte = |i: usize| rest.get(i).map(|b| b & 0x7F);

    match status & 0xF0 {
        0x80 => Some(MidiEventKind::NoteOff { channel, note: byte(0)? }).filter(|_| rest.len() >= 2),
        0x90 => {
            let (note, velocity) = (byte(0)?, byte(1)?);
            if velocity == 0 {
                Some(MidiEventKind::NoteOff { channel, note })
            } else {
                Some(MidiEventKind::NoteOn { channel, note, velocity })
            }
        }
        0xA0 => Some(MidiEventKind::PolyAftertouch { channel, note: byte(0)?, pressure: byte(1)? }),
        0xB0 => Some(MidiEventKind::ControlChange { channel, controller: byte(0)?, value: byte(1)? }),
        0xC0 => Some(MidiEventKind::ProgramChange { channel, program: byte(0)? }),
        0xD0 => Some(MidiEventKind::Aftertouch { channel, pressure: byte(0)? }),
        0xE0 => {
            let lsb = byte(0)? as i16;
            let msb = byte(1)? as i16;
            Some(MidiEventKind::PitchBend { channel, value: ((msb << 7) | lsb) - 8192 })
        }
        _ => None,
    }
}

/// Owns every open MIDI input connection, keyed by device id.
pub struct MidiInputManager {
    connections: HashMap<String, MidiInputConnection<()>>,
    available_ports: Vec<MidiPortInfo>,
    sender: Sender<(String, MidiEvent)>,
    receiver: Receiver<(String, MidiEvent)>,
}

impl MidiInputManager {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            connections: HashMap::new(),
            available_ports: Vec::new(),
            sender,
            receiver,
        }
    }

    /// Re-enumerate input ports. If the MIDI subsystem cannot be opened (for
    /// example permission was denied) the list is empty.
    pub fn refresh_ports(&mut self) -> &[MidiPortInfo] {
        self.available_ports.clear();
        match MidiInput::new(CLIENT_NAME) {
            Ok(midi_in) => self.available_ports = input_ports(&midi_in),
            Err(e) => log::warn!(target: "midi", "MIDI unavailable: {}", e),
        }
        log::debug!(target: "midi", "{} MIDI input port(s)", self.available_ports.len());
        &self.available_ports
    }

    pub fn list_ports(&self) -> &[MidiPortInfo] {
        &self.available_ports
    }

    /// Known ports as device infos for `MidiAction::SetDevices`.
    pub fn devices(&self) -> Vec<MidiDeviceInfo> {
        self.available_ports.iter().map(MidiDeviceInfo::from).collect()
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        self.connections.contains_key(device_id)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.connections.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Open a port. Connecting an already open device is a no-op.
    pub fn connect(&mut self, device_id: &str) -> Result<(), String> {
        if self.is_connected(device_id) {
            return Ok(());
        }
        let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| e.to_string())?;
        midi_in.ignore(Ignore::All);
        let listing = input_ports(&midi_in);
        let ports = midi_in.ports();
        let port = find_port(&listing, device_id)
            .and_then(|info| ports.get(info.index))
            .ok_or_else(|| format!("MIDI device not found: {}", device_id))?;

        let tx = self.sender.clone();
        let id = device_id.to_string();
        let connection = midi_in
            .connect(
                port,
                "mixdeck-input",
                move |timestamp, message, _| {
                    if let Some(kind) = parse_midi_message(message) {
                        let _ = tx.send((id.clone(), MidiEvent::new(timestamp, kind)));
                    }
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        log::info!(target: "midi", "connected MIDI input {}", device_id);
        self.connections.insert(device_id.to_string(), connection);
        Ok(())
    }

    pub fn disconnect(&mut self, device_id: &str) {
        if let Some(connection) = self.connections.remove(device_id) {
            connection.close();
            log::info!(target: "midi", "disconnected MIDI input {}", device_id);
        }
    }

    pub fn disconnect_all(&mut self) {
        for (_, connection) in self.connections.drain() {
            connection.close();
        }
    }

    /// Connect exactly the given devices, closing any others.
    pub fn sync_connections<'a>(&mut self, enabled: impl IntoIterator<Item = &'a String>) {
        let wanted: Vec<&String> = enabled.into_iter().collect();
        let stale: Vec<String> = self
            .connections
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.disconnect(&id);
        }
        for id in wanted {
            if let Err(e) = self.connect(id) {
                log::warn!(target: "midi", "could not open MIDI input {}: {}", id, e);
            }
        }
    }

    /// Handle for feeding events from outside a port callback.
    pub fn sender(&self) -> Sender<(String, MidiEvent)> {
        self.sender.clone()
    }

    /// Drain pending events (non-blocking).
    pub fn poll_events(&self) -> Vec<(String, MidiEvent)> {
        self.receiver.try_iter().collect()
    }
}

impl Default for MidiInputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_control_change() {
        assert_eq!(
            parse_midi_message(&[0xB3, 7, 100]),
            Some(MidiEventKind::ControlChange { channel: 3, controller: 7, value: 100 })
        );
        assert_eq!(parse_midi_message(&[0xB0, 7]), None);
    }

    #[test]
    fn parse_note_on_velocity_zero_is_note_off() {
        assert_eq!(
            parse_midi_message(&[0x90, 60, 0]),
            Some(MidiEventKind::NoteOff { channel: 0, note: 60 })
        );
        assert_eq!(
            parse_midi_message(&[0x91, 60, 90]),
            Some(MidiEventKind::NoteOn { channel: 1, note: 60, velocity: 90 })
        );
    }

    #[test]
    fn parse_note_off_requires_velocity_byte() {
        assert_eq!(parse_midi_message(&[0x80, 60]), None);
        assert_eq!(
            parse_midi_message(&[0x80, 60, 0]),
            Some(MidiEventKind::NoteOff { channel: 0, note: 60 })
        );
    }

    #[test]
    fn parse_pitch_bend() {
        let value = |data: &[u8]| match parse_midi_message(data) {
            Some(MidiEventKind::PitchBend { value, .. }) => value,
            other => panic!("expected pitch bend, got {:?}", other),
        };
        assert_eq!(value(&[0xE0, 0x00, 0x40]), 0);
        assert_eq!(value(&[0xE0, 0x7F, 0x7F]), 8191);
        assert_eq!(value(&[0xE0, 0x00, 0x00]), -8192);
    }

    #[test]
    fn parse_short_messages() {
        assert_eq!(
            parse_midi_message(&[0xC2, 5]),
            Some(MidiEventKind::ProgramChange { channel: 2, program: 5 })
        );
        assert_eq!(
            parse_midi_message(&[0xD0, 64]),
            Some(MidiEventKind::Aftertouch { channel: 0, pressure: 64 })
        );
        assert_eq!(parse_midi_message(&[]), None);
        assert_eq!(parse_midi_message(&[0xF8]), None);
    }

    #[test]
    fn port_ids_round_trip_through_device_list() {
        let ports = port_infos([(0, "Keys".to_string()), (2, "Pads".to_string()), (3, "Keys".to_string())]);
        let ids: Vec<&str> = ports.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Keys", "Pads", "Keys #2"]);

        let mut manager = MidiInputManager::new();
        manager.available_ports = ports.clone();
        let devices = manager.devices();
        assert_eq!(devices[2].name, "Keys");
        for device in &devices {
            let port = find_port(manager.list_ports(), &device.id).unwrap();
            assert_eq!(port.name, device.name);
        }
        assert_eq!(find_port(&ports, "Keys #2").map(|p| p.index), Some(3));
        assert!(find_port(&ports, "Drums").is_none());
    }

    #[test]
    fn connecting_an_unknown_device_fails() {
        let mut manager = MidiInputManager::new();
        assert!(manager.connect("no such port").is_err());
        assert!(!manager.is_connected("no such port"));
        manager.sync_connections(&["no such port".to_string()]);
        assert!(manager.connected_ids().is_empty());
    }

    #[test]
    fn injected_events_keep_device_identity() {
        let manager = MidiInputManager::new();
        let tx = manager.sender();
        let cc = MidiEventKind::ControlChange { channel: 0, controller: 1, value: 2 };
        tx.send(("port-a".into(), MidiEvent::new(1, cc))).unwrap();
        tx.send(("port-b".into(), MidiEvent::new(2, cc))).unwrap();
        let events = manager.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "port-a");
        assert_eq!(events[1].0, "port-b");
        assert!(manager.poll_events().is_empty());
    }
}
