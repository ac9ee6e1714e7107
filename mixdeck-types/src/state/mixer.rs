use serde::{Deserialize, Serialize};

use super::device::OutputTarget;

/// Percussive sounds the metronome can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MetronomeSound {
    #[default]
    Classic,
    Beep,
    Woodblock,
    Cowbell,
}

impl MetronomeSound {
    pub const ALL: [MetronomeSound; 4] = [
        MetronomeSound::Classic,
        MetronomeSound::Beep,
        MetronomeSound::Woodblock,
        MetronomeSound::Cowbell,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetronomeSound::Classic => "Classic Click",
            MetronomeSound::Beep => "Beep",
            MetronomeSound::Woodblock => "Woodblock",
            MetronomeSound::Cowbell => "Cowbell",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            MetronomeSound::Classic => "classic",
            MetronomeSound::Beep => "beep",
            MetronomeSound::Woodblock => "woodblock",
            MetronomeSound::Cowbell => "cowbell",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.id().eq_ignore_ascii_case(id))
    }
}

pub const DEFAULT_MASTER_VOLUME: f32 = 0.8;
pub const DEFAULT_METRONOME_VOLUME: f32 = 0.5;

/// Master and metronome bus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerSettings {
    pub master_volume: f32,
    pub metronome_volume: f32,
    pub metronome_pan: f32,
    pub metronome_sound: MetronomeSound,
    pub master_output: OutputTarget,
    pub metronome_output: OutputTarget,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_MASTER_VOLUME,
            metronome_volume: DEFAULT_METRONOME_VOLUME,
            metronome_pan: 0.0,
            metronome_sound: MetronomeSound::Classic,
            master_output: OutputTarget::Master,
            metronome_output: OutputTarget::Master,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_ids_round_trip() {
        for sound in MetronomeSound::ALL {
            assert_eq!(MetronomeSound::from_id(sound.id()), Some(sound));
        }
        assert_eq!(MetronomeSound::from_id("Cowbell"), Some(MetronomeSound::Cowbell));
        assert_eq!(MetronomeSound::from_id("gong"), None);
    }
}
