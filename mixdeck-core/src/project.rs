//! Project boundary: a serializable snapshot of everything needed to rebuild
//! a session, minus audio. Audio travels separately as WAV.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mixdeck_audio::{encode_wav, LoadError};
use mixdeck_types::{AudioBuffer, MidiMappings, MixerSettings, Track, TransportState};

use crate::state::AppState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Audio(String),
    Version(u32),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "project i/o failed: {}", e),
            ProjectError::Json(e) => write!(f, "invalid project file: {}", e),
            ProjectError::Audio(e) => write!(f, "audio export failed: {}", e),
            ProjectError::Version(v) => write!(f, "unsupported project version {}", v),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Json(e)
    }
}

impl From<LoadError> for ProjectError {
    fn from(e: LoadError) -> Self {
        ProjectError::Audio(e.to_string())
    }
}

/// Everything that defines a project except audio content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub version: u32,
    pub name: String,
    pub transport: TransportState,
    pub mixer: MixerSettings,
    #[serde(default)]
    pub midi_mappings: MidiMappings,
    pub tracks: Vec<TrackSnapshot>,
}

/// A track's playback parameters. `track` carries no buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSnapshot {
    #[serde(flatten)]
    pub track: Track,
    /// Whether the track had audio when the snapshot was taken
    pub has_audio: bool,
}

impl ProjectSnapshot {
    pub fn from_state(state: &AppState) -> Self {
        let tracks = state
            .tracks
            .tracks
            .iter()
            .map(|t| TrackSnapshot {
                has_audio: t.has_audio(),
                track: Track { buffer: None, clipping: false, ..t.clone() },
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            name: state.session.project_name.clone(),
            transport: TransportState {
                playing: false,
                current_time: 0.0,
                ..state.session.transport.clone()
            },
            mixer: state.session.mixer.clone(),
            midi_mappings: state.session.midi.mappings.clone(),
            tracks,
        }
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ProjectError::Version(snapshot.version));
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!(target: "project", "saved {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Tracks ready to install; buffers are attached by the caller.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(|t| t.track.clone()).collect()
    }
}

/// A track's audio as 16-bit PCM WAV bytes, or `None` without audio.
pub fn export_track_audio(track: &Track) -> Option<Result<Vec<u8>, ProjectError>> {
    let buffer = track.buffer.as_ref()?;
    Some(encode_wav(buffer).map_err(ProjectError::from))
}

/// Write a buffer as a 16-bit PCM WAV file.
pub fn write_wav_file(buffer: &AudioBuffer, path: &Path) -> Result<(), ProjectError> {
    std::fs::write(path, encode_wav(buffer)?)?;
    log::debug!(target: "project", "wrote {:.2}s of audio to {}", buffer.duration(), path.display());
    Ok(())
}
