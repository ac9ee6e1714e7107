use std::path::{Path, PathBuf};

use serde::Deserialize;

use mixdeck_audio::SessionConfig;
use mixdeck_types::state::mixer::{DEFAULT_MASTER_VOLUME, DEFAULT_METRONOME_VOLUME};
use mixdeck_types::state::transport::{DEFAULT_BPM, DEFAULT_DURATION_SECS};
use mixdeck_types::MetronomeSound;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

pub const DEFAULT_TRACK_COUNT: usize = 8;
const MAX_TRACK_COUNT: usize = 64;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    engine: EngineConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f32>,
    track_count: Option<usize>,
    duration_secs: Option<f64>,
    master_volume: Option<f32>,
    metronome_volume: Option<f32>,
    metronome_sound: Option<String>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    sample_rate: Option<u32>,
    scheduler_interval_ms: Option<u64>,
    lookahead_ms: Option<u64>,
    clip_poll_ms: Option<u64>,
    param_smoothing_secs: Option<f64>,
}

/// Settings a new project starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDefaults {
    pub bpm: f32,
    pub track_count: usize,
    pub duration_secs: f64,
    pub master_volume: f32,
    pub metronome_volume: f32,
    pub metronome_sound: MetronomeSound,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            track_count: DEFAULT_TRACK_COUNT,
            duration_secs: DEFAULT_DURATION_SECS,
            master_volume: DEFAULT_MASTER_VOLUME,
            metronome_volume: DEFAULT_METRONOME_VOLUME,
            metronome_sound: MetronomeSound::Classic,
        }
    }
}

pub struct Config {
    defaults: DefaultsConfig,
    engine: EngineConfig,
}

impl Config {
    /// Embedded defaults overridden by `~/.config/mixdeck/config.toml`.
    pub fn load() -> Self {
        Self::load_with(user_config_path().as_deref())
    }

    /// Embedded defaults overridden by the file at `path`, if it exists.
    /// A malformed or unreadable file is logged and ignored.
    pub fn load_with(path: Option<&Path>) -> Self {
        let mut base: ConfigFile = match toml::from_str(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is invalid: {}", e);
                ConfigFile::default()
            }
        };

        if let Some(path) = path.filter(|p| p.exists()) {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => {
                        merge_defaults(&mut base.defaults, user.defaults);
                        merge_engine(&mut base.engine, user.engine);
                        log::info!(target: "config", "loaded {}", path.display());
                    }
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Config {
            defaults: base.defaults,
            engine: base.engine,
        }
    }

    pub fn defaults(&self) -> ProjectDefaults {
        let fallback = ProjectDefaults::default();
        ProjectDefaults {
            bpm: self
                .defaults
                .bpm
                .filter(|b| b.is_finite() && *b > 0.0)
                .unwrap_or(fallback.bpm),
            track_count: self
                .defaults
                .track_count
                .map(|n| n.min(MAX_TRACK_COUNT))
                .unwrap_or(fallback.track_count),
            duration_secs: self
                .defaults
                .duration_secs
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(fallback.duration_secs),
            master_volume: self
                .defaults
                .master_volume
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(fallback.master_volume),
            metronome_volume: self
                .defaults
                .metronome_volume
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(fallback.metronome_volume),
            metronome_sound: self
                .defaults
                .metronome_sound
                .as_deref()
                .and_then(MetronomeSound::from_id)
                .unwrap_or(fallback.metronome_sound),
        }
    }

    /// Audio engine tunables.
    pub fn session_config(&self) -> SessionConfig {
        let fallback = SessionConfig::default();
        let ms = |v: Option<u64>, default: f64| v.map(|ms| ms.max(1) as f64 / 1000.0).unwrap_or(default);
        SessionConfig {
            sample_rate: self
                .engine
                .sample_rate
                .filter(|r| (8_000..=192_000).contains(r))
                .unwrap_or(fallback.sample_rate),
            schedule_interval: ms(self.engine.scheduler_interval_ms, fallback.schedule_interval),
            lookahead: ms(self.engine.lookahead_ms, fallback.lookahead),
            clip_poll_interval: ms(self.engine.clip_poll_ms, fallback.clip_poll_interval),
            param_smoothing: self
                .engine
                .param_smoothing_secs
                .filter(|s| s.is_finite() && *s >= 0.0)
                .unwrap_or(fallback.param_smoothing),
            ..fallback
        }
    }
}

/// `~/.config/mixdeck`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mixdeck"))
}

fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.track_count.is_some() {
        base.track_count = user.track_count;
    }
    if user.duration_secs.is_some() {
        base.duration_secs = user.duration_secs;
    }
    if user.master_volume.is_some() {
        base.master_volume = user.master_volume;
    }
    if user.metronome_volume.is_some() {
        base.metronome_volume = user.metronome_volume;
    }
    if user.metronome_sound.is_some() {
        base.metronome_sound = user.metronome_sound;
    }
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
    if user.scheduler_interval_ms.is_some() {
        base.scheduler_interval_ms = user.scheduler_interval_ms;
    }
    if user.lookahead_ms.is_some() {
        base.lookahead_ms = user.lookahead_ms;
    }
    if user.clip_poll_ms.is_some() {
        base.clip_poll_ms = user.clip_poll_ms;
    }
    if user.param_smoothing_secs.is_some() {
        base.param_smoothing_secs = user.param_smoothing_secs;
    }
}
