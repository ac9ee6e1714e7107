use serde::{Deserialize, Serialize};

/// The fixed set of per-track effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectType {
    #[default]
    None,
    Reverb,
    LowPass,
    Delay,
    Flanger,
    Chorus,
}

impl EffectType {
    pub const ALL: [EffectType; 6] = [
        EffectType::None,
        EffectType::Reverb,
        EffectType::LowPass,
        EffectType::Delay,
        EffectType::Flanger,
        EffectType::Chorus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EffectType::None => "None",
            EffectType::Reverb => "Reverb",
            EffectType::LowPass => "Low-Pass",
            EffectType::Delay => "Delay",
            EffectType::Flanger => "Flanger",
            EffectType::Chorus => "Chorus",
        }
    }

    /// Labels for the two generic knobs, as shown on the effect editor.
    pub fn param_labels(&self) -> (&'static str, &'static str) {
        match self {
            EffectType::None | EffectType::Reverb => ("-", "-"),
            EffectType::LowPass => ("Cutoff", "Resonance"),
            EffectType::Delay => ("Time", "Feedback"),
            EffectType::Flanger | EffectType::Chorus => ("Depth", "Rate"),
        }
    }
}

/// Generic continuous effect parameters, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    pub param1: f32,
    pub param2: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param3: Option<f32>,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            param1: 0.5,
            param2: 0.5,
            param3: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectConfig {
    pub effect_type: EffectType,
    /// 0 = fully dry, 1 = fully wet
    pub dry_wet: f32,
    pub params: EffectParams,
}

impl EffectConfig {
    pub fn dry_gain(&self) -> f32 {
        1.0 - self.dry_wet.clamp(0.0, 1.0)
    }

    pub fn wet_gain(&self) -> f32 {
        self.dry_wet.clamp(0.0, 1.0)
    }
}
