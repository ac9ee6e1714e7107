//! Offline rendering of the buffers the session synthesizes itself: the
//! reverb impulse response and the metronome sounds.

use mixdeck_types::{AudioBuffer, MetronomeSound};

/// Length of the synthetic reverb impulse.
pub const IMPULSE_SECS: f64 = 2.0;

/// Gain floor that exponential decays ramp down to.
const DECAY_FLOOR: f32 = 0.001;

/// LCG noise in [-1, 1).
pub(crate) fn next_noise(state: &mut u64) -> f32 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let unit = (*state >> 40) as f32 / (1u64 << 24) as f32;
    unit * 2.0 - 1.0
}

/// Stereo decaying-noise impulse: each channel is independent noise shaped by
/// `(1 - i/len)^5`.
pub fn reverb_impulse(sample_rate: u32, seed: u64) -> AudioBuffer {
    let length = (sample_rate as f64 * IMPULSE_SECS) as usize;
    let mut rng = seed | 1;
    let mut channels = vec![Vec::with_capacity(length); 2];
    for i in 0..length {
        let decay = (1.0 - i as f32 / length as f32).powi(5);
        for ch in channels.iter_mut() {
            ch.push(next_noise(&mut rng) * decay);
        }
    }
    AudioBuffer::from_channels(sample_rate, channels)
}

/// Gain of an exponential ramp from `start` to `DECAY_FLOOR` over `ramp` seconds.
fn exp_decay(start: f32, t: f64, ramp: f64) -> f32 {
    if t >= ramp {
        return 0.0;
    }
    start * (DECAY_FLOOR / start).powf((t / ramp) as f32)
}

fn square(phase: f64) -> f32 {
    if phase.fract() < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// RBJ band-pass (constant 0 dB peak gain), direct form I.
struct BandPass {
    b0: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandPass {
    fn new(sample_rate: u32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b2: -alpha / a0,
            a1: -2.0 * w0.cos() / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Render one metronome sound as a mono buffer.
pub fn metronome_sound(sound: MetronomeSound, sample_rate: u32) -> AudioBuffer {
    let rate = sample_rate as f64;
    let (buffer_secs, ramp) = match sound {
        MetronomeSound::Classic => (0.1, 0.05),
        MetronomeSound::Beep => (0.1, 0.08),
        MetronomeSound::Woodblock => (0.15, 0.1),
        MetronomeSound::Cowbell => (0.2, 0.15),
    };
    let frames = (rate * buffer_secs) as usize;
    let mut out = vec![0.0f32; frames];

    match sound {
        MetronomeSound::Classic | MetronomeSound::Beep => {
            let (freq, gain) = if sound == MetronomeSound::Classic {
                (2500.0, 0.8)
            } else {
                (1000.0, 0.7)
            };
            for (i, s) in out.iter_mut().enumerate() {
                let t = i as f64 / rate;
                let phase = 2.0 * std::f64::consts::PI * freq * t;
                *s = phase.sin() as f32 * exp_decay(gain, t, ramp);
            }
        }
        MetronomeSound::Woodblock => {
            let mut rng = 0x5eed_b10c_u64;
            let mut filter = BandPass::new(sample_rate, 1500.0, 10.0);
            for (i, s) in out.iter_mut().enumerate() {
                let t = i as f64 / rate;
                let noise = if t < ramp { next_noise(&mut rng) } else { 0.0 };
                *s = filter.process(noise) * exp_decay(1.0, t, ramp);
            }
        }
        MetronomeSound::Cowbell => {
            for (i, s) in out.iter_mut().enumerate() {
                let t = i as f64 / rate;
                let mix = square(550.0 * t) * 0.4 + square(888.8 * t) * 0.3;
                *s = mix * exp_decay(1.0, t, ramp);
            }
        }
    }

    AudioBuffer::from_channels(sample_rate, vec![out])
}
