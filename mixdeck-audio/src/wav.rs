//! WAV decoding into `AudioBuffer`s and 16-bit PCM export.

use std::fmt;
use std::io::Cursor;

use mixdeck_types::AudioBuffer;

/// Failure to turn raw bytes into a playable buffer (or back).
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The bytes are not a readable WAV stream
    Decode(String),
    /// The file decoded but holds no audio frames
    Empty,
    /// Export failed
    Encode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Decode(msg) => write!(f, "failed to decode audio: {}", msg),
            LoadError::Empty => write!(f, "audio file contains no samples"),
            LoadError::Encode(msg) => write!(f, "failed to encode audio: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<hound::Error> for LoadError {
    fn from(e: hound::Error) -> Self {
        LoadError::Decode(e.to_string())
    }
}

/// Decode WAV bytes into a channel-separated buffer at `target_rate`.
pub fn decode_wav(bytes: &[u8], target_rate: u32) -> Result<AudioBuffer, LoadError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|x| x as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
    };

    if samples.len() < channel_count {
        return Err(LoadError::Empty);
    }

    let frames = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (ch, &sample) in frame.iter().enumerate() {
            channels[ch].push(sample);
        }
    }

    if spec.sample_rate != target_rate && target_rate > 0 {
        channels = channels
            .iter()
            .map(|ch| resample_linear(ch, spec.sample_rate, target_rate))
            .collect();
        return Ok(AudioBuffer::from_channels(target_rate, channels));
    }
    Ok(AudioBuffer::from_channels(spec.sample_rate, channels))
}

/// Linear-interpolation resampler for one channel.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 {
        return samples.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= samples.len().saturating_sub(1) {
            out.push(samples.last().copied().unwrap_or(0.0));
        } else {
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        }
    }
    out
}

/// Encode a buffer as interleaved 16-bit PCM WAV bytes.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, LoadError> {
    let spec = hound::WavSpec {
        channels: buffer.channel_count().max(1) as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut out = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut out, spec)
            .map_err(|e| LoadError::Encode(e.to_string()))?;
        for frame in 0..buffer.frames() {
            for ch in buffer.channels() {
                let s = ch[frame].clamp(-1.0, 1.0);
                let value = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
                writer
                    .write_sample(value as i16)
                    .map_err(|e| LoadError::Encode(e.to_string()))?;
            }
        }
        writer
            .finalize()
            .map_err(|e| LoadError::Encode(e.to_string()))?;
    }
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_ramp(rate: u32, frames: usize) -> AudioBuffer {
        let left = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let right = (0..frames).map(|i| -(i as f32) / frames as f32).collect();
        AudioBuffer::from_channels(rate, vec![left, right])
    }

    #[test]
    fn export_then_decode_keeps_shape() {
        let buffer = stereo_ramp(44_100, 441);
        let bytes = encode_wav(&buffer).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        let decoded = decode_wav(&bytes, 44_100).unwrap();
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.frames(), 441);
        let l = decoded.channel(0).unwrap();
        assert!((l[220] - buffer.channel(0).unwrap()[220]).abs() < 1e-3);
    }

    #[test]
    fn decode_resamples_to_session_rate() {
        let buffer = stereo_ramp(22_050, 2205);
        let bytes = encode_wav(&buffer).unwrap();
        let decoded = decode_wav(&bytes, 44_100).unwrap();
        assert_eq!(decoded.sample_rate(), 44_100);
        assert!((decoded.duration() - 0.1).abs() < 1e-3);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_wav(b"definitely not a wav file", 44_100).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn resample_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn hot_samples_are_clipped_on_export() {
        let buffer = AudioBuffer::from_channels(8_000, vec![vec![2.0, -2.0]]);
        let decoded = decode_wav(&encode_wav(&buffer).unwrap(), 8_000).unwrap();
        let ch = decoded.channel(0).unwrap();
        assert!(ch[0] > 0.99 && ch[1] <= -1.0);
    }
}
