/// Decoded PCM audio, channel-separated, at a fixed sample rate.
///
/// Buffers are immutable once loaded; tracks share them through `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors. Shorter channels are
    /// zero-padded to the longest one.
    pub fn from_channels(sample_rate: u32, mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for ch in &mut channels {
            ch.resize(frames, 0.0);
        }
        Self { sample_rate, channels }
    }

    /// A silent buffer with the given shape.
    pub fn silent(sample_rate: u32, channels: usize, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_frames() {
        let buf = AudioBuffer::silent(48_000, 2, 96_000);
        assert!((buf.duration() - 2.0).abs() < 1e-9);
        assert_eq!(buf.channel_count(), 2);
    }

    #[test]
    fn ragged_channels_are_padded() {
        let buf = AudioBuffer::from_channels(10, vec![vec![1.0; 4], vec![0.5; 2]]);
        assert_eq!(buf.frames(), 4);
        assert_eq!(buf.channel(1).unwrap(), &[0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn zero_rate_has_no_duration() {
        let buf = AudioBuffer::from_channels(0, vec![vec![0.0; 8]]);
        assert_eq!(buf.duration(), 0.0);
    }
}
