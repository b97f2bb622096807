//! Audio produced by the synthesizer

use std::time::Duration;

/// Output rate of every waveform the synthesizer returns
pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;

/// Silence appended after speech so the last phoneme is not clipped by the device
pub const TRAILING_SILENCE_SECS: f32 = 0.5;

/// Mono f32 samples at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn with_trailing_silence(mut self, secs: f32) -> Self {
        let frames = (self.sample_rate as f32 * secs).round() as usize;
        self.samples.resize(self.samples.len() + frames, 0.0);
        self
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// 16-bit little-endian PCM to f32 in [-1, 1). A trailing odd byte is dropped.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_silence() {
        let wave = Waveform::new(vec![0.5; 480], OUTPUT_SAMPLE_RATE)
            .with_trailing_silence(TRAILING_SILENCE_SECS);
        assert_eq!(wave.samples.len(), 480 + 24_000);
        assert!(wave.samples[480..].iter().all(|s| *s == 0.0));
        assert_eq!(wave.duration().as_millis(), 510);
    }

    #[test]
    fn test_pcm16_conversion() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x01];
        let samples = pcm16_to_f32(&bytes);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
    }
}
