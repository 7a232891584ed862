//! WAV decoding into interleaved f32 samples.

use std::path::Path;

use super::AudioError;

/// Fully decoded audio file
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Decode a WAV file (integer or float samples, any channel count)
    pub fn from_wav(path: &Path) -> Result<Self, AudioError> {
        let reader = hound::WavReader::open(path).map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = reader.spec();

        let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect()
            }
        };
        let samples = samples.map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        if spec.channels == 0 || samples.is_empty() {
            return Err(AudioError::Empty(path.to_path_buf()));
        }

        Ok(Self {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
        })
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Duration in seconds
    pub fn duration_s(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Sample of `frame` for output channel `channel`.
    ///
    /// Mono sources feed every output channel; extra output channels repeat
    /// the last source channel.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let ch = channel.min(self.channels - 1);
        self.samples[frame * self.channels + ch]
    }
}
