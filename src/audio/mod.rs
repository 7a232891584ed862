//! Audio file playback and real-time spectrum extraction.
//!
//! Decodes a WAV file with hound, plays it in a loop through cpal and runs a
//! windowed FFT on what is played to produce per-band magnitudes.

mod decode;
mod fft;
mod playback;
mod system;

use std::path::PathBuf;

// Re-export public types
pub use decode::DecodedAudio;
pub use fft::{hann_window, reduce_to_bands};
pub use playback::{PlaybackState, VolumeControl, VOLUME_STEP};
pub use system::AudioSystem;

/// Errors raised while starting audio
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: hound::Error,
    },

    #[error("{0} contains no samples")]
    Empty(PathBuf),

    #[error("invalid FFT config: {0}")]
    Config(String),

    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to get audio config: {0}")]
    Device(String),

    #[error("unsupported output sample format {0}, need f32")]
    UnsupportedFormat(String),

    #[error("audio stream failed: {0}")]
    Stream(String),
}

/// Anything that can report a magnitude spectrum once per frame
pub trait SpectrumSource {
    /// `band_count` non-negative magnitudes, lowest frequency first
    fn spectrum(&self, band_count: usize) -> Vec<f32>;
}

/// Source used when no audio is playing
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSource;

impl SpectrumSource for SilentSource {
    fn spectrum(&self, band_count: usize) -> Vec<f32> {
        vec![0.0; band_count]
    }
}

/// Pad with zeros or truncate to exactly `band_count` bands
pub fn fit_bands(mut bands: Vec<f32>, band_count: usize) -> Vec<f32> {
    bands.resize(band_count, 0.0);
    bands
}
