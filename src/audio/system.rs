//! Audio system managing file playback and FFT analysis.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use super::decode::DecodedAudio;
use super::fft::spawn_fft_thread;
use super::playback::PlaybackState;
use super::{fit_bands, AudioError, SpectrumSource};
use crate::params::FFTConfig;

/// Plays one audio file in a loop and extracts its spectrum
pub struct AudioSystem {
    /// Latest band magnitudes (written by the FFT thread)
    bands: Arc<Mutex<Vec<f32>>>,

    /// Cursor and gain (shared with the output callback)
    playback: Arc<Mutex<PlaybackState>>,

    audio: Arc<DecodedAudio>,

    /// Cleared on drop to stop the FFT thread
    running: Arc<AtomicBool>,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,

    fft_thread: Option<thread::JoinHandle<()>>,
}

impl AudioSystem {
    /// Decode `path`, start looping playback and spectrum analysis
    pub fn new(path: &Path, fft_config: FFTConfig, band_count: usize) -> Result<Self, AudioError> {
        fft_config.validate().map_err(AudioError::Config)?;

        let audio = Arc::new(DecodedAudio::from_wav(path)?);
        log::info!(
            "decoded {}: {} channels @ {}Hz, {:.1}s",
            path.display(),
            audio.channels,
            audio.sample_rate,
            audio.duration_s()
        );

        // Shared state between audio callback and FFT thread
        let playback = Arc::new(Mutex::new(PlaybackState::default()));
        let fft_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let bands = Arc::new(Mutex::new(vec![0.0; band_count]));
        let running = Arc::new(AtomicBool::new(true));

        // Setup audio output device
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?}",
                config.sample_format()
            )));
        }
        let output_channels = config.channels() as usize;
        let output_rate = config.sample_rate().0;

        log::info!(
            "audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            output_rate,
            output_channels
        );

        let audio_cb = Arc::clone(&audio);
        let playback_cb = Arc::clone(&playback);
        let fft_buffer_cb = Arc::clone(&fft_buffer);

        // Build audio output stream
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = playback_cb.lock().unwrap_or_else(PoisonError::into_inner);
                    let mut fft_buf = fft_buffer_cb
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    state.render(&audio_cb, data, output_channels, output_rate, &mut fft_buf);
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        // Start FFT analysis thread
        let fft_thread = spawn_fft_thread(
            fft_config,
            band_count,
            fft_buffer,
            Arc::clone(&bands),
            Arc::clone(&running),
        );

        Ok(Self {
            bands,
            playback,
            audio,
            running,
            _stream: stream,
            fft_thread: Some(fft_thread),
        })
    }

    /// Output gain (0 silences playback and the spectrum with it)
    pub fn set_gain(&self, gain: f32) {
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_gain(gain);
    }

    /// Seconds into the current loop
    pub fn elapsed_s(&self) -> f32 {
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed_s(&self.audio)
    }

    /// Length of the decoded file in seconds
    pub fn duration_s(&self) -> f32 {
        self.audio.duration_s()
    }
}

impl SpectrumSource for AudioSystem {
    fn spectrum(&self, band_count: usize) -> Vec<f32> {
        let bands = self
            .bands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        fit_bands(bands, band_count)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.fft_thread.take() {
            let _ = handle.join();
        }
    }
}
