//! FFT analysis thread and utilities.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::params::FFTConfig;

/// Spawn the FFT analysis thread.
///
/// Every `update_interval_ms` it windows the most recent samples in
/// `fft_buffer`, transforms them and publishes `band_count` magnitudes into
/// `bands`. Half a window is kept for overlap with the next pass. The thread
/// exits once `running` is cleared.
pub fn spawn_fft_thread(
    config: FFTConfig,
    band_count: usize,
    fft_buffer: Arc<Mutex<Vec<f32>>>,
    bands: Arc<Mutex<Vec<f32>>>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let fft_size = config.window_for(band_count);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let mut fft_output = vec![Complex::new(0.0, 0.0); fft_size];
        let mut magnitudes = vec![0.0; fft_size / 2];
        let window: Vec<f32> = (0..fft_size).map(|i| hann_window(i, fft_size)).collect();

        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            {
                let mut fft_buf = fft_buffer.lock().unwrap_or_else(PoisonError::into_inner);
                let len = fft_buf.len();
                if len < fft_size {
                    continue;
                }

                // Apply Hann window to the newest samples
                let recent = &fft_buf[len - fft_size..];
                for ((out, &sample), &w) in fft_output.iter_mut().zip(recent).zip(&window) {
                    *out = Complex::new(sample * w, 0.0);
                }

                // 50% overlap, never falling behind the stream
                fft_buf.drain(0..len - fft_size / 2);
            }

            fft.process(&mut fft_output);

            let norm = 2.0 / fft_size as f32;
            for (m, c) in magnitudes.iter_mut().zip(&fft_output) {
                *m = c.norm() * norm;
            }

            let reduced = reduce_to_bands(&magnitudes, fft_size, band_count);
            *bands.lock().unwrap_or_else(PoisonError::into_inner) = reduced;
        }
    })
}

/// Average the `fft_size / 2` magnitude bins into `band_count` linear bands
pub fn reduce_to_bands(magnitudes: &[f32], fft_size: usize, band_count: usize) -> Vec<f32> {
    (0..band_count)
        .map(|band| {
            let bins = FFTConfig::band_bins(fft_size, band_count, band);
            let count = bins.len() as f32;
            magnitudes[bins].iter().sum::<f32>() / count
        })
        .collect()
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
