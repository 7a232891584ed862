//! Audio analysis configuration.

use std::ops::Range;

/// FFT analysis configuration
#[derive(Debug, Clone)]
pub struct FFTConfig {
    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// FFT update interval (milliseconds)
    /// 16 ms ≈ one analysis per display frame at 60 Hz
    pub update_interval_ms: u64,
}

impl Default for FFTConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            update_interval_ms: 16,
        }
    }
}

impl FFTConfig {
    /// Window size large enough to give every band at least one bin
    pub fn window_for(&self, band_count: usize) -> usize {
        self.fft_size.max((band_count * 2).next_power_of_two())
    }

    /// Magnitude bins averaged into band `band` when `fft_size / 2` bins are
    /// spread linearly over `band_count` bands
    pub fn band_bins(fft_size: usize, band_count: usize, band: usize) -> Range<usize> {
        let bins = fft_size / 2;
        let start = band * bins / band_count;
        let end = ((band + 1) * bins / band_count).max(start + 1);
        start..end.min(bins)
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.update_interval_ms == 0 {
            return Err("FFT update interval must be > 0".to_string());
        }
        Ok(())
    }
}
