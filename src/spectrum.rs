//! Falling-peak smoothing of the raw spectrum.

/// Decayed running peak-hold per band.
///
/// Each update scales every band by the decay rate and then raises it to
/// the incoming raw value if that is larger, so peaks jump up and fall slowly.
#[derive(Debug, Clone)]
pub struct SpectrumTracker {
    smoothed: Vec<f32>,
}

impl SpectrumTracker {
    /// Tracker for `band_count` bands, all starting at zero
    pub fn new(band_count: usize) -> Self {
        Self {
            smoothed: vec![0.0; band_count],
        }
    }

    /// Tracker seeded with existing smoothed values
    pub fn from_values(values: Vec<f32>) -> Self {
        Self { smoothed: values }
    }

    /// `smoothed[i] = max(smoothed[i] * decay_rate, raw[i])`.
    ///
    /// Bands missing from `raw` only decay; extra raw values are ignored.
    pub fn update(&mut self, raw: &[f32], decay_rate: f32) {
        if raw.len() != self.smoothed.len() {
            log::trace!(
                "spectrum has {} bands, expected {}",
                raw.len(),
                self.smoothed.len()
            );
        }
        for (i, band) in self.smoothed.iter_mut().enumerate() {
            let incoming = raw.get(i).copied().unwrap_or(0.0);
            *band = (*band * decay_rate).max(incoming);
        }
    }

    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    pub fn band_count(&self) -> usize {
        self.smoothed.len()
    }
}
