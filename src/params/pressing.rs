//! Mesh-shaping parameters and audio file selection.

use crate::mesh::RingGeometry;

use super::read_key;

/// Parameters that shape the pressing, read from the `[settings]` table
#[derive(Debug, Clone, PartialEq)]
pub struct PressingParams {
    /// Per-tick multiplier applied to the smoothed spectrum (falling peaks)
    pub decay_rate: f32,

    /// Height in world units per unit of spectrum magnitude
    pub frequency_scale: f32,

    /// Distance from the centre where each radial line starts
    pub radial_position_start: f32,

    /// Furthest radial point
    pub radial_position_end: f32,

    /// Rings added per second
    pub line_resolution: f32,

    /// Height of the flat base the side wall drops to
    pub surface_depth: f32,

    /// Spectrum bands per ring
    pub band_count: usize,
}

impl PressingParams {
    fn default_decay_rate() -> f32 {
        0.97
    }
    fn default_frequency_scale() -> f32 {
        100.0
    }
    fn default_radial_position_start() -> f32 {
        10.0
    }
    fn default_radial_position_end() -> f32 {
        1000.0
    }
    fn default_line_resolution() -> f32 {
        1.0
    }
    fn default_surface_depth() -> f32 {
        -20.0
    }
    fn default_band_count() -> usize {
        256
    }

    /// Seconds between rings
    pub fn line_period_s(&self) -> f32 {
        1.0 / self.line_resolution
    }

    /// Ring placement so one revolution spans `rotation_period_s`
    pub fn ring_geometry(&self, rotation_period_s: f32) -> RingGeometry {
        RingGeometry {
            angle_step: RingGeometry::angle_step_for(rotation_period_s, self.line_period_s()),
            radial_start: self.radial_position_start,
            radial_end: self.radial_position_end,
            height_scale: self.frequency_scale,
        }
    }

    /// Read the `[settings]` table, one key at a time
    pub fn from_table(table: &toml::Table) -> Self {
        const SECTION: &str = "settings";
        Self {
            decay_rate: read_key(table, SECTION, "decay-rate", Self::default_decay_rate),
            frequency_scale: read_key(
                table,
                SECTION,
                "frequency-scale",
                Self::default_frequency_scale,
            ),
            radial_position_start: read_key(
                table,
                SECTION,
                "radial-position-start",
                Self::default_radial_position_start,
            ),
            radial_position_end: read_key(
                table,
                SECTION,
                "radial-position-end",
                Self::default_radial_position_end,
            ),
            line_resolution: read_key(
                table,
                SECTION,
                "line-resolution",
                Self::default_line_resolution,
            ),
            surface_depth: read_key(table, SECTION, "surface-depth", Self::default_surface_depth),
            band_count: read_key(table, SECTION, "band-count", Self::default_band_count),
        }
        .sanitized()
    }

    /// Replace values the pressing cannot be built from with their defaults
    pub fn sanitized(mut self) -> Self {
        if !(self.line_resolution.is_finite() && self.line_resolution > 0.0) {
            log::warn!(
                "line-resolution must be > 0, got {}; using {}",
                self.line_resolution,
                Self::default_line_resolution()
            );
            self.line_resolution = Self::default_line_resolution();
        }
        if self.band_count < 2 {
            log::warn!(
                "band-count must be >= 2, got {}; using {}",
                self.band_count,
                Self::default_band_count()
            );
            self.band_count = Self::default_band_count();
        }
        self
    }
}

impl Default for PressingParams {
    fn default() -> Self {
        Self {
            decay_rate: Self::default_decay_rate(),
            frequency_scale: Self::default_frequency_scale(),
            radial_position_start: Self::default_radial_position_start(),
            radial_position_end: Self::default_radial_position_end(),
            line_resolution: Self::default_line_resolution(),
            surface_depth: Self::default_surface_depth(),
            band_count: Self::default_band_count(),
        }
    }
}

/// One entry of the `[file-index]` table
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Audio file path, relative to the settings file
    pub name: String,

    /// Duration of one full rotation (seconds), normally the track length
    pub length: f32,
}

impl FileEntry {
    fn default_name() -> String {
        "none".to_string()
    }
    fn default_length() -> f32 {
        60.0
    }

    /// Read one `[file-index.<key>]` table, one key at a time
    pub fn from_table(key: &str, table: &toml::Table) -> Self {
        let section = format!("file-index.{}", key);
        Self {
            name: read_key(table, &section, "name", Self::default_name),
            length: read_key(table, &section, "length", Self::default_length),
        }
        .sanitized()
    }

    /// Replace a non-positive length with the default
    pub fn sanitized(mut self) -> Self {
        if !(self.length.is_finite() && self.length > 0.0) {
            log::warn!(
                "{}: length must be > 0, got {}; using {}",
                self.name,
                self.length,
                Self::default_length()
            );
            self.length = Self::default_length();
        }
        self
    }
}

impl Default for FileEntry {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            length: Self::default_length(),
        }
    }
}
