//! Rendering and output configuration.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    /// Large enough to keep a 1000-unit pressing in view while zoomed out
    pub far_plane: f32,

    /// Initial camera distance from the centre of the pressing
    pub camera_distance: f32,

    /// Background color (linear RGB)
    pub clear_color: [f64; 3],

    /// Point light position (world units)
    pub light_position: [f32; 3],

    /// Spectrum overlay: horizontal spacing between bars (pixels)
    pub bar_spacing_px: f32,

    /// Spectrum overlay: bar width (pixels)
    pub bar_width_px: f32,

    /// Spectrum overlay: bar height per unit of magnitude (pixels)
    pub bar_scale_px: f32,

    /// Spectrum overlay: baseline distance from the top of the window (pixels)
    pub bar_baseline_px: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 60.0,
            near_plane: 1.0,
            far_plane: 20000.0,
            camera_distance: 500.0,
            clear_color: [0.79, 0.79, 0.79], // 230 grey in sRGB
            light_position: [0.0, 0.0, 300.0],
            bar_spacing_px: 10.0,
            bar_width_px: 3.0,
            bar_scale_px: 100.0,
            bar_baseline_px: 600.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

/// Where mesh dumps and screenshots are written
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
}

impl OutputConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `meshdump_<unix seconds>.ply`
    pub fn mesh_dump_path(&self) -> PathBuf {
        self.timestamped("meshdump", "ply")
    }

    /// `screengrab_<unix seconds>.png`
    pub fn screenshot_path(&self) -> PathBuf {
        self.timestamped("screengrab", "png")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn timestamped(&self, prefix: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", prefix, unix_timestamp(), extension))
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Seconds since the unix epoch (0 if the clock is before it)
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let output = OutputConfig::new("dumps");
        let mesh = output.mesh_dump_path();
        let shot = output.screenshot_path();

        assert!(mesh.starts_with("dumps"));
        let mesh_name = mesh.file_name().unwrap().to_string_lossy().into_owned();
        assert!(mesh_name.starts_with("meshdump_") && mesh_name.ends_with(".ply"));

        let shot_name = shot.file_name().unwrap().to_string_lossy().into_owned();
        assert!(shot_name.starts_with("screengrab_") && shot_name.ends_with(".png"));
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2020-01-01
        assert!(unix_timestamp() > 1_577_836_800);
    }
}
