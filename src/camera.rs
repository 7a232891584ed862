//! Orbit camera circling the centre of the pressing.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Radians of orbit per pixel of mouse drag
const DRAG_SENSITIVITY: f32 = 0.005;

/// Fractional distance change per wheel line
const ZOOM_STEP: f32 = 0.1;

const MIN_DISTANCE: f32 = 10.0;

/// Keeps the eye off the pole where the Z-up basis degenerates
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Camera orbiting a target point, Z up (the pressing's height axis)
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    target: Vec3,
    distance: f32,

    /// Rotation about Z (radians)
    yaw: f32,

    /// Elevation above the XY plane (radians)
    pitch: f32,

    max_distance: f32,
}

impl OrbitCamera {
    /// Camera looking down at the origin from `config.camera_distance`
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: config.camera_distance,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 1.0,
            // Stay inside the far plane
            max_distance: config.far_plane * 0.5,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Orbit by a mouse drag of (`dx`, `dy`) pixels
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * DRAG_SENSITIVITY;
        self.pitch = (self.pitch + dy * DRAG_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Zoom by wheel `lines` (positive moves closer)
    pub fn zoom(&mut self, lines: f32) {
        let factor = (1.0 - lines * ZOOM_STEP).max(0.1);
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, self.max_distance);
    }

    /// Eye position in world space
    pub fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch)
    }

    /// Create view-projection matrix for rendering
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, camera_position)
    pub fn view_proj(&self, render_config: &RenderConfig, aspect: f32) -> (Mat4, Vec3) {
        let eye = self.eye();
        let view = Mat4::look_at_rh(eye, self.target, Vec3::Z);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            aspect,
            render_config.near_plane,
            render_config.far_plane,
        );

        (proj * view, eye)
    }
}
