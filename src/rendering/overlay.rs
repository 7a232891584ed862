//! Spectrum bar overlay geometry.

use bytemuck::{Pod, Zeroable};

use crate::params::RenderConfig;

const BAR_COLOR: [f32; 4] = [0.15, 0.15, 0.15, 1.0];

/// Screen-space vertex (NDC position + color)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl OverlayVertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Build one quad per band rising from the overlay baseline.
///
/// Bar `i` is centred in its `bar_spacing_px` slot from the left edge and is
/// `value * bar_scale_px` tall. Zero-height bars are skipped.
pub fn bar_quads(
    spectrum: &[f32],
    config: &RenderConfig,
    screen: (u32, u32),
) -> (Vec<OverlayVertex>, Vec<u32>) {
    let (width, height) = (screen.0.max(1) as f32, screen.1.max(1) as f32);
    let to_ndc = |x: f32, y: f32| [x / width * 2.0 - 1.0, 1.0 - y / height * 2.0];

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for (i, &value) in spectrum.iter().enumerate() {
        let bar_height = value * config.bar_scale_px;
        if bar_height <= 0.0 {
            continue;
        }
        let left = (i as f32 + 0.5) * config.bar_spacing_px;
        let right = left + config.bar_width_px;
        let bottom = config.bar_baseline_px;
        let top = bottom - bar_height;

        let base = vertices.len() as u32;
        for (x, y) in [(left, top), (left, bottom), (right, bottom), (right, top)] {
            vertices.push(OverlayVertex {
                position: to_ndc(x, y),
                color: BAR_COLOR,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_height_and_position() {
        let config = RenderConfig::default();
        let (vertices, indices) = bar_quads(&[0.0, 0.5], &config, (1000, 1000));

        // Zero band skipped
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);

        // Band 1: x 15..18 px, y 550..600 px (0.5 * 100 px tall)
        let top_left = vertices[0].position;
        let bottom_right = vertices[2].position;
        assert!((top_left[0] - (15.0 / 1000.0 * 2.0 - 1.0)).abs() < 1e-6);
        assert!((bottom_right[0] - (18.0 / 1000.0 * 2.0 - 1.0)).abs() < 1e-6);
        assert!((top_left[1] - (1.0 - 550.0 / 1000.0 * 2.0)).abs() < 1e-6);
        assert!((bottom_right[1] - (1.0 - 600.0 / 1000.0 * 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_spectrum() {
        let (vertices, indices) = bar_quads(&[], &RenderConfig::default(), (800, 600));
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }
}
