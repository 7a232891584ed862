//! Frame capture to PNG.

use std::path::Path;
use std::sync::mpsc;

use super::RenderError;

const BYTES_PER_PIXEL: u32 = 4; // RGBA8 / BGRA8

/// Row pitch padded to wgpu's copy alignment
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strip row padding from a mapped copy and reorder BGRA to RGBA if needed
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32, bgra: bool) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let mut image_data = Vec::with_capacity(row * height as usize);

    for y in 0..height as usize {
        let start = y * padded_row as usize;
        image_data.extend_from_slice(&data[start..start + row]);
    }

    if bgra {
        for pixel in image_data.chunks_exact_mut(BYTES_PER_PIXEL as usize) {
            pixel.swap(0, 2);
        }
    }
    image_data
}

/// Whether a surface format can be saved directly (8-bit, 4 channels)
pub fn capture_layout(format: wgpu::TextureFormat) -> Option<bool> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => Some(false),
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => Some(true),
        _ => None,
    }
}

/// Copy `texture` into a mapped buffer and save it as a PNG at `path`
pub fn capture_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    path: &Path,
) -> Result<(), RenderError> {
    let format = texture.format();
    let bgra = capture_layout(format).ok_or(RenderError::CaptureFormat(format))?;
    let (width, height) = (texture.width(), texture.height());
    let padded_row = padded_bytes_per_row(width);

    // Create buffer to read texture data
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Frame Capture Buffer"),
        size: (padded_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    // Copy texture to buffer
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Capture Encoder"),
    });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    queue.submit(std::iter::once(encoder.finish()));

    // Map buffer and wait for the copy
    let buffer_slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv().map_err(|_| RenderError::MapAborted)??;

    let image_data = {
        let data = buffer_slice.get_mapped_range();
        unpad_rows(&data, width, height, padded_row, bgra)
    };
    buffer.unmap();

    image::save_buffer(path, &image_data, width, height, image::ColorType::Rgba8).map_err(
        |source| RenderError::Save {
            path: path.to_path_buf(),
            source,
        },
    )
}
