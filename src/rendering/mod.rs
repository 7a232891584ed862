//! Rendering system with wgpu pipeline and shader management.

mod capture;
mod overlay;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::path::PathBuf;
use std::sync::Arc;

use crate::mesh::{Mesh, Vertex};
use crate::params::RenderConfig;

pub use capture::{capture_frame, capture_layout, padded_bytes_per_row, unpad_rows};
pub use overlay::{bar_quads, OverlayVertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Ambient light fraction for Lambert shading
const AMBIENT: f32 = 0.3;

/// Errors raised by the renderer
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("frame unavailable: {0}")]
    Frame(#[from] wgpu::SurfaceError),

    #[error("surface format {0:?} cannot be captured")]
    CaptureFormat(wgpu::TextureFormat),

    #[error("failed to map capture buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("capture buffer mapping was abandoned")]
    MapAborted,

    #[error("failed to save screenshot {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Uniform buffer for the mesh shader (view-projection matrix + light)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_position: [f32; 3],
    pub ambient: f32,
}

/// Buffer size after growing to hold `needed` bytes (doubling, never shrinking)
pub fn grown_capacity(current: u64, needed: u64) -> u64 {
    let mut capacity = current.max(1);
    while capacity < needed {
        capacity *= 2;
    }
    capacity
}

/// GPU buffer that doubles in size when its contents outgrow it
struct GrowableBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl GrowableBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages) -> Self {
        let capacity = 1 << 16;
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            buffer: Self::allocate(device, label, usage, capacity),
            capacity,
            usage,
            label,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        size: u64,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        let needed = wgpu::util::align_to(bytes.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT);
        if needed > self.capacity {
            self.capacity = grown_capacity(self.capacity, needed);
            self.buffer = Self::allocate(device, self.label, self.usage, self.capacity);
            log::debug!("{} grown to {} bytes", self.label, self.capacity);
        }
        if bytes.is_empty() {
            return;
        }
        if bytes.len() as u64 == needed {
            queue.write_buffer(&self.buffer, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(needed as usize, 0);
            queue.write_buffer(&self.buffer, 0, &padded);
        }
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    mesh_pipeline: wgpu::RenderPipeline,
    wire_pipeline: Option<wgpu::RenderPipeline>,
    overlay_pipeline: wgpu::RenderPipeline,

    vertex_buffer: GrowableBuffer,
    index_buffer: GrowableBuffer,
    index_count: u32,

    overlay_vertex_buffer: GrowableBuffer,
    overlay_index_buffer: GrowableBuffer,
    overlay_index_count: u32,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    render_config: RenderConfig,
    wireframe: bool,
    can_capture: bool,
    pending_screenshot: Option<PathBuf>,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: Arc<winit::window::Window>,
        render_config: RenderConfig,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance.create_surface(window)?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        // Line polygon mode only where the adapter has it
        let line_mode = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if line_mode {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            log::warn!("adapter lacks POLYGON_MODE_LINE, wireframe disabled");
            wgpu::Features::empty()
        };

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        // COPY_SRC needed for screenshots
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        let can_capture = surface_caps.usages.contains(wgpu::TextureUsages::COPY_SRC)
            && capture_layout(surface_format).is_some();
        if can_capture {
            usage |= wgpu::TextureUsages::COPY_SRC;
        } else {
            log::warn!("surface cannot be copied, screenshots disabled");
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        // Load shaders
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let overlay_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
        });

        // Create buffers
        let vertex_buffer = GrowableBuffer::new(&device, "Vertex Buffer", wgpu::BufferUsages::VERTEX);
        let index_buffer = GrowableBuffer::new(&device, "Index Buffer", wgpu::BufferUsages::INDEX);
        let overlay_vertex_buffer =
            GrowableBuffer::new(&device, "Overlay Vertex Buffer", wgpu::BufferUsages::VERTEX);
        let overlay_index_buffer =
            GrowableBuffer::new(&device, "Overlay Index Buffer", wgpu::BufferUsages::INDEX);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Create mesh bind group
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mesh_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_mesh_pipeline(
            &device,
            &mesh_pipeline_layout,
            &shader,
            config.format,
            wgpu::PolygonMode::Fill,
        );
        let wire_pipeline = line_mode.then(|| {
            create_mesh_pipeline(
                &device,
                &mesh_pipeline_layout,
                &shader,
                config.format,
                wgpu::PolygonMode::Line,
            )
        });

        // Create overlay pipeline (no bindings, drawn over the mesh)
        let overlay_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Overlay Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        let overlay_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&overlay_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &overlay_shader,
                entry_point: Some("vs_main"),
                buffers: &[OverlayVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &overlay_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            mesh_pipeline,
            wire_pipeline,
            overlay_pipeline,
            vertex_buffer,
            index_buffer,
            index_count: 0,
            overlay_vertex_buffer,
            overlay_index_buffer,
            overlay_index_count: 0,
            uniform_buffer,
            uniform_bind_group,
            render_config,
            wireframe: false,
            can_capture,
            pending_screenshot: None,
        })
    }

    /// Current surface size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Reconfigure the surface and depth buffer for a new window size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Upload the whole mesh (normals of existing vertices change every ring)
    pub fn update_mesh(&mut self, mesh: &Mesh) {
        let vertices = mesh.gpu_vertices();
        self.vertex_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&vertices));
        self.index_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(mesh.indices()));
        self.index_count = mesh.indices().len() as u32;
    }

    /// Replace the spectrum bars (empty slice hides the overlay)
    pub fn update_overlay(&mut self, spectrum: &[f32]) {
        let (vertices, indices) = bar_quads(spectrum, &self.render_config, self.size());
        self.overlay_vertex_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&vertices));
        self.overlay_index_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&indices));
        self.overlay_index_count = indices.len() as u32;
    }

    /// Update mesh uniforms
    pub fn update_view(&self, view_proj: Mat4) {
        let uniforms = Uniforms {
            view_proj: view_proj.to_cols_array_2d(),
            light_position: self.render_config.light_position,
            ambient: AMBIENT,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Toggle wireframe display, returning whether it is now on
    pub fn toggle_wireframe(&mut self) -> bool {
        if self.wire_pipeline.is_some() {
            self.wireframe = !self.wireframe;
        } else {
            log::warn!("wireframe unsupported on this adapter");
        }
        self.wireframe
    }

    /// Save the next rendered frame to `path`
    pub fn request_screenshot(&mut self, path: PathBuf) {
        if self.can_capture {
            self.pending_screenshot = Some(path);
        } else {
            log::error!("screenshots unsupported on this surface");
        }
    }

    /// Render a frame (and capture it if a screenshot is pending)
    pub fn render(&mut self) -> Result<(), RenderError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let [r, g, b] = self.render_config.clear_color;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Render mesh
            if self.index_count > 0 {
                let pipeline = match (&self.wire_pipeline, self.wireframe) {
                    (Some(wire), true) => wire,
                    _ => &self.mesh_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.buffer.slice(..));
                render_pass.set_index_buffer(
                    self.index_buffer.buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                render_pass.draw_indexed(0..self.index_count, 0, 0..1);
            }

            // Render spectrum bars on top
            if self.overlay_index_count > 0 {
                render_pass.set_pipeline(&self.overlay_pipeline);
                render_pass.set_vertex_buffer(0, self.overlay_vertex_buffer.buffer.slice(..));
                render_pass.set_index_buffer(
                    self.overlay_index_buffer.buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                render_pass.draw_indexed(0..self.overlay_index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        // Capture frame if requested
        if let Some(path) = self.pending_screenshot.take() {
            match capture_frame(&self.device, &self.queue, &output.texture, &path) {
                Ok(()) => log::info!("screenshot saved to {}", path.display()),
                Err(e) => log::error!("screenshot failed: {}", e),
            }
        }

        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    let (label, fragment_entry) = match polygon_mode {
        wgpu::PolygonMode::Line => ("Wireframe Pipeline", "fs_wire"),
        _ => ("Mesh Pipeline", "fs_main"),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Open surface is visible from below while it grows
            cull_mode: None,
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_capacity_doubles() {
        assert_eq!(grown_capacity(1024, 100), 1024);
        assert_eq!(grown_capacity(1024, 1025), 2048);
        assert_eq!(grown_capacity(1024, 5000), 8192);
        assert_eq!(grown_capacity(0, 3), 4);
    }

    #[test]
    fn test_uniforms_layout() {
        // mat4 + vec3 + f32 packs into 80 bytes (WGSL alignment 16)
        assert_eq!(std::mem::size_of::<Uniforms>(), 80);
    }
}
