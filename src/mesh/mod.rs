//! Append-only triangle mesh grown ring by ring from the spectrum.

mod builder;
pub mod export;
pub mod ring;

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

// Re-export public types
pub use builder::{FinishOutcome, RadialMeshBuilder, RingGeometry, MIN_RINGS_TO_SEAL};
pub use export::{export_ply, write_ply, ExportError};

/// Normal given to every vertex before any triangle has touched it
pub const PLACEHOLDER_NORMAL: Vec3 = Vec3::Z;

/// Sea green, the surface color of every vertex
pub const SEA_GREEN: [f32; 4] = [46.0 / 255.0, 139.0 / 255.0, 87.0 / 255.0, 1.0];

/// Errors raised when configuring a mesh builder
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("a ring needs at least 2 bands, got {0}")]
    TooFewBands(usize),
}

/// GPU vertex layout (position + normal + color)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    /// Vertex buffer layout matching `shader.wgsl`
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Vertex, color, normal and triangle buffers.
///
/// Every list only grows. Normals are kept twice: the running sum of every
/// incident face normal, and the normalized snapshot handed to renderers.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    colors: Vec<[f32; 4]>,
    normals: Vec<Vec3>,
    normal_sums: Vec<Vec3>,
    indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex with its color and a placeholder normal, returning its index
    pub fn add_vertex(&mut self, position: Vec3, color: [f32; 4]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        self.colors.push(color);
        self.normals.push(PLACEHOLDER_NORMAL);
        self.normal_sums.push(Vec3::ZERO);
        index
    }

    /// Append a triangle without touching normals
    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        let count = self.vertices.len() as u32;
        debug_assert!(
            a < count && b < count && c < count,
            "triangle ({}, {}, {}) references a vertex beyond {}",
            a,
            b,
            c,
            count
        );
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append a triangle and fold its face normal into all three corners
    pub fn add_shaded_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.add_triangle(a, b, c);
        if let Some(face) = self.face_normal(a, b, c) {
            self.accumulate_normal(a, face);
            self.accumulate_normal(b, face);
            self.accumulate_normal(c, face);
        }
    }

    /// Unit normal of triangle `(a, b, c)` from edges `b - a` and `c - a`.
    ///
    /// `None` for zero-area triangles.
    pub fn face_normal(&self, a: u32, b: u32, c: u32) -> Option<Vec3> {
        let va = self.vertices[a as usize];
        let vb = self.vertices[b as usize];
        let vc = self.vertices[c as usize];
        (vb - va).cross(vc - va).try_normalize()
    }

    /// Add `face` to the running sum of vertex `index` and renormalize
    pub fn accumulate_normal(&mut self, index: u32, face: Vec3) {
        let i = index as usize;
        self.normal_sums[i] += face;
        if let Some(n) = self.normal_sums[i].try_normalize() {
            self.normals[i] = n;
        }
    }

    pub fn vertex(&self, index: u32) -> Vec3 {
        self.vertices[index as usize]
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Interleaved vertex data for upload to the GPU
    pub fn gpu_vertices(&self) -> Vec<Vertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((p, n), c)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                color: *c,
            })
            .collect()
    }

    /// Number of undirected edges not shared by exactly two triangles
    pub fn boundary_edge_count(&self) -> usize {
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for [a, b, c] in self.triangles() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        edges.values().filter(|&&n| n != 2).count()
    }

    /// True when every directed edge appears once and its reverse appears once.
    ///
    /// That means the surface is closed and all triangles wind the same way.
    pub fn is_closed_manifold(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
        for [a, b, c] in self.triangles() {
            for edge in [(a, b), (b, c), (c, a)] {
                *directed.entry(edge).or_insert(0) += 1;
            }
        }
        directed
            .iter()
            .all(|(&(u, v), &n)| n == 1 && directed.get(&(v, u)) == Some(&1))
    }
}
