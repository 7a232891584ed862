//! Incremental radial mesh construction and sealing.

use std::f32::consts::TAU;

use glam::Vec3;

use super::ring::{ring_end, ring_start};
use super::{Mesh, MeshError};

/// Fewest stitched rings that enclose a volume when joined last-to-first
pub const MIN_RINGS_TO_SEAL: usize = 3;

/// Placement of one ring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingGeometry {
    /// Rotation added before the ring is placed (radians)
    pub angle_step: f32,

    /// Radius of the first band
    pub radial_start: f32,

    /// Radius the bands interpolate towards (the last band stops one step short)
    pub radial_end: f32,

    /// Height per unit of smoothed magnitude
    pub height_scale: f32,
}

impl RingGeometry {
    /// Angle step that completes one revolution in `rotation_period_s` when a
    /// ring is added every `call_period_s`
    pub fn angle_step_for(rotation_period_s: f32, call_period_s: f32) -> f32 {
        TAU / rotation_period_s * call_period_s
    }
}

/// Result of [`RadialMeshBuilder::finish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The mesh was closed into a solid
    Sealed {
        added_vertices: usize,
        added_triangles: usize,
    },

    /// Not enough rings to enclose anything; no geometry was added
    TooFewRings { rings: usize },

    /// The builder had already been finished
    AlreadyFinished,
}

/// Builds the radial surface one ring at a time and seals it on demand.
///
/// Rotation progress, the rim caches and the finish latch all live here.
#[derive(Debug, Clone)]
pub struct RadialMeshBuilder {
    mesh: Mesh,
    band_count: usize,
    color: [f32; 4],
    current_angle: f32,
    /// First vertex of every stitched ring (bore edge)
    inner_rim: Vec<u32>,
    /// Last vertex of every stitched ring (outer edge)
    outer_rim: Vec<u32>,
    finished: bool,
}

impl RadialMeshBuilder {
    /// Create a builder for rings of `band_count` vertices
    pub fn new(band_count: usize, color: [f32; 4]) -> Result<Self, MeshError> {
        if band_count < 2 {
            return Err(MeshError::TooFewBands(band_count));
        }
        Ok(Self {
            mesh: Mesh::new(),
            band_count,
            color,
            current_angle: 0.0,
            inner_rim: Vec::new(),
            outer_rim: Vec::new(),
            finished: false,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn current_angle(&self) -> f32 {
        self.current_angle
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of rings that made it into the stitched surface
    pub fn stitched_rings(&self) -> usize {
        self.inner_rim.len()
    }

    pub fn inner_rim(&self) -> &[u32] {
        &self.inner_rim
    }

    pub fn outer_rim(&self) -> &[u32] {
        &self.outer_rim
    }

    /// Rotate, append one ring shaped by `spectrum` and stitch it to the previous ring.
    ///
    /// Missing spectrum entries count as zero height. Returns `false` once the
    /// builder has been finished.
    pub fn add_ring(&mut self, spectrum: &[f32], geometry: &RingGeometry) -> bool {
        if self.finished {
            return false;
        }

        self.current_angle += geometry.angle_step;
        let (sin, cos) = self.current_angle.sin_cos();
        let n = self.band_count;

        for i in 0..n {
            let pct = i as f32 / n as f32;
            let radius = (1.0 - pct) * geometry.radial_start + pct * geometry.radial_end;
            let height = spectrum.get(i).copied().unwrap_or(0.0) * geometry.height_scale;
            self.mesh
                .add_vertex(Vec3::new(cos * radius, sin * radius, height), self.color);
        }

        let count = self.mesh.vertex_count();
        if let (Some(prev), Some(next)) = (ring_start(count, n, 2), ring_start(count, n, 1)) {
            if self.inner_rim.is_empty() {
                self.record_rim(prev);
            }
            self.record_rim(next);
            self.stitch_rings(prev as u32, next as u32);
        }

        log::trace!(
            "ring added at {:.3} rad ({} vertices, {} triangles)",
            self.current_angle,
            count,
            self.mesh.triangle_count()
        );
        true
    }

    /// Seal the surface into a closed solid with its base at `base_depth`.
    ///
    /// Latches the builder: later calls and later rings are ignored.
    pub fn finish(&mut self, base_depth: f32) -> FinishOutcome {
        if self.finished {
            return FinishOutcome::AlreadyFinished;
        }
        self.finished = true;

        let rings = self.stitched_rings();
        if rings < MIN_RINGS_TO_SEAL {
            log::warn!("not sealing: {} rings stitched, need {}", rings, MIN_RINGS_TO_SEAL);
            return FinishOutcome::TooFewRings { rings };
        }

        let vertices_before = self.mesh.vertex_count();
        let triangles_before = self.mesh.triangle_count();

        self.connect_last_to_first();
        self.build_inner_bore();
        self.build_outer_wall(base_depth);

        let outcome = FinishOutcome::Sealed {
            added_vertices: self.mesh.vertex_count() - vertices_before,
            added_triangles: self.mesh.triangle_count() - triangles_before,
        };
        log::info!(
            "mesh sealed: {} vertices, {} triangles",
            self.mesh.vertex_count(),
            self.mesh.triangle_count()
        );
        outcome
    }

    fn record_rim(&mut self, ring_first: usize) {
        self.inner_rim.push(ring_first as u32);
        self.outer_rim.push(ring_end(ring_first, self.band_count) as u32);
    }

    /// Two triangles per band pair between the ring at `prev` and the ring at `next`
    fn stitch_rings(&mut self, prev: u32, next: u32) {
        for j in 0..(self.band_count as u32 - 1) {
            self.stitch_quad(prev + j, prev + j + 1, next + j, next + j + 1);
        }
    }

    /// Triangles `(i1, i2, i4)` and `(i4, i3, i1)`.
    ///
    /// `i1` and `i4` pick up both face normals, `i2` and `i3` one each.
    fn stitch_quad(&mut self, i1: u32, i2: u32, i3: u32, i4: u32) {
        self.mesh.add_shaded_triangle(i1, i2, i4);
        self.mesh.add_shaded_triangle(i4, i3, i1);
    }

    /// Wrap around: the last ring stitched straight onto the first
    fn connect_last_to_first(&mut self) {
        let (Some(&first), Some(&last)) = (self.inner_rim.first(), self.inner_rim.last()) else {
            return;
        };
        if first == last {
            return;
        }
        self.stitch_rings(last, first);
    }

    /// Column from the bore edge up to the tallest bore-edge sample, capped on top
    fn build_inner_bore(&mut self) {
        if self.inner_rim.len() < 2 {
            return;
        }
        let top = self
            .inner_rim
            .iter()
            .map(|&i| self.mesh.vertex(i).z)
            .fold(f32::NEG_INFINITY, f32::max);

        let inner = self.inner_rim.clone();
        let rim = self.lift_rim(&inner, top);

        let m = inner.len();
        for k in 0..m {
            let next = (k + 1) % m;
            // Faces away from the axis
            self.mesh.add_shaded_triangle(inner[k], inner[next], rim[next]);
            self.mesh.add_shaded_triangle(rim[next], rim[k], inner[k]);
        }

        let apex = self.mesh.add_vertex(Vec3::new(0.0, 0.0, top), self.color);
        self.cap_with_fan(&rim, apex, false);
    }

    /// Skirt from the outer edge down to `base_depth`, capped underneath
    fn build_outer_wall(&mut self, base_depth: f32) {
        if self.outer_rim.len() < 2 {
            return;
        }
        let outer = self.outer_rim.clone();
        let rim = self.lift_rim(&outer, base_depth);

        let m = outer.len();
        for k in 0..m {
            let next = (k + 1) % m;
            // Faces radially outward
            self.mesh.add_shaded_triangle(outer[next], outer[k], rim[k]);
            self.mesh.add_shaded_triangle(rim[k], rim[next], outer[next]);
        }

        let center = self.mesh.add_vertex(Vec3::new(0.0, 0.0, base_depth), self.color);
        self.cap_with_fan(&rim, center, true);
    }

    /// Copy of each vertex in `source` moved to height `z`
    fn lift_rim(&mut self, source: &[u32], z: f32) -> Vec<u32> {
        source
            .iter()
            .map(|&i| {
                let p = self.mesh.vertex(i);
                self.mesh.add_vertex(Vec3::new(p.x, p.y, z), self.color)
            })
            .collect()
    }

    /// Close a counter-clockwise rim with one triangle per rim edge.
    ///
    /// Facing up unless `downward`.
    fn cap_with_fan(&mut self, rim: &[u32], center: u32, downward: bool) {
        let m = rim.len();
        for k in 0..m {
            let (a, b) = (rim[k], rim[(k + 1) % m]);
            if downward {
                self.mesh.add_shaded_triangle(b, a, center);
            } else {
                self.mesh.add_shaded_triangle(a, b, center);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{PLACEHOLDER_NORMAL, SEA_GREEN};
    use std::f32::consts::FRAC_PI_2;

    fn geometry(angle_step: f32) -> RingGeometry {
        RingGeometry {
            angle_step,
            radial_start: 10.0,
            radial_end: 20.0,
            height_scale: 5.0,
        }
    }

    /// Builder with `rings` rings of a gently varying four-band spectrum
    fn build(rings: usize) -> RadialMeshBuilder {
        build_with_step(rings, TAU / rings as f32)
    }

    fn build_with_step(rings: usize, angle_step: f32) -> RadialMeshBuilder {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        let g = geometry(angle_step);
        for r in 0..rings {
            let s = r as f32 * 0.1;
            builder.add_ring(&[s, 1.0 + s, 0.5, 2.0 - s], &g);
        }
        builder
    }

    fn assert_no_forward_references(mesh: &Mesh) {
        for t in mesh.triangles() {
            for i in t {
                assert!((i as usize) < mesh.vertex_count());
            }
        }
    }

    #[test]
    fn test_rejects_single_band() {
        assert!(matches!(
            RadialMeshBuilder::new(1, SEA_GREEN),
            Err(MeshError::TooFewBands(1))
        ));
    }

    #[test]
    fn test_two_rings_scenario() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        let g = geometry(FRAC_PI_2);

        assert!(builder.add_ring(&[0.0; 4], &g));
        assert_eq!(builder.mesh().vertex_count(), 4);
        assert_eq!(builder.mesh().triangle_count(), 0);

        assert!(builder.add_ring(&[1.0; 4], &g));
        let mesh = builder.mesh();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 6);
        for v in &mesh.vertices()[4..8] {
            assert_eq!(v.z, 5.0);
        }
    }

    #[test]
    fn test_ring_positions_follow_angle_and_radius() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        builder.add_ring(&[0.0; 4], &geometry(FRAC_PI_2));

        let mesh = builder.mesh();
        // Radii interpolate by i/N: 10, 12.5, 15, 17.5
        let expected = [10.0, 12.5, 15.0, 17.5];
        for (v, r) in mesh.vertices().iter().zip(expected) {
            assert!(v.x.abs() < 1e-4);
            assert!((v.y - r).abs() < 1e-4);
        }
        assert!((builder.current_angle() - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_each_ring_appends_band_count_of_everything() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        let g = geometry(0.3);
        for r in 1..=5 {
            builder.add_ring(&[1.0, 2.0, 3.0, 4.0], &g);
            let mesh = builder.mesh();
            assert_eq!(mesh.vertex_count(), 4 * r);
            assert_eq!(mesh.colors().len(), 4 * r);
            assert_eq!(mesh.normals().len(), 4 * r);
            assert_eq!(mesh.triangle_count(), 2 * 3 * (r - 1));
        }
    }

    #[test]
    fn test_short_spectrum_counts_as_zero() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        builder.add_ring(&[2.0], &geometry(0.1));
        let z: Vec<f32> = builder.mesh().vertices().iter().map(|v| v.z).collect();
        assert_eq!(z, vec![10.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rim_caches_grow_one_entry_per_ring() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        let g = geometry(0.2);

        builder.add_ring(&[0.0; 4], &g);
        assert!(builder.inner_rim().is_empty());

        builder.add_ring(&[0.0; 4], &g);
        assert_eq!(builder.inner_rim(), &[0, 4]);
        assert_eq!(builder.outer_rim(), &[3, 7]);

        builder.add_ring(&[0.0; 4], &g);
        assert_eq!(builder.inner_rim(), &[0, 4, 8]);
        assert_eq!(builder.outer_rim(), &[3, 7, 11]);
    }

    #[test]
    fn test_surface_normals_face_up() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        let g = geometry(0.2);
        builder.add_ring(&[0.0; 4], &g);
        builder.add_ring(&[0.0; 4], &g);

        for n in builder.mesh().normals() {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.abs_diff_eq(Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn test_quad_normals_reach_their_own_vertices() {
        let mut builder = RadialMeshBuilder::new(2, SEA_GREEN).unwrap();
        let g = geometry(FRAC_PI_2);
        builder.add_ring(&[0.0, 0.0], &g);
        builder.add_ring(&[0.0, 1.0], &g);

        // One quad: i1 = 0, i2 = 1, i3 = 2, i4 = 3
        let mesh = builder.mesh();
        let f1 = mesh.face_normal(0, 1, 3).unwrap();
        let f2 = mesh.face_normal(3, 2, 0).unwrap();
        assert!(mesh.normals()[0].abs_diff_eq((f1 + f2).normalize(), 1e-5));
        assert!(mesh.normals()[1].abs_diff_eq(f1, 1e-5));
        assert!(mesh.normals()[2].abs_diff_eq(f2, 1e-5));
        assert!(mesh.normals()[3].abs_diff_eq((f1 + f2).normalize(), 1e-5));
    }

    #[test]
    fn test_finish_before_any_ring_is_harmless() {
        let mut builder = RadialMeshBuilder::new(4, SEA_GREEN).unwrap();
        assert_eq!(builder.finish(-20.0), FinishOutcome::TooFewRings { rings: 0 });
        assert_eq!(builder.mesh().triangle_count(), 0);
        assert_eq!(builder.mesh().vertex_count(), 0);
        assert!(builder.is_finished());
    }

    #[test]
    fn test_finish_with_too_few_rings_adds_nothing() {
        let mut builder = build(2);
        let triangles = builder.mesh().triangle_count();
        assert_eq!(builder.finish(-20.0), FinishOutcome::TooFewRings { rings: 2 });
        assert_eq!(builder.mesh().triangle_count(), triangles);
    }

    #[test]
    fn test_finish_latches() {
        let mut builder = build(6);
        assert!(matches!(builder.finish(-20.0), FinishOutcome::Sealed { .. }));
        let vertices = builder.mesh().vertex_count();
        let triangles = builder.mesh().triangle_count();

        assert_eq!(builder.finish(-20.0), FinishOutcome::AlreadyFinished);
        assert!(!builder.add_ring(&[1.0; 4], &geometry(0.1)));
        assert_eq!(builder.mesh().vertex_count(), vertices);
        assert_eq!(builder.mesh().triangle_count(), triangles);
    }

    #[test]
    fn test_finishing_steps_add_expected_geometry() {
        let rings = 6;
        let n = 4;
        let mut builder = build(rings);
        let surface = builder.mesh().triangle_count();
        assert_eq!(surface, 2 * (n - 1) * (rings - 1));

        builder.connect_last_to_first();
        assert_eq!(builder.mesh().triangle_count(), surface + 2 * (n - 1));

        let before = builder.mesh().clone();
        builder.build_inner_bore();
        assert_eq!(builder.mesh().vertex_count(), before.vertex_count() + rings + 1);
        assert_eq!(builder.mesh().triangle_count(), before.triangle_count() + 3 * rings);

        let before = builder.mesh().clone();
        builder.build_outer_wall(-20.0);
        assert_eq!(builder.mesh().vertex_count(), before.vertex_count() + rings + 1);
        assert_eq!(builder.mesh().triangle_count(), before.triangle_count() + 3 * rings);
    }

    #[test]
    fn test_sealed_mesh_is_closed_manifold() {
        for rings in [3, 4, 7, 16] {
            let mut builder = build(rings);
            assert!(!builder.mesh().is_closed_manifold());

            builder.finish(-20.0);
            let mesh = builder.mesh();
            assert_eq!(mesh.boundary_edge_count(), 0, "{} rings", rings);
            assert!(mesh.is_closed_manifold(), "{} rings", rings);
            assert_no_forward_references(mesh);
        }
    }

    #[test]
    fn test_partial_revolution_seals_closed() {
        // Every case spans well under one revolution
        for (rings, step) in [(5, 0.3), (3, 0.1), (12, 0.4)] {
            let mut builder = build_with_step(rings, step);
            assert!(matches!(builder.finish(-20.0), FinishOutcome::Sealed { .. }));

            let mesh = builder.mesh();
            assert_eq!(mesh.boundary_edge_count(), 0, "{} rings", rings);
            assert!(mesh.is_closed_manifold(), "{} rings", rings);
            assert_no_forward_references(mesh);
        }
    }

    #[test]
    fn test_sealed_normals_are_unit_or_untouched() {
        let mut builder = build(8);
        builder.finish(-20.0);
        for n in builder.mesh().normals() {
            assert!((n.length() - 1.0).abs() < 1e-4 || *n == PLACEHOLDER_NORMAL);
        }
    }

    #[test]
    fn test_caps_face_outward() {
        let mut builder = build(8);
        builder.finish(-20.0);
        let mesh = builder.mesh();
        let count = mesh.vertex_count() as u32;

        // Bottom center is the last vertex, bore apex closes the bore rim
        let bottom = count - 1;
        let apex = count - 1 - 8 - 1;
        assert!(mesh.normals()[bottom as usize].abs_diff_eq(-Vec3::Z, 1e-4));
        assert!(mesh.normals()[apex as usize].abs_diff_eq(Vec3::Z, 1e-4));
    }

    #[test]
    fn test_outer_wall_faces_away_from_axis() {
        let mut builder = build(8);
        builder.finish(-20.0);
        let mesh = builder.mesh();

        let mut wall_faces = 0;
        for [a, b, c] in mesh.triangles() {
            let centroid = (mesh.vertex(a) + mesh.vertex(b) + mesh.vertex(c)) / 3.0;
            let Some(normal) = mesh.face_normal(a, b, c) else {
                continue;
            };
            // Outer wall triangles are the vertical ones near the outer radius
            let radial = Vec3::new(centroid.x, centroid.y, 0.0);
            if radial.length() > 15.0 && normal.z.abs() < 1e-3 {
                assert!(normal.dot(radial) > 0.0);
                wall_faces += 1;
            }
        }
        assert_eq!(wall_faces, 2 * 8);
    }

    #[test]
    fn test_angle_step_completes_revolution() {
        let step = RingGeometry::angle_step_for(60.0, 0.5);
        assert!((step * 120.0 - TAU).abs() < 1e-4);
    }
}
