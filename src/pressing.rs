//! High-level pressing system: spectrum smoothing paced into mesh rings.

use crate::mesh::{FinishOutcome, MeshError, RadialMeshBuilder, RingGeometry, SEA_GREEN};
use crate::pacer::LineClock;
use crate::params::PressingParams;
use crate::spectrum::SpectrumTracker;

/// Owns the tracker, the builder and the ring cadence
pub struct PressingSystem {
    pub params: PressingParams,
    tracker: SpectrumTracker,
    builder: RadialMeshBuilder,
    clock: LineClock,
    geometry: RingGeometry,
}

impl PressingSystem {
    /// Create an empty pressing whose full revolution takes `rotation_period_s`
    ///
    /// # Arguments
    /// * `params` - Mesh-shaping parameters
    /// * `rotation_period_s` - Length of the audio file (one revolution)
    /// * `start_s` - Clock time the first ring period counts from
    pub fn new(
        params: PressingParams,
        rotation_period_s: f32,
        start_s: f32,
    ) -> Result<Self, MeshError> {
        let builder = RadialMeshBuilder::new(params.band_count, SEA_GREEN)?;
        let tracker = SpectrumTracker::new(params.band_count);
        let clock = LineClock::new(params.line_period_s(), start_s);
        let geometry = params.ring_geometry(rotation_period_s);
        log::debug!(
            "pressing: {} bands, a ring every {:.3}s, {:.4} rad per ring",
            params.band_count,
            clock.period_s(),
            geometry.angle_step
        );

        Ok(Self {
            params,
            tracker,
            builder,
            clock,
            geometry,
        })
    }

    /// Feed one raw spectrum snapshot at time `now_s`
    ///
    /// # Returns
    /// * `true` if a ring was added to the mesh
    pub fn update(&mut self, raw: &[f32], now_s: f32) -> bool {
        self.tracker.update(raw, self.params.decay_rate);

        if !self.clock.tick(now_s) {
            return false;
        }
        let added = self.builder.add_ring(self.tracker.smoothed(), &self.geometry);
        if added {
            log::trace!(
                "ring {} at {:.3} rad",
                self.builder.stitched_rings(),
                self.builder.current_angle()
            );
        }
        added
    }

    /// Seal the mesh at the configured surface depth
    pub fn finish(&mut self) -> FinishOutcome {
        self.builder.finish(self.params.surface_depth)
    }

    pub fn builder(&self) -> &RadialMeshBuilder {
        &self.builder
    }

    pub fn smoothed(&self) -> &[f32] {
        self.tracker.smoothed()
    }

    pub fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }
}
