//! Compile-time particle typing
//!
//! A `ParticleKind` fixes the particle record, the vertex record and the
//! conversion between them. Layers are generic over their kind, so there is
//! no runtime class registration.

use crate::renderer::{GpuVertex, TILE_PROGRAM};

pub trait ParticleKind: 'static {
    type Particle: Clone + Default + 'static;
    type Vertex: GpuVertex;

    /// Class name, used in logs and layer lookups
    const NAME: &'static str;
    /// GPU program the layer draws with
    const PROGRAM: &'static str = TILE_PROGRAM;
    /// Vertices produced by `particle_to_vertices` for every particle
    const VERTICES_PER_PARTICLE: usize = 6;
    /// Vertices depend on something other than the particles (time, ...),
    /// so the layer must rebuild them every frame
    const DYNAMIC_VERTICES: bool = false;

    /// Advance the particles of one allocation. May remove particles.
    /// Returns true if anything changed (forces a GPU resync).
    fn update_particles(&self, _delta_time: f32, _particles: &mut Vec<Self::Particle>) -> bool {
        false
    }

    /// Append exactly `VERTICES_PER_PARTICLE` vertices for `particle`
    fn particle_to_vertices(&self, particle: &Self::Particle, output: &mut Vec<Self::Vertex>);
}
