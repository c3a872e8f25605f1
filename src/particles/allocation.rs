//! Particle allocations
//!
//! An allocation is a resizable group of particles inside a layer with its
//! own visibility and pause state. Allocations are addressed by a stable
//! `AllocationId`; the layer is the only owner of the storage.

use super::kind::ParticleKind;

/// Stable identifier of an allocation inside its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(pub u32);

/// Who keeps an allocation alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Only the layer holds it: it lives until it empties out (if
    /// `destroy_when_empty`) or is removed explicitly
    OwnedByLayer,
    /// Retained by an external holder (a pawn, an effect...). Releasing it
    /// removes it from the layer.
    Detached,
}

pub struct ParticleAllocation<K: ParticleKind> {
    id: AllocationId,
    particles: Vec<K::Particle>,
    visible: bool,
    paused: bool,
    destroy_when_empty: bool,
    ownership: Ownership,
    dirty: bool,
}

impl<K: ParticleKind> ParticleAllocation<K> {
    pub(crate) fn new(id: AllocationId, count: usize) -> Self {
        Self {
            id,
            particles: vec![K::Particle::default(); count],
            visible: true,
            paused: false,
            destroy_when_empty: false,
            ownership: Ownership::OwnedByLayer,
            dirty: true,
        }
    }

    pub fn id(&self) -> AllocationId {
        self.id
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub(crate) fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[K::Particle] {
        &self.particles
    }

    /// Mutable access; the layer resyncs its vertices on the next display
    pub fn particles_mut(&mut self) -> &mut [K::Particle] {
        self.dirty = true;
        &mut self.particles
    }

    /// Grow (with default particles) or shrink in place
    pub fn resize(&mut self, count: usize) {
        if count != self.particles.len() {
            self.particles.resize(count, K::Particle::default());
            self.dirty = true;
        }
    }

    /// Append `count` default particles and return them
    pub fn add_particles(&mut self, count: usize) -> &mut [K::Particle] {
        let start = self.particles.len();
        self.particles.resize(start + count, K::Particle::default());
        self.dirty = true;
        &mut self.particles[start..]
    }

    pub fn push(&mut self, particle: K::Particle) {
        self.particles.push(particle);
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        if !self.particles.is_empty() {
            self.particles.clear();
            self.dirty = true;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if visible != self.visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn destroy_when_empty(&self) -> bool {
        self.destroy_when_empty
    }

    pub fn set_destroy_when_empty(&mut self, value: bool) {
        self.destroy_when_empty = value;
    }

    /// Particles this allocation uploads on the next sync
    pub fn rendered_particle_count(&self) -> usize {
        if self.visible { self.particles.len() } else { 0 }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn tick(&mut self, kind: &K, delta_time: f32) {
        if self.paused {
            return;
        }
        if kind.update_particles(delta_time, &mut self.particles) {
            self.dirty = true;
        }
    }
}
