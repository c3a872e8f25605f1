//! Particle layers
//!
//! A layer owns every allocation of one particle kind and batches them into a
//! single vertex buffer drawn with one call per repetition. Vertices are
//! regenerated only when something changed since the last sync.

use std::any::Any;

use glam::Vec2;

use super::allocation::{AllocationId, Ownership, ParticleAllocation};
use super::kind::ParticleKind;
use crate::renderer::uniforms::{OFFSET, UniformValue};
use crate::renderer::{
    BufferId, DrawCall, GpuVertex, RenderDevice, RenderParams, UniformProvider,
};

pub struct ParticleLayer<K: ParticleKind> {
    kind: K,
    name: String,
    tag: i32,
    visible: bool,
    dynamic_vertices: bool,
    allocations: Vec<ParticleAllocation<K>>,
    next_allocation_id: u32,
    /// CPU copy of the vertices, reused between syncs
    staging: Vec<K::Vertex>,
    vertex_buffer: Option<BufferId>,
    /// Buffer capacity in vertices
    buffer_capacity: usize,
    /// Vertices written at the last successful sync
    vertex_count: usize,
    require_gpu_update: bool,
}

impl<K: ParticleKind> ParticleLayer<K> {
    pub fn new(kind: K, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            tag: 0,
            visible: true,
            dynamic_vertices: false,
            allocations: Vec::new(),
            next_allocation_id: 1,
            staging: Vec::new(),
            vertex_buffer: None,
            buffer_capacity: 0,
            vertex_count: 0,
            require_gpu_update: true,
        }
    }

    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Rebuild vertices every frame regardless of the dirty flag
    pub fn set_dynamic_vertices(&mut self, dynamic: bool) {
        self.dynamic_vertices = dynamic;
    }

    /// Create an allocation holding exactly `count` default particles
    pub fn spawn_particles(&mut self, count: usize) -> AllocationId {
        let id = AllocationId(self.next_allocation_id);
        self.next_allocation_id += 1;
        self.allocations.push(ParticleAllocation::new(id, count));
        self.require_gpu_update = true;
        log::trace!("{}: spawned allocation {:?} ({} particles)", self.name, id, count);
        id
    }

    pub fn allocations(&self) -> &[ParticleAllocation<K>] {
        &self.allocations
    }

    pub fn allocation(&self, id: AllocationId) -> Option<&ParticleAllocation<K>> {
        self.allocations.iter().find(|a| a.id() == id)
    }

    pub fn allocation_mut(&mut self, id: AllocationId) -> Option<&mut ParticleAllocation<K>> {
        self.allocations.iter_mut().find(|a| a.id() == id)
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn particle_count(&self) -> usize {
        self.allocations.iter().map(|a| a.len()).sum()
    }

    /// Mark an allocation as held by someone other than the layer
    pub fn retain_allocation(&mut self, id: AllocationId) -> bool {
        match self.allocation_mut(id) {
            Some(allocation) => {
                allocation.set_ownership(Ownership::Detached);
                true
            }
            None => false,
        }
    }

    /// The external holder lets go: the allocation drops back to layer-only
    /// ownership and is removed
    pub fn release_allocation(&mut self, id: AllocationId) -> bool {
        match self.allocation(id).map(|a| a.ownership()) {
            Some(Ownership::Detached) => self.remove_allocation(id),
            Some(Ownership::OwnedByLayer) => {
                log::debug!("{}: release of unretained allocation {:?}", self.name, id);
                false
            }
            None => false,
        }
    }

    /// Forced removal, whatever the ownership
    pub fn remove_allocation(&mut self, id: AllocationId) -> bool {
        let Some(index) = self.allocations.iter().position(|a| a.id() == id) else {
            return false;
        };
        let allocation = self.allocations.remove(index);
        self.on_allocation_removed(allocation);
        true
    }

    /// Remove every allocation (level end)
    pub fn clear_allocations(&mut self) {
        for allocation in std::mem::take(&mut self.allocations) {
            self.on_allocation_removed(allocation);
        }
    }

    /// Fired for every allocation leaving the layer, before it is dropped
    fn on_allocation_removed(&mut self, allocation: ParticleAllocation<K>) {
        log::trace!(
            "{}: removed allocation {:?} ({} particles)",
            self.name,
            allocation.id(),
            allocation.len()
        );
        self.require_gpu_update = true;
    }

    pub fn tick(&mut self, delta_time: f32) {
        for allocation in &mut self.allocations {
            allocation.tick(&self.kind, delta_time);
        }

        let expired: Vec<AllocationId> = self
            .allocations
            .iter()
            .filter(|a| {
                a.ownership() == Ownership::OwnedByLayer && a.destroy_when_empty() && a.is_empty()
            })
            .map(|a| a.id())
            .collect();
        for id in expired {
            self.remove_allocation(id);
        }
    }

    /// Worst-case number of particles uploaded by the next sync
    pub fn compute_max_particle_count(&self) -> usize {
        self.allocations
            .iter()
            .map(|a| a.rendered_particle_count())
            .sum()
    }

    pub fn require_gpu_update(&self) -> bool {
        self.require_gpu_update || self.allocations.iter().any(|a| a.is_dirty())
    }

    fn clear_gpu_update_flags(&mut self) {
        self.require_gpu_update = false;
        for allocation in &mut self.allocations {
            allocation.clear_dirty();
        }
    }

    /// Vertices live in the GPU buffer after the last sync
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn vertex_buffer(&self) -> Option<BufferId> {
        self.vertex_buffer
    }

    /// Bring the GPU buffer in line with the particles. Returns the number of
    /// vertices available for drawing (0 on any GPU failure; the sync is
    /// retried on the next call).
    pub fn update_gpu_resources(&mut self, device: &mut dyn RenderDevice) -> usize {
        let dynamic = K::DYNAMIC_VERTICES || self.dynamic_vertices;
        if !dynamic && !self.require_gpu_update() {
            return self.vertex_count;
        }

        let required = self.compute_max_particle_count() * K::VERTICES_PER_PARTICLE;
        if required == 0 {
            self.vertex_count = 0;
            self.clear_gpu_update_flags();
            return 0;
        }

        if self.vertex_buffer.is_none() || self.buffer_capacity < required {
            if let Some(old) = self.vertex_buffer.take() {
                device.destroy_buffer(old);
            }
            self.buffer_capacity = 0;
            let size = (required * std::mem::size_of::<K::Vertex>()) as u64;
            match device.create_vertex_buffer(size) {
                Some(buffer) => {
                    self.vertex_buffer = Some(buffer);
                    self.buffer_capacity = required;
                }
                None => {
                    log::warn!("{}: failed to allocate {} byte vertex buffer", self.name, size);
                    self.vertex_count = 0;
                    return 0;
                }
            }
        }
        let Some(buffer) = self.vertex_buffer else {
            self.vertex_count = 0;
            return 0;
        };

        self.staging.clear();
        self.staging.reserve(required);
        for allocation in self.allocations.iter().filter(|a| a.is_visible()) {
            for particle in allocation.particles() {
                self.kind.particle_to_vertices(particle, &mut self.staging);
            }
        }
        debug_assert_eq!(self.staging.len(), required, "{} wrote a wrong vertex count", K::NAME);

        let bytes: &[u8] = bytemuck::cast_slice(&self.staging);
        match device.map_buffer(buffer, bytes.len() as u64) {
            Some(mapped) => mapped.copy_from_slice(bytes),
            None => {
                log::warn!("{}: failed to map vertex buffer", self.name);
                self.vertex_count = 0;
                return 0;
            }
        }
        device.unmap_buffer(buffer);

        self.vertex_count = self.staging.len();
        self.clear_gpu_update_flags();
        self.vertex_count
    }

    /// Draw every visible allocation in one call per instance offset.
    /// Returns the number of draw calls issued.
    pub fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
    ) -> u32 {
        if !self.visible {
            return 0;
        }
        let vertex_count = self.update_gpu_resources(device);
        if vertex_count == 0 {
            return 0;
        }
        let Some(buffer) = self.vertex_buffer else {
            return 0;
        };

        let base_offset = uniforms.get_vec2(OFFSET).unwrap_or(Vec2::ZERO);
        let single = [Vec2::ZERO];
        let offsets: &[Vec2] = if params.instance_offsets.is_empty() {
            &single
        } else {
            &params.instance_offsets
        };

        for offset in offsets {
            let draw_uniforms = uniforms.with(OFFSET, UniformValue::Vec2(base_offset + *offset));
            device.draw_arrays(&DrawCall {
                program: K::PROGRAM,
                declaration: <K::Vertex as GpuVertex>::DECLARATION,
                buffer,
                first_vertex: 0,
                vertex_count: vertex_count as u32,
                uniforms: &draw_uniforms,
            });
        }
        offsets.len() as u32
    }

    pub fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice) {
        if let Some(buffer) = self.vertex_buffer.take() {
            device.destroy_buffer(buffer);
        }
        self.buffer_capacity = 0;
        self.vertex_count = 0;
        self.require_gpu_update = true;
    }
}

/// Type-erased view of a layer, for managers holding layers of several kinds
pub trait ParticleLayerBase: Any {
    fn name(&self) -> &str;
    fn tag(&self) -> i32;
    fn class_name(&self) -> &'static str;
    fn particle_count(&self) -> usize;
    fn allocation_count(&self) -> usize;
    fn tick(&mut self, delta_time: f32);
    fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
    ) -> u32;
    fn clear_allocations(&mut self);
    fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K: ParticleKind> ParticleLayerBase for ParticleLayer<K> {
    fn name(&self) -> &str {
        ParticleLayer::name(self)
    }

    fn tag(&self) -> i32 {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        K::NAME
    }

    fn particle_count(&self) -> usize {
        ParticleLayer::particle_count(self)
    }

    fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    fn tick(&mut self, delta_time: f32) {
        ParticleLayer::tick(self, delta_time);
    }

    fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
    ) -> u32 {
        ParticleLayer::display(self, device, uniforms, params)
    }

    fn clear_allocations(&mut self) {
        ParticleLayer::clear_allocations(self);
    }

    fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice) {
        ParticleLayer::release_gpu_resources(self, device);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::renderer::{HeadlessDevice, TileVertex};

    /// Points drifting along +x, three vertices each
    pub(crate) struct DriftKind;

    #[derive(Debug, Clone, Default, PartialEq)]
    pub(crate) struct Dot {
        pub x: f32,
        pub life: f32,
    }

    impl ParticleKind for DriftKind {
        type Particle = Dot;
        type Vertex = TileVertex;
        const NAME: &'static str = "drift";
        const VERTICES_PER_PARTICLE: usize = 3;

        fn update_particles(&self, delta_time: f32, particles: &mut Vec<Dot>) -> bool {
            for p in particles.iter_mut() {
                p.x += delta_time;
                p.life -= delta_time;
            }
            particles.retain(|p| p.life > 0.0);
            true
        }

        fn particle_to_vertices(&self, particle: &Dot, output: &mut Vec<TileVertex>) {
            for i in 0..3 {
                output.push(TileVertex::new([particle.x, i as f32], [0.0; 3], [1.0; 4]));
            }
        }
    }

    fn params() -> RenderParams {
        RenderParams::new(Aabb::new(Vec2::ZERO, Vec2::splat(100.0)))
    }

    #[test]
    fn test_spawn_holds_exact_count() {
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        let id = layer.spawn_particles(7);
        assert_eq!(layer.allocation(id).map(|a| a.len()), Some(7));
        assert_eq!(layer.allocation(id).map(|a| a.ownership()), Some(Ownership::OwnedByLayer));
    }

    #[test]
    fn test_vertex_count_matches_visible_allocations() {
        let mut device = HeadlessDevice::new();
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        let a = layer.spawn_particles(4);
        let b = layer.spawn_particles(2);
        let _empty = layer.spawn_particles(0);

        assert_eq!(layer.update_gpu_resources(&mut device), 18);

        if let Some(alloc) = layer.allocation_mut(b) {
            alloc.set_visible(false);
        }
        assert_eq!(layer.update_gpu_resources(&mut device), 12);

        if let Some(alloc) = layer.allocation_mut(a) {
            alloc.resize(1);
        }
        assert_eq!(layer.update_gpu_resources(&mut device), 3);
        assert_eq!(layer.compute_max_particle_count(), 1);
    }

    #[test]
    fn test_sync_is_idempotent_when_clean() {
        let mut device = HeadlessDevice::new();
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        let id = layer.spawn_particles(3);
        if let Some(alloc) = layer.allocation_mut(id) {
            for (i, p) in alloc.particles_mut().iter_mut().enumerate() {
                p.x = i as f32;
            }
        }

        layer.update_gpu_resources(&mut device);
        let buffer = layer.vertex_buffer().expect("buffer");
        let first = device.buffer_contents(buffer).map(|b| b.to_vec());
        let maps = device.map_count();

        assert!(!layer.require_gpu_update());
        layer.update_gpu_resources(&mut device);
        assert_eq!(device.buffer_contents(buffer).map(|b| b.to_vec()), first);
        assert_eq!(device.map_count(), maps);
    }

    #[test]
    fn test_display_batches_allocations() {
        let mut device = HeadlessDevice::new();
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        layer.spawn_particles(2);
        layer.spawn_particles(5);

        let draws = layer.display(&mut device, &UniformProvider::new(), &params());
        assert_eq!(draws, 1);
        assert_eq!(device.draws().len(), 1);
        assert_eq!(device.draws()[0].vertex_count, 21);
        assert_eq!(device.draws()[0].declaration, "tile_vertex");
    }

    #[test]
    fn test_display_once_per_instance_offset() {
        let mut device = HeadlessDevice::new();
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        layer.spawn_particles(1);

        let mut uniforms = UniformProvider::new();
        uniforms.set(OFFSET, UniformValue::Vec2(Vec2::new(1.0, 0.0)));
        let mut params = params();
        params.instance_offsets = vec![Vec2::ZERO, Vec2::new(10.0, 0.0)];

        assert_eq!(layer.display(&mut device, &uniforms, &params), 2);
        let offsets: Vec<Vec2> = device.draws().iter().map(|d| d.offset).collect();
        assert_eq!(offsets, vec![Vec2::new(1.0, 0.0), Vec2::new(11.0, 0.0)]);
    }

    #[test]
    fn test_allocation_failure_is_retried() {
        let mut device = HeadlessDevice::new();
        device.max_buffer_size = Some(0);
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        layer.spawn_particles(2);

        assert_eq!(layer.display(&mut device, &UniformProvider::new(), &params()), 0);
        assert_eq!(layer.vertex_count(), 0);
        assert!(layer.require_gpu_update());

        device.max_buffer_size = None;
        assert_eq!(layer.display(&mut device, &UniformProvider::new(), &params()), 1);
        assert_eq!(layer.vertex_count(), 6);
    }

    #[test]
    fn test_map_failure_draws_nothing() {
        let mut device = HeadlessDevice::new();
        device.fail_maps = true;
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        layer.spawn_particles(2);

        assert_eq!(layer.update_gpu_resources(&mut device), 0);
        device.fail_maps = false;
        assert_eq!(layer.update_gpu_resources(&mut device), 6);
    }

    #[test]
    fn test_release_removes_detached_allocation() {
        let mut device = HeadlessDevice::new();
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        let kept = layer.spawn_particles(1);
        let pawn = layer.spawn_particles(1);
        layer.update_gpu_resources(&mut device);

        // Not retained: release is refused
        assert!(!layer.release_allocation(pawn));

        assert!(layer.retain_allocation(pawn));
        assert_eq!(layer.allocation(pawn).map(|a| a.ownership()), Some(Ownership::Detached));
        assert!(layer.release_allocation(pawn));
        assert!(layer.allocation(pawn).is_none());
        assert!(layer.allocation(kept).is_some());

        // The removal forced a resync
        assert!(layer.require_gpu_update());
        assert_eq!(layer.update_gpu_resources(&mut device), 3);
    }

    #[test]
    fn test_tick_skips_paused_and_drops_empty() {
        let mut layer = ParticleLayer::new(DriftKind, "fx");
        let paused = layer.spawn_particles(1);
        let dying = layer.spawn_particles(1);
        let retained = layer.spawn_particles(1);
        for id in [paused, dying, retained] {
            if let Some(alloc) = layer.allocation_mut(id) {
                alloc.particles_mut()[0].life = 0.5;
                alloc.set_destroy_when_empty(true);
            }
        }
        if let Some(alloc) = layer.allocation_mut(paused) {
            alloc.pause();
        }
        layer.retain_allocation(retained);

        layer.tick(1.0);

        assert_eq!(layer.allocation(paused).map(|a| a.len()), Some(1));
        assert!(layer.allocation(dying).is_none());
        // Detached allocations stay until their holder releases them
        assert_eq!(layer.allocation(retained).map(|a| a.len()), Some(0));
    }
}
