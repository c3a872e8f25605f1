//! Runtime state of one map layer
//!
//! A layer instance turns its static layer into tile particles, tracks its
//! parallax offset, answers collision queries and runs trigger passes for
//! the objects it holds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use glam::{Vec2, Vec4};

use super::checkpoint::LayerCheckpoint;
use super::events::LevelEvent;
use super::object::TiledMapObject;
use super::tile_particle::{TileParticle, TileParticleKind};
use super::trigger::{CameraId, Observer, ObserverKind, PlayerId, diff_collisions};
use crate::error::LevelError;
use crate::geometry::{Aabb, BoxScissoring};
use crate::map::{LayerContent, LayerData, ObjectShape, TileData, TileInfo, TiledMap};
use crate::particles::{AllocationId, Ownership, ParticleLayer};
use crate::renderer::uniforms::{CAMERA_BOX, OFFSET};
use crate::renderer::{RenderDevice, RenderParams, UniformProvider, UniformValue};
use crate::settings::RuntimeSettings;

/// One tile hit by a collision query
#[derive(Debug, Clone, PartialEq)]
pub struct TileCollisionInfo {
    pub layer_id: u32,
    pub allocation: AllocationId,
    pub particle_index: usize,
    /// World space
    pub bounding_box: Aabb,
    pub tile: TileInfo,
    /// Authored metadata, when the tileset has any for this tile
    pub data: Option<TileData>,
}

impl TileCollisionInfo {
    /// Authored tile type, empty when the tile has none
    pub fn tile_type(&self) -> &str {
        self.data.as_ref().map_or("", |d| d.tile_type.as_str())
    }
}

/// Parallax ratio of a layer relative to the reference layer. An axis with
/// a zero reference ratio is not scaled.
pub fn final_ratio(ratio: Vec2, reference_ratio: Vec2) -> Vec2 {
    Vec2::new(
        if reference_ratio.x == 0.0 {
            1.0
        } else {
            ratio.x / reference_ratio.x
        },
        if reference_ratio.y == 0.0 {
            1.0
        } else {
            ratio.y / reference_ratio.y
        },
    )
}

/// Camera box seen by a layer moving at `ratio` times the camera speed
pub fn parallax_camera(current: Aabb, initial: Aabb, ratio: Vec2) -> Aabb {
    let axis = |current: f32, initial: f32, ratio: f32| {
        if ratio == 1.0 {
            current
        } else {
            initial + (current - initial) * ratio
        }
    };
    Aabb::new(
        Vec2::new(
            axis(current.position.x, initial.position.x, ratio.x),
            axis(current.position.y, initial.position.y, ratio.y),
        ),
        current.half_size,
    )
}

pub struct TiledMapLayerInstance {
    id: u32,
    name: String,
    visible: bool,
    offset: Vec2,
    initial_offset: Vec2,
    scroll_speed: Vec2,
    displacement_ratio: Vec2,
    wrap_x: bool,
    wrap_y: bool,
    tile_collision: bool,
    /// Layer-local extent of the authored content
    bounding_box: Aabb,
    particle_layer: ParticleLayer<TileParticleKind>,
    objects: Vec<TiledMapObject>,
    default_outside_box_factor: f32,
    player_records: HashMap<PlayerId, BTreeSet<u32>>,
    camera_records: HashMap<CameraId, BTreeSet<u32>>,
}

impl TiledMapLayerInstance {
    pub fn new(
        map: &TiledMap,
        layer: &LayerData,
        settings: &RuntimeSettings,
    ) -> Result<Self, LevelError> {
        let props = &layer.properties;
        let ratio = props.get_float("displacement_ratio", 1.0);
        let default_factor = settings.effective_outside_box_factor();
        let tile_size = map.tile_size.as_vec2();
        let tint = props.get_color("tint_color", Vec4::ONE);
        let color = tint * Vec4::new(1.0, 1.0, 1.0, layer.opacity);

        let mut particle_layer = ParticleLayer::new(TileParticleKind, layer.name.clone())
            .with_tag(layer.id as i32);
        particle_layer.set_dynamic_vertices(settings.resync_every_frame());

        let mut objects = Vec::new();
        match &layer.content {
            LayerContent::Tiles { .. } => {
                let tiles: Vec<TileParticle> = layer
                    .tile_cells(tile_size)
                    .into_iter()
                    .filter_map(|(cell, gid)| {
                        let particle = TileParticle::from_gid(map, gid, cell, color);
                        if particle.is_none() {
                            log::debug!("layer '{}': skipping unknown gid {}", layer.name, gid);
                        }
                        particle
                    })
                    .collect();
                spawn_static(&mut particle_layer, tiles);
            }
            LayerContent::Objects { objects: sources } => {
                let mut tiles = Vec::new();
                for source in sources {
                    objects.push(TiledMapObject::create(layer.id, source, default_factor)?);
                    if let ObjectShape::Tile { gid } = source.shape {
                        match TileParticle::from_gid(map, gid, source.bounding_box(), color) {
                            Some(particle) => tiles.push(particle),
                            None => log::debug!(
                                "layer '{}': object {} has no tile {}",
                                layer.name,
                                source.id,
                                gid
                            ),
                        }
                    }
                }
                spawn_static(&mut particle_layer, tiles);
            }
            LayerContent::Image { size, .. } => {
                let quad = TileParticle::quad(Aabb::from_min_size(Vec2::ZERO, *size), color);
                spawn_static(&mut particle_layer, vec![quad]);
            }
        }
        particle_layer.set_visible(layer.visible);

        log::debug!(
            "layer {} '{}': {} particles, {} objects",
            layer.id,
            layer.name,
            particle_layer.particle_count(),
            objects.len()
        );

        Ok(Self {
            id: layer.id,
            name: layer.name.clone(),
            visible: layer.visible,
            offset: layer.offset,
            initial_offset: layer.offset,
            scroll_speed: Vec2::new(
                props.get_float("scroll_speed_x", 0.0),
                props.get_float("scroll_speed_y", 0.0),
            ),
            displacement_ratio: Vec2::new(
                props.get_float("displacement_ratio_x", ratio),
                props.get_float("displacement_ratio_y", ratio),
            ),
            wrap_x: props.get_bool("wrap_x", false),
            wrap_y: props.get_bool("wrap_y", false),
            tile_collision: props.get_bool("collision", layer.is_tile_layer()),
            bounding_box: layer.bounding_box(tile_size),
            particle_layer,
            objects,
            default_outside_box_factor: default_factor,
            player_records: HashMap::new(),
            camera_records: HashMap::new(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn displacement_ratio(&self) -> Vec2 {
        self.displacement_ratio
    }

    pub fn wraps(&self) -> (bool, bool) {
        (self.wrap_x, self.wrap_y)
    }

    pub fn has_tile_collision(&self) -> bool {
        self.tile_collision
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    pub fn objects(&self) -> &[TiledMapObject] {
        &self.objects
    }

    pub fn object(&self, id: u32) -> Option<&TiledMapObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn object_mut(&mut self, id: u32) -> Option<&mut TiledMapObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    pub fn player_starts(&self) -> impl Iterator<Item = &TiledMapObject> {
        self.objects.iter().filter(|o| o.is_player_start())
    }

    pub fn cameras(&self) -> impl Iterator<Item = &TiledMapObject> {
        self.objects.iter().filter(|o| o.is_camera())
    }

    pub fn triggers(&self) -> impl Iterator<Item = &TiledMapObject> {
        self.objects.iter().filter(|o| o.trigger().is_some())
    }

    pub fn particle_layer(&self) -> &ParticleLayer<TileParticleKind> {
        &self.particle_layer
    }

    pub fn particle_layer_mut(&mut self) -> &mut ParticleLayer<TileParticleKind> {
        &mut self.particle_layer
    }

    /// World-space box of a layer-local box
    pub fn to_world(&self, local: &Aabb) -> Aabb {
        local.translated(self.offset)
    }

    /// Layer-local box of a world-space box
    pub fn to_local(&self, world: &Aabb) -> Aabb {
        world.translated(-self.offset)
    }

    /// Spawn a one-particle allocation held by a pawn
    pub fn spawn_pawn(&mut self, world_box: Aabb, color: Vec4) -> AllocationId {
        let local = self.to_local(&world_box);
        let id = self.particle_layer.spawn_particles(1);
        self.particle_layer.retain_allocation(id);
        if let Some(allocation) = self.particle_layer.allocation_mut(id) {
            allocation.particles_mut()[0] = TileParticle::quad(local, color);
        }
        id
    }

    /// Move a pawn particle. `None` hides it.
    pub fn move_pawn(&mut self, allocation: AllocationId, world_box: Option<Aabb>) {
        let local = world_box.map(|b| self.to_local(&b));
        let Some(allocation) = self.particle_layer.allocation_mut(allocation) else {
            return;
        };
        match local {
            Some(local) => {
                allocation.set_visible(true);
                if let Some(particle) = allocation.particles_mut().first_mut() {
                    particle.bounding_box = local;
                }
            }
            None => allocation.set_visible(false),
        }
    }

    pub fn release_pawn(&mut self, allocation: AllocationId) {
        self.particle_layer.release_allocation(allocation);
    }

    /// Layer-local extent to scissor against. Non-wrapping axes cover the
    /// pawns standing on the layer too; wrapping axes keep the authored
    /// extent as their repetition period.
    fn content_box(&self) -> Aabb {
        let extent = self
            .particle_layer
            .allocations()
            .iter()
            .filter(|a| a.ownership() == Ownership::Detached && a.is_visible())
            .flat_map(|a| a.particles())
            .fold(self.bounding_box, |acc, p| acc.union(&p.bounding_box));
        if self.bounding_box.is_empty() {
            return extent;
        }
        let (period_min, period_max) = (self.bounding_box.min(), self.bounding_box.max());
        let (min, max) = (extent.min(), extent.max());
        Aabb::from_corners(
            Vec2::new(
                if self.wrap_x { period_min.x } else { min.x },
                if self.wrap_y { period_min.y } else { min.y },
            ),
            Vec2::new(
                if self.wrap_x { period_max.x } else { max.x },
                if self.wrap_y { period_max.y } else { max.y },
            ),
        )
    }

    /// Camera box this layer is drawn with
    pub fn layer_camera(&self, params: &RenderParams, reference_ratio: Vec2) -> Aabb {
        parallax_camera(
            params.camera_box,
            params.initial_camera_box,
            final_ratio(self.displacement_ratio, reference_ratio),
        )
    }

    /// Draw the layer, repeated over the camera on wrapping axes. Returns the
    /// draw calls issued.
    pub fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
        reference_ratio: Vec2,
    ) -> u32 {
        if !self.visible {
            return 0;
        }
        let camera = self.layer_camera(params, reference_ratio);
        let local_camera = self.to_local(&camera);
        let scissoring =
            BoxScissoring::new(self.content_box(), local_camera, self.wrap_x, self.wrap_y);
        if scissoring.is_empty() {
            return 0;
        }

        let mut layer_uniforms = uniforms.with(CAMERA_BOX, UniformValue::Vec4(camera.to_vec4()));
        layer_uniforms.set(OFFSET, UniformValue::Vec2(self.offset));
        let layer_params = RenderParams {
            camera_box: camera,
            initial_camera_box: params.initial_camera_box,
            instance_offsets: scissoring
                .instances()
                .map(|index| scissoring.instance_offset(index))
                .collect(),
        };
        self.particle_layer
            .display(device, &layer_uniforms, &layer_params)
    }

    /// Every tile particle touching `world_box` whose allocation passes
    /// `filter`
    pub fn find_tile_collisions(
        &self,
        map: &TiledMap,
        world_box: &Aabb,
        filter: impl Fn(AllocationId) -> bool,
    ) -> Vec<TileCollisionInfo> {
        let local = self.to_local(world_box);
        let mut cache: HashMap<u32, Option<(TileInfo, Option<TileData>)>> = HashMap::new();
        let mut result = Vec::new();

        for allocation in self.particle_layer.allocations() {
            if !filter(allocation.id()) {
                continue;
            }
            for (index, particle) in allocation.particles().iter().enumerate() {
                if !particle.bounding_box.intersects(&local) {
                    continue;
                }
                let resolved = cache.entry(particle.gid).or_insert_with(|| {
                    map.find_tile_info(particle.gid)
                        .map(|info| (info, map.tile_data(&info).cloned()))
                });
                let Some((tile, data)) = resolved else {
                    continue;
                };
                result.push(TileCollisionInfo {
                    layer_id: self.id,
                    allocation: allocation.id(),
                    particle_index: index,
                    bounding_box: self.to_world(&particle.bounding_box),
                    tile: *tile,
                    data: data.clone(),
                });
            }
        }
        result
    }

    pub fn handle_player_trigger_collisions(
        &mut self,
        players: &[(PlayerId, Option<Aabb>)],
        events: &mut Vec<LevelEvent>,
    ) {
        run_trigger_pass(
            &mut self.objects,
            self.offset,
            &mut self.player_records,
            players,
            ObserverKind::Player,
            Observer::Player,
            events,
        );
    }

    pub fn handle_camera_trigger_collisions(
        &mut self,
        cameras: &[(CameraId, Option<Aabb>)],
        events: &mut Vec<LevelEvent>,
    ) {
        run_trigger_pass(
            &mut self.objects,
            self.offset,
            &mut self.camera_records,
            cameras,
            ObserverKind::Camera,
            Observer::Camera,
            events,
        );
    }

    /// Triggers a player collided with on the last pass
    pub fn player_collisions(&self, player: PlayerId) -> Option<&BTreeSet<u32>> {
        self.player_records.get(&player)
    }

    pub fn camera_collisions(&self, camera: CameraId) -> Option<&BTreeSet<u32>> {
        self.camera_records.get(&camera)
    }

    /// Enable or disable one trigger, marking it for the next checkpoint
    pub fn set_trigger_enabled(&mut self, object_id: u32, enabled: bool) -> bool {
        self.object_mut(object_id)
            .is_some_and(|object| object.set_enabled(enabled))
    }

    pub fn is_modified(&self) -> bool {
        self.offset != self.initial_offset || self.objects.iter().any(|o| o.is_modified())
    }

    /// Sparse state of the layer, `None` when nothing changed
    pub fn save_checkpoint(&self) -> Option<LayerCheckpoint> {
        let objects: BTreeMap<u32, _> = self
            .objects
            .iter()
            .filter_map(|o| o.save_checkpoint().map(|cp| (o.id(), cp)))
            .collect();
        let checkpoint = LayerCheckpoint {
            offset: (self.offset != self.initial_offset).then_some(self.offset),
            objects,
        };
        (!checkpoint.is_empty()).then_some(checkpoint)
    }

    /// Reset every object to its authored state, then apply `checkpoint`
    pub fn load_checkpoint(&mut self, layer: &LayerData, checkpoint: Option<&LayerCheckpoint>) {
        for object in &mut self.objects {
            let Some(source) = layer.object(object.id()) else {
                continue;
            };
            if let Err(err) = object.initialize(source, self.default_outside_box_factor) {
                log::warn!("layer '{}': cannot reset object: {}", self.name, err);
            }
        }
        self.offset = self.initial_offset;

        if let Some(checkpoint) = checkpoint {
            if let Some(offset) = checkpoint.offset {
                self.offset = offset;
            }
            for (id, object_checkpoint) in &checkpoint.objects {
                match self.object_mut(*id) {
                    Some(object) => object.load_checkpoint(object_checkpoint),
                    None => {
                        log::debug!("layer '{}': checkpoint for unknown object {}", self.name, id)
                    }
                }
            }
        }

        self.player_records.clear();
        self.camera_records.clear();
    }

    pub fn tick(&mut self, delta_time: f32) {
        self.offset += self.scroll_speed * delta_time;
        self.particle_layer.tick(delta_time);
    }

    /// Force-remove every particle allocation, pawns included
    pub fn clear_particles(&mut self) {
        self.particle_layer.clear_allocations();
    }

    pub fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice) {
        self.particle_layer.release_gpu_resources(device);
    }
}

/// Allocation holding the authored, never-changing particles of a layer
fn spawn_static(layer: &mut ParticleLayer<TileParticleKind>, particles: Vec<TileParticle>) {
    if particles.is_empty() {
        return;
    }
    let id = layer.spawn_particles(0);
    if let Some(allocation) = layer.allocation_mut(id) {
        for particle in particles {
            allocation.push(particle);
        }
    }
}

/// One pass of one observer type over the triggers of a layer
fn run_trigger_pass<Id: Copy + Eq + Hash>(
    objects: &mut [TiledMapObject],
    offset: Vec2,
    records: &mut HashMap<Id, BTreeSet<u32>>,
    observers: &[(Id, Option<Aabb>)],
    kind: ObserverKind,
    to_observer: fn(Id) -> Observer,
    events: &mut Vec<LevelEvent>,
) {
    records.retain(|id, _| observers.iter().any(|(observer, _)| observer == id));

    for (id, observer_box) in observers {
        let previous = records.remove(id).unwrap_or_default();
        let mut current = BTreeSet::new();

        if let Some(observer_box) = observer_box {
            for object in objects.iter() {
                let Some(trigger) = object.trigger() else {
                    continue;
                };
                if trigger.behavior.observer() != kind {
                    continue;
                }
                let world = object.bounding_box().translated(offset);
                if trigger.collides(&world, observer_box, previous.contains(&object.id())) {
                    current.insert(object.id());
                }
            }
        }

        for (object_id, event) in diff_collisions(&previous, &current) {
            let Some(object) = objects.iter_mut().find(|o| o.id() == object_id) else {
                continue;
            };
            if let Some(level_event) = object.handle_collision(event, to_observer(*id)) {
                events.push(level_event);
            }
        }
        records.insert(*id, current);
    }
}
