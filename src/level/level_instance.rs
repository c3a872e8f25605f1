//! A running level
//!
//! Owns one layer instance per map layer, the observers (pawns and cameras)
//! and a level-wide particle manager. The driver calls `tick` then
//! `display` once per frame and drains the queued events.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::{Vec2, Vec4};

use super::checkpoint::LevelCheckpoint;
use super::events::LevelEvent;
use super::layer_instance::{TileCollisionInfo, TiledMapLayerInstance};
use super::trigger::{CameraId, PlayerId};
use crate::error::LevelError;
use crate::geometry::Aabb;
use crate::map::TiledMap;
use crate::particles::{AllocationId, ParticleManager};
use crate::renderer::uniforms::CAMERA_BOX;
use crate::renderer::{RenderDevice, RenderParams, UniformProvider, UniformValue};
use crate::settings::RuntimeSettings;

/// A player's body in the level
#[derive(Debug, Clone, PartialEq)]
pub struct Pawn {
    pub id: PlayerId,
    /// World space; `None` while the player has no body (dead, loading...)
    pub bounding_box: Option<Aabb>,
    /// Layer id and allocation of the pawn particle
    allocation: Option<(u32, AllocationId)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCamera {
    pub id: CameraId,
    pub camera_box: Aabb,
    /// Box when the camera was added, the parallax origin
    pub initial_box: Aabb,
}

impl LevelCamera {
    pub fn render_params(&self) -> RenderParams {
        RenderParams::new(self.camera_box).with_initial_camera(self.initial_box)
    }
}

pub struct TiledMapLevelInstance {
    map: Rc<TiledMap>,
    settings: RuntimeSettings,
    layers: Vec<TiledMapLayerInstance>,
    reference_layer: Option<u32>,
    particle_manager: ParticleManager,
    players: Vec<Pawn>,
    cameras: Vec<LevelCamera>,
    tile_collisions: HashMap<PlayerId, Vec<TileCollisionInfo>>,
    events: Vec<LevelEvent>,
}

impl TiledMapLevelInstance {
    /// Build every layer of `map`. Any invalid layer or object fails the
    /// whole level.
    pub fn new(map: Rc<TiledMap>, settings: RuntimeSettings) -> Result<Self, LevelError> {
        if map.layers.is_empty() {
            return Err(LevelError::EmptyMap);
        }
        let mut seen = HashSet::new();
        for layer in &map.layers {
            if !seen.insert(layer.id) {
                return Err(LevelError::DuplicateLayer(layer.id));
            }
        }

        let layers = map
            .layers
            .iter()
            .map(|layer| TiledMapLayerInstance::new(&map, layer, &settings))
            .collect::<Result<Vec<_>, _>>()?;

        let reference_layer = match map.properties.get_string("reference_layer", "") {
            "" => layers
                .iter()
                .find(|l| l.player_starts().next().is_some())
                .map(|l| l.id()),
            name => Some(
                map.layer_by_name(name)
                    .map(|l| l.id)
                    .ok_or_else(|| LevelError::UnresolvedLayer(name.to_string()))?,
            ),
        };

        log::info!(
            "Level '{}' loaded: {} layers, reference layer {:?}",
            map.name,
            layers.len(),
            reference_layer
        );

        Ok(Self {
            map,
            settings,
            layers,
            reference_layer,
            particle_manager: ParticleManager::new(),
            players: Vec::new(),
            cameras: Vec::new(),
            tile_collisions: HashMap::new(),
            events: Vec::new(),
        })
    }

    pub fn map(&self) -> &Rc<TiledMap> {
        &self.map
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[TiledMapLayerInstance] {
        &self.layers
    }

    pub fn layer(&self, id: u32) -> Option<&TiledMapLayerInstance> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: u32) -> Option<&mut TiledMapLayerInstance> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&TiledMapLayerInstance> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn reference_layer(&self) -> Option<u32> {
        self.reference_layer
    }

    /// Displacement ratio every other layer's parallax is relative to
    pub fn reference_ratio(&self) -> Vec2 {
        self.reference_layer
            .and_then(|id| self.layer(id))
            .map(|l| l.displacement_ratio())
            .unwrap_or(Vec2::ONE)
    }

    pub fn particle_manager(&self) -> &ParticleManager {
        &self.particle_manager
    }

    pub fn particle_manager_mut(&mut self) -> &mut ParticleManager {
        &mut self.particle_manager
    }

    // === Observers ===

    /// Place a player on a player start (the named one, or the first of the
    /// map). The layer holding it becomes the parallax reference.
    pub fn spawn_player(
        &mut self,
        id: PlayerId,
        player_start: Option<&str>,
    ) -> Result<Aabb, LevelError> {
        let (layer_id, start_center) = self.find_player_start(player_start)?;
        self.remove_player(id);

        let pawn_box = Aabb::new(start_center, self.settings.pawn_size * 0.5);
        let color = Vec4::from_array(self.settings.pawn_color);
        let allocation = self
            .layer_mut(layer_id)
            .map(|layer| (layer_id, layer.spawn_pawn(pawn_box, color)));

        self.reference_layer = Some(layer_id);
        self.players.push(Pawn {
            id,
            bounding_box: Some(pawn_box),
            allocation,
        });
        log::info!("Player {} spawned at {:?} on layer {}", id.0, start_center, layer_id);
        Ok(pawn_box)
    }

    /// Layer id and world-space center of a player start
    fn find_player_start(&self, name: Option<&str>) -> Result<(u32, Vec2), LevelError> {
        let mut starts = self.layers.iter().flat_map(|layer| {
            layer
                .player_starts()
                .map(move |start| (layer, start))
        });
        let found = match name {
            Some(name) => starts.find(|(_, start)| start.name() == name),
            None => starts.next(),
        };
        match found {
            Some((layer, start)) => Ok((layer.id(), start.center() + layer.offset())),
            None => Err(match name {
                Some(name) => LevelError::MissingPlayerStart(name.to_string()),
                None => LevelError::NoPlayerStart,
            }),
        }
    }

    pub fn players(&self) -> &[Pawn] {
        &self.players
    }

    pub fn pawn(&self, id: PlayerId) -> Option<&Pawn> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Update the body of a player. `None` removes it from collisions.
    pub fn set_pawn_box(
        &mut self,
        id: PlayerId,
        bounding_box: Option<Aabb>,
    ) -> Result<(), LevelError> {
        let Some(pawn) = self.players.iter_mut().find(|p| p.id == id) else {
            return Err(LevelError::UnknownPlayer(id.0));
        };
        pawn.bounding_box = bounding_box;
        if let Some((layer_id, allocation)) = pawn.allocation {
            if let Some(layer) = self.layers.iter_mut().find(|l| l.id() == layer_id) {
                layer.move_pawn(allocation, bounding_box);
            }
        }
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return false;
        };
        let pawn = self.players.remove(index);
        if let Some((layer_id, allocation)) = pawn.allocation {
            if let Some(layer) = self.layer_mut(layer_id) {
                layer.release_pawn(allocation);
            }
        }
        self.tile_collisions.remove(&id);
        true
    }

    /// Add (or replace) a camera. Without a box it gets the default size
    /// centered on the origin.
    pub fn add_camera(&mut self, id: CameraId, camera_box: Option<Aabb>) -> LevelCamera {
        let camera_box =
            camera_box.unwrap_or_else(|| Aabb::new(Vec2::ZERO, self.settings.camera_size * 0.5));
        self.cameras.retain(|c| c.id != id);
        let camera = LevelCamera {
            id,
            camera_box,
            initial_box: camera_box,
        };
        self.cameras.push(camera);
        camera
    }

    pub fn set_camera_box(&mut self, id: CameraId, camera_box: Aabb) -> bool {
        match self.cameras.iter_mut().find(|c| c.id == id) {
            Some(camera) => {
                camera.camera_box = camera_box;
                true
            }
            None => false,
        }
    }

    pub fn remove_camera(&mut self, id: CameraId) -> bool {
        let count = self.cameras.len();
        self.cameras.retain(|c| c.id != id);
        self.cameras.len() != count
    }

    pub fn camera(&self, id: CameraId) -> Option<&LevelCamera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    /// World box of an authored camera object
    pub fn camera_object_box(&self, name: &str) -> Option<Aabb> {
        self.layers.iter().find_map(|layer| {
            layer
                .cameras()
                .find(|c| c.name() == name)
                .map(|c| layer.to_world(&c.bounding_box()))
        })
    }

    // === Triggers ===

    pub fn set_trigger_enabled(&mut self, layer_id: u32, object_id: u32, enabled: bool) -> bool {
        self.layer_mut(layer_id)
            .is_some_and(|layer| layer.set_trigger_enabled(object_id, enabled))
    }

    /// Events queued since the last call
    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tiles the player touched during the last tick
    pub fn tile_collisions(&self, id: PlayerId) -> &[TileCollisionInfo] {
        self.tile_collisions
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    // === Frame ===

    pub fn tick(&mut self, delta_time: f32) {
        for layer in &mut self.layers {
            layer.tick(delta_time);
        }

        let players: Vec<(PlayerId, Option<Aabb>)> =
            self.players.iter().map(|p| (p.id, p.bounding_box)).collect();
        let cameras: Vec<(CameraId, Option<Aabb>)> = self
            .cameras
            .iter()
            .map(|c| (c.id, Some(c.camera_box)))
            .collect();
        for layer in &mut self.layers {
            layer.handle_player_trigger_collisions(&players, &mut self.events);
            layer.handle_camera_trigger_collisions(&cameras, &mut self.events);
        }

        if self.settings.player_tile_collisions {
            self.update_tile_collisions();
        }

        self.particle_manager.tick(delta_time);
    }

    fn update_tile_collisions(&mut self) {
        self.tile_collisions.clear();
        for pawn in &self.players {
            let Some(pawn_box) = pawn.bounding_box else {
                continue;
            };
            let hits: Vec<TileCollisionInfo> = self
                .layers
                .iter()
                .filter(|layer| layer.has_tile_collision())
                .flat_map(|layer| {
                    let own = pawn
                        .allocation
                        .filter(|(layer_id, _)| *layer_id == layer.id())
                        .map(|(_, allocation)| allocation);
                    layer.find_tile_collisions(&self.map, &pawn_box, |a| Some(a) != own)
                })
                .collect();
            if !hits.is_empty() {
                self.tile_collisions.insert(pawn.id, hits);
            }
        }
    }

    /// Draw every layer in order, then the level particles. Returns the draw
    /// calls issued.
    pub fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
    ) -> u32 {
        let reference_ratio = self.reference_ratio();
        let mut draws = 0;
        for layer in &mut self.layers {
            draws += layer.display(device, uniforms, params, reference_ratio);
        }
        let level_uniforms =
            uniforms.with(CAMERA_BOX, UniformValue::Vec4(params.camera_box.to_vec4()));
        draws + self.particle_manager.display(device, &level_uniforms, params)
    }

    // === Checkpoints ===

    pub fn save_checkpoint(&self) -> LevelCheckpoint {
        LevelCheckpoint {
            layers: self
                .layers
                .iter()
                .filter_map(|l| l.save_checkpoint().map(|cp| (l.id(), cp)))
                .collect(),
        }
    }

    /// Reset every layer to the map, then apply the checkpoint. Unknown ids
    /// are ignored.
    pub fn load_checkpoint(&mut self, checkpoint: &LevelCheckpoint) {
        for id in checkpoint.layers.keys() {
            if self.layer(*id).is_none() {
                log::debug!("checkpoint for unknown layer {}", id);
            }
        }
        for layer in &mut self.layers {
            let Some(data) = self.map.layer(layer.id()) else {
                continue;
            };
            layer.load_checkpoint(data, checkpoint.layers.get(&layer.id()));
        }
        log::info!(
            "Level '{}': checkpoint loaded ({} layers)",
            self.map.name,
            checkpoint.layers.len()
        );
    }

    /// Free every GPU buffer. Particles stay and are uploaded again by the
    /// next `display`.
    pub fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice) {
        for layer in &mut self.layers {
            layer.release_gpu_resources(device);
        }
        self.particle_manager.release_gpu_resources(device);
    }

    /// Level end: release every pawn, force-remove all particle allocations
    /// and free the GPU buffers
    pub fn end(&mut self, device: &mut dyn RenderDevice) {
        let players: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        for id in players {
            self.remove_player(id);
        }
        self.cameras.clear();
        for layer in &mut self.layers {
            layer.clear_particles();
        }
        self.particle_manager.clear_allocations();
        self.release_gpu_resources(device);
        log::info!("Level '{}' ended", self.map.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::trigger::{CollisionEvent, Observer};
    use crate::map::{
        GeometricObject, LayerContent, LayerData, ObjectShape, Properties, PropertyValue, Tileset,
    };
    use crate::particles::ParticleLayer;
    use crate::particles::layer::tests::DriftKind;
    use crate::renderer::HeadlessDevice;
    use glam::UVec2;

    fn layer(id: u32, name: &str, content: LayerContent) -> LayerData {
        LayerData {
            id,
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            properties: Properties::new(),
            content,
        }
    }

    fn point(id: u32, object_type: &str, name: &str, position: Vec2) -> GeometricObject {
        let mut object =
            GeometricObject::new(id, object_type, position, Vec2::ZERO).with_name(name);
        object.shape = ObjectShape::Point;
        object
    }

    /// Background, a 4x1 tile ground and an object layer with two starts,
    /// a one-shot finish and a checkpoint
    fn test_map() -> TiledMap {
        let mut background = layer(
            1,
            "background",
            LayerContent::Image {
                image: "sky.png".into(),
                size: Vec2::new(40.0, 10.0),
            },
        );
        background
            .properties
            .insert("displacement_ratio", PropertyValue::Float(0.5));

        let objects = vec![
            point(1, "player_start", "start", Vec2::new(5.0, 15.0)),
            point(2, "player_start", "end", Vec2::new(35.0, 15.0)),
            GeometricObject::new(3, "finish", Vec2::new(30.0, 10.0), Vec2::splat(10.0))
                .with_properties(
                    Properties::new().with("trigger_once", PropertyValue::Bool(true)),
                ),
            GeometricObject::new(4, "checkpoint", Vec2::new(100.0, 0.0), Vec2::splat(10.0)),
            GeometricObject::new(5, "camera", Vec2::new(0.0, 0.0), Vec2::new(40.0, 20.0))
                .with_name("overview"),
        ];

        TiledMap {
            name: "test".into(),
            tile_size: UVec2::splat(10),
            tilesets: vec![Tileset {
                name: "terrain".into(),
                first_gid: 1,
                tile_count: 4,
                columns: 2,
                tile_size: UVec2::splat(10),
                image_size: UVec2::splat(20),
                tiles: Vec::new(),
            }],
            layers: vec![
                background,
                layer(
                    2,
                    "ground",
                    LayerContent::Tiles {
                        width: 4,
                        height: 1,
                        data: vec![1, 1, 0, 2],
                    },
                ),
                layer(3, "objects", LayerContent::Objects { objects }),
            ],
            properties: Properties::new(),
        }
    }

    fn level(map: TiledMap) -> TiledMapLevelInstance {
        TiledMapLevelInstance::new(Rc::new(map), RuntimeSettings::default()).expect("valid level")
    }

    #[test]
    fn test_reference_layer_defaults_to_player_start_layer() {
        let level = level(test_map());
        assert_eq!(level.layers().len(), 3);
        assert_eq!(level.reference_layer(), Some(3));
        assert_eq!(level.reference_ratio(), Vec2::ONE);
    }

    #[test]
    fn test_unresolved_reference_layer_fails() {
        let mut map = test_map();
        map.properties
            .insert("reference_layer", PropertyValue::String("nope".into()));
        let result = TiledMapLevelInstance::new(Rc::new(map), RuntimeSettings::default());
        assert!(matches!(result, Err(LevelError::UnresolvedLayer(name)) if name == "nope"));
    }

    #[test]
    fn test_missing_property_fails_whole_level() {
        let mut map = test_map();
        if let LayerContent::Objects { objects } = &mut map.layers[2].content {
            objects.push(GeometricObject::new(9, "sound", Vec2::ZERO, Vec2::ONE));
        }
        let result = TiledMapLevelInstance::new(Rc::new(map), RuntimeSettings::default());
        assert!(matches!(
            result,
            Err(LevelError::MissingProperty {
                object: 9,
                property: "sound_name",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_maps() {
        let empty = TiledMap::default();
        assert!(matches!(
            TiledMapLevelInstance::new(Rc::new(empty), RuntimeSettings::default()),
            Err(LevelError::EmptyMap)
        ));

        let mut duplicate = test_map();
        duplicate.layers[1].id = 1;
        assert!(matches!(
            TiledMapLevelInstance::new(Rc::new(duplicate), RuntimeSettings::default()),
            Err(LevelError::DuplicateLayer(1))
        ));
    }

    #[test]
    fn test_spawn_player_on_named_start() {
        let mut level = level(test_map());
        let pawn_box = level.spawn_player(PlayerId(1), Some("end")).expect("start exists");
        assert_eq!(pawn_box.position, Vec2::new(35.0, 15.0));
        assert_eq!(level.layer(3).map(|l| l.particle_layer().allocation_count()), Some(1));

        assert_eq!(
            level.spawn_player(PlayerId(2), Some("missing")),
            Err(LevelError::MissingPlayerStart("missing".into()))
        );

        assert!(level.remove_player(PlayerId(1)));
        assert_eq!(level.layer(3).map(|l| l.particle_layer().allocation_count()), Some(0));
        assert!(!level.remove_player(PlayerId(1)));
    }

    #[test]
    fn test_finish_fires_once_until_checkpoint_reload() {
        let mut level = level(test_map());
        level.spawn_player(PlayerId(1), None).expect("start exists");
        let inside = Aabb::new(Vec2::new(35.0, 15.0), Vec2::splat(2.0));
        let outside = Aabb::new(Vec2::new(5.0, 15.0), Vec2::splat(2.0));
        let before = level.save_checkpoint();
        assert!(before.is_empty());

        let completed = |events: &[LevelEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, LevelEvent::LevelCompleted { object_id: 3 }))
                .count()
        };

        level.set_pawn_box(PlayerId(1), Some(inside)).expect("player exists");
        level.tick(0.016);
        assert_eq!(completed(&level.drain_events()), 1);

        level.set_pawn_box(PlayerId(1), Some(outside)).expect("player exists");
        level.tick(0.016);
        level.set_pawn_box(PlayerId(1), Some(inside)).expect("player exists");
        level.tick(0.016);
        assert_eq!(completed(&level.drain_events()), 0);

        let after = level.save_checkpoint();
        assert_eq!(after.layers.len(), 1);
        assert!(after.layers[&3].objects[&3].enter_event_triggered);

        // Reload the checkpoint taken before the finish: it fires again
        level.load_checkpoint(&before);
        level.tick(0.016);
        assert_eq!(completed(&level.drain_events()), 1);
    }

    #[test]
    fn test_camera_reaches_checkpoint() {
        let mut level = level(test_map());
        let camera = CameraId(7);
        level.add_camera(camera, Some(Aabb::new(Vec2::ZERO, Vec2::splat(5.0))));
        level.tick(0.016);
        assert!(level.drain_events().is_empty());

        level.set_camera_box(camera, Aabb::new(Vec2::new(100.0, 0.0), Vec2::splat(5.0)));
        level.tick(0.016);
        assert_eq!(
            level.drain_events(),
            vec![LevelEvent::CheckpointReached {
                layer_id: 3,
                object_id: 4
            }]
        );
        assert!(level.remove_camera(camera));
        assert!(level.camera(camera).is_none());
    }

    #[test]
    fn test_disabled_trigger_never_collides() {
        let mut level = level(test_map());
        level.spawn_player(PlayerId(1), Some("end")).expect("start exists");
        assert!(level.set_trigger_enabled(3, 3, false));
        assert!(!level.set_trigger_enabled(3, 1, false));

        level.tick(0.016);
        assert!(level.drain_events().is_empty());
        assert!(!level.save_checkpoint().layers[&3].objects[&3].enabled);
    }

    #[test]
    fn test_tile_collisions_exclude_own_pawn() {
        let mut level = level(test_map());
        level.spawn_player(PlayerId(1), None).expect("start exists");
        // Standing on the first two ground tiles
        let standing = Aabb::new(Vec2::new(10.0, 9.0), Vec2::splat(2.0));
        level.set_pawn_box(PlayerId(1), Some(standing)).expect("player exists");
        level.tick(0.016);

        let hits = level.tile_collisions(PlayerId(1));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.layer_id == 2 && h.tile.gid == 1));

        level.set_pawn_box(PlayerId(1), None).expect("player exists");
        level.tick(0.016);
        assert!(level.tile_collisions(PlayerId(1)).is_empty());
    }

    #[test]
    fn test_display_layers_then_particles() {
        let mut level = level(test_map());
        let mut effects = ParticleLayer::new(DriftKind, "effects");
        effects.spawn_particles(1);
        level.particle_manager_mut().add_layer(effects);

        let mut device = HeadlessDevice::new();
        let camera = Aabb::from_corners(Vec2::ZERO, Vec2::new(40.0, 20.0));
        let draws = level.display(&mut device, &UniformProvider::new(), &RenderParams::new(camera));

        // Image quad, ground tiles, then the effect layer; the object layer
        // has no tiles to draw
        assert_eq!(draws, 3);
        let counts: Vec<u32> = device.draws().iter().map(|d| d.vertex_count).collect();
        assert_eq!(counts, vec![6, 18, 3]);

        level.release_gpu_resources(&mut device);
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn test_parallax_background_moves_slower() {
        let mut level = level(test_map());
        let mut device = HeadlessDevice::new();
        let initial = Aabb::from_corners(Vec2::ZERO, Vec2::new(40.0, 20.0));
        let moved = initial.translated(Vec2::new(10.0, 0.0));
        let params = RenderParams::new(moved).with_initial_camera(initial);

        level.display(&mut device, &UniformProvider::new(), &params);
        let background = device.draws()[0].camera_box.expect("camera uniform");
        let ground = device.draws()[1].camera_box.expect("camera uniform");
        assert_eq!(background.x, initial.position.x + 5.0);
        assert_eq!(ground.x, moved.position.x);
    }

    #[test]
    fn test_camera_object_box() {
        let level = level(test_map());
        assert_eq!(
            level.camera_object_box("overview"),
            Some(Aabb::from_min_size(Vec2::ZERO, Vec2::new(40.0, 20.0)))
        );
        assert_eq!(level.camera_object_box("closeup"), None);
    }

    #[test]
    fn test_generic_trigger_reports_observer() {
        let mut map = test_map();
        if let LayerContent::Objects { objects } = &mut map.layers[2].content {
            let position = Vec2::new(0.0, 10.0);
            objects.push(GeometricObject::new(6, "trigger", position, Vec2::splat(10.0)));
        }
        let mut level = level(map);
        level.spawn_player(PlayerId(4), Some("start")).expect("start exists");
        level.tick(0.016);

        assert_eq!(
            level.drain_events(),
            vec![LevelEvent::Trigger {
                layer_id: 3,
                object_id: 6,
                observer: Observer::Player(PlayerId(4)),
                event: CollisionEvent::Started,
            }]
        );
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let mut level = level(test_map());
        let somewhere = Some(Aabb::new(Vec2::ZERO, Vec2::ONE));
        assert_eq!(
            level.set_pawn_box(PlayerId(9), somewhere),
            Err(LevelError::UnknownPlayer(9))
        );
    }

    #[test]
    fn test_reference_layer_by_name() {
        let mut map = test_map();
        map.properties
            .insert("reference_layer", PropertyValue::String("background".into()));
        let level = level(map);
        assert_eq!(level.reference_layer(), Some(1));
        assert_eq!(level.reference_ratio(), Vec2::splat(0.5));
    }

    #[test]
    fn test_end_removes_every_allocation() {
        let mut level = level(test_map());
        level.spawn_player(PlayerId(1), None).expect("start exists");
        level.spawn_player(PlayerId(2), Some("end")).expect("start exists");
        let mut effects = ParticleLayer::new(DriftKind, "effects");
        effects.spawn_particles(2);
        level.particle_manager_mut().add_layer(effects);

        let mut device = HeadlessDevice::new();
        let camera = Aabb::from_corners(Vec2::ZERO, Vec2::new(40.0, 20.0));
        level.display(&mut device, &UniformProvider::new(), &RenderParams::new(camera));
        assert!(device.live_buffer_count() > 0);

        level.end(&mut device);
        assert!(level.players().is_empty());
        assert!(level
            .layers()
            .iter()
            .all(|l| l.particle_layer().allocation_count() == 0));
        assert_eq!(
            level
                .particle_manager()
                .find_layer("effects")
                .map(|l| l.allocation_count()),
            Some(0)
        );
        assert_eq!(device.live_buffer_count(), 0);
    }
}
