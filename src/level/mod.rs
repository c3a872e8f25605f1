//! Tile map level runtime
//!
//! Layers, objects, triggers and checkpoints of a running level, built on
//! top of the particle engine.

pub mod checkpoint;
pub mod events;
pub mod layer_instance;
pub mod level_instance;
pub mod object;
pub mod tile_particle;
pub mod trigger;

pub use checkpoint::{LayerCheckpoint, LevelCheckpoint, ObjectCheckpoint};
pub use events::LevelEvent;
pub use layer_instance::{TileCollisionInfo, TiledMapLayerInstance};
pub use level_instance::{LevelCamera, Pawn, TiledMapLevelInstance};
pub use object::{ObjectKind, TiledMapObject, TriggerBehavior, TriggerObject};
pub use tile_particle::{TileParticle, TileParticleKind};
pub use trigger::{CameraId, CollisionEvent, Observer, ObserverKind, PlayerId, diff_collisions};
