//! Tiled Level - tile map level runtime
//!
//! Core modules:
//! - `particles`: Typed particle allocations batched into GPU vertex buffers
//! - `level`: Layer instances, parallax, triggers and sparse checkpoints
//! - `map`: Static map data (layers, tilesets, objects, properties)
//! - `geometry`: Boxes and repetition scissoring for wrapping layers
//! - `renderer`: Render device seam (WebGPU and headless)
//! - `persistence`: Versioned checkpoint envelopes

pub mod error;
pub mod geometry;
pub mod level;
pub mod map;
pub mod particles;
pub mod persistence;
pub mod renderer;
pub mod settings;

pub use error::LevelError;
pub use level::{LevelCheckpoint, LevelEvent, TiledMapLevelInstance};
pub use map::TiledMap;
pub use settings::RuntimeSettings;

/// Runtime configuration constants
pub mod consts {
    /// Fixed timestep of the headless driver (60 Hz)
    pub const TICK_DT: f32 = 1.0 / 60.0;
    /// Ticks run by the headless driver when none are requested
    pub const DEFAULT_TICKS: u32 = 600;
}
