//! Runtime settings
//!
//! Loaded once per process from a JSON file; anything missing falls back to
//! the defaults below.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How tile vertices are kept in sync with their particles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VertexSync {
    /// Rebuild only after a particle changed
    #[default]
    OnChange,
    /// Rebuild every frame
    EveryFrame,
}

impl VertexSync {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexSync::OnChange => "on_change",
            VertexSync::EveryFrame => "every_frame",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on_change" | "lazy" => Some(VertexSync::OnChange),
            "every_frame" | "always" => Some(VertexSync::EveryFrame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    // === Triggers ===
    /// Box enlargement applied to a trigger already colliding, unless the
    /// trigger sets `outside_box_factor` itself
    pub default_outside_box_factor: f32,

    // === Collisions ===
    /// Run the player-vs-tile query every tick
    pub player_tile_collisions: bool,

    // === Observers ===
    /// Size of cameras added without an explicit box
    pub camera_size: Vec2,
    /// Size of a freshly spawned pawn
    pub pawn_size: Vec2,
    /// Pawn particle color
    pub pawn_color: [f32; 4],

    // === Rendering ===
    pub vertex_sync: VertexSync,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_outside_box_factor: 1.0,

            player_tile_collisions: true,

            camera_size: Vec2::new(320.0, 180.0),
            pawn_size: Vec2::new(16.0, 16.0),
            pawn_color: [1.0, 1.0, 1.0, 1.0],

            vertex_sync: VertexSync::OnChange,
        }
    }
}

impl RuntimeSettings {
    pub fn resync_every_frame(&self) -> bool {
        self.vertex_sync == VertexSync::EveryFrame
    }

    /// Hysteresis factors below 1 would shrink triggers; clamp them
    pub fn effective_outside_box_factor(&self) -> f32 {
        self.default_outside_box_factor.max(1.0)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file, falling back to defaults on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Invalid settings in {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }
}
