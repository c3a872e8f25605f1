//! Notifications queued by the level for its driver

use super::trigger::{CollisionEvent, Observer};

/// Fire-and-forget event, drained once per frame with
/// `TiledMapLevelInstance::drain_events`
#[derive(Debug, Clone, PartialEq)]
pub enum LevelEvent {
    /// Raw transition of a generic trigger
    Trigger {
        layer_id: u32,
        object_id: u32,
        observer: Observer,
        event: CollisionEvent,
    },
    /// A camera reached a checkpoint: a good time to save one
    CheckpointReached { layer_id: u32, object_id: u32 },
    /// Show (or hide) a message
    Notification {
        object_id: u32,
        message: String,
        /// Seconds on screen, 0 means until hidden
        lifetime: f32,
        visible: bool,
    },
    PlaySound {
        object_id: u32,
        sound_name: String,
        volume: f32,
        looping: bool,
    },
    StopSound { object_id: u32, sound_name: String },
    ChangeLevel {
        level_index: i64,
        player_start: Option<String>,
    },
    LevelCompleted { object_id: u32 },
}
