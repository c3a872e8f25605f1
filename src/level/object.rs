//! Runtime map objects
//!
//! One `TiledMapObject` is created per authored object when a level loads.
//! The authored `type` picks the object kind; triggers carry the only state
//! that changes during play, and only changed triggers end up in a
//! checkpoint.

use glam::Vec2;

use super::checkpoint::ObjectCheckpoint;
use super::events::LevelEvent;
use super::trigger::{CollisionEvent, Observer, ObserverKind};
use crate::error::LevelError;
use crate::geometry::Aabb;
use crate::map::{GeometricObject, PropertyValue};

pub const TYPE_PLAYER_START: &str = "player_start";
pub const TYPE_CAMERA: &str = "camera";
pub const TYPE_CHECKPOINT: &str = "checkpoint";
pub const TYPE_NOTIFICATION: &str = "notification";
pub const TYPE_SOUND: &str = "sound";
pub const TYPE_CHANGE_LEVEL: &str = "change_level";
pub const TYPE_FINISH: &str = "finish";
pub const TYPE_TRIGGER: &str = "trigger";

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerBehavior {
    Checkpoint,
    Notification {
        message: String,
        lifetime: f32,
        stop_when_collision_over: bool,
    },
    Sound {
        sound_name: String,
        volume: f32,
        looping: bool,
        stop_when_collision_over: bool,
    },
    ChangeLevel {
        level_index: i64,
        player_start: Option<String>,
    },
    Finish,
    Generic,
}

impl TriggerBehavior {
    /// Observer type this behavior reacts to
    pub fn observer(&self) -> ObserverKind {
        match self {
            TriggerBehavior::Checkpoint | TriggerBehavior::Sound { .. } => ObserverKind::Camera,
            _ => ObserverKind::Player,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerObject {
    pub enabled: bool,
    pub trigger_once: bool,
    /// STARTED already fired; only meaningful with `trigger_once`
    pub enter_event_triggered: bool,
    /// Enlargement of the box while already colliding
    pub outside_box_factor: f32,
    pub behavior: TriggerBehavior,
}

impl TriggerObject {
    /// Collision test against an observer box. `world_box` is the authored
    /// box moved into world space.
    pub fn collides(&self, world_box: &Aabb, observer_box: &Aabb, already_colliding: bool) -> bool {
        if !self.enabled {
            return false;
        }
        if already_colliding && self.outside_box_factor > 1.0 {
            world_box
                .scaled(self.outside_box_factor)
                .intersects(observer_box)
        } else {
            world_box.intersects(observer_box)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Trigger(TriggerObject),
    PlayerStart,
    Camera,
    /// Any other object, kept for its geometry and properties
    Geometric,
}

impl ObjectKind {
    /// Build the kind matching an authored object type (case-insensitive)
    fn from_source(source: &GeometricObject, default_factor: f32) -> Result<Self, LevelError> {
        let props = &source.properties;
        let behavior = match source.object_type.to_lowercase().as_str() {
            TYPE_PLAYER_START => return Ok(ObjectKind::PlayerStart),
            TYPE_CAMERA => return Ok(ObjectKind::Camera),
            TYPE_CHECKPOINT => TriggerBehavior::Checkpoint,
            TYPE_NOTIFICATION => TriggerBehavior::Notification {
                message: props.get_string("message", &source.name).to_string(),
                lifetime: props.get_float("lifetime", 0.0),
                stop_when_collision_over: props.get_bool("stop_when_collision_over", false),
            },
            TYPE_SOUND => TriggerBehavior::Sound {
                sound_name: required_string(source, "sound_name")?,
                volume: props.get_float("volume", 1.0),
                looping: props.get_bool("loop", false),
                stop_when_collision_over: props.get_bool("stop_when_collision_over", false),
            },
            TYPE_CHANGE_LEVEL => {
                if !matches!(props.get("level_index"), Some(PropertyValue::Int(_))) {
                    return Err(missing(source, "level_index"));
                }
                let player_start = props.get_string("player_start", "");
                TriggerBehavior::ChangeLevel {
                    level_index: props.get_int("level_index", 0),
                    player_start: (!player_start.is_empty()).then(|| player_start.to_string()),
                }
            }
            TYPE_FINISH => TriggerBehavior::Finish,
            TYPE_TRIGGER => TriggerBehavior::Generic,
            _ => return Ok(ObjectKind::Geometric),
        };

        Ok(ObjectKind::Trigger(TriggerObject {
            enabled: props.get_bool("enabled", true),
            trigger_once: props.get_bool("trigger_once", false),
            enter_event_triggered: false,
            outside_box_factor: props.get_float("outside_box_factor", default_factor),
            behavior,
        }))
    }
}

fn missing(source: &GeometricObject, property: &'static str) -> LevelError {
    LevelError::MissingProperty {
        object: source.id,
        name: source.name.clone(),
        property,
    }
}

fn required_string(source: &GeometricObject, property: &'static str) -> Result<String, LevelError> {
    match source.properties.get_string(property, "") {
        "" => Err(missing(source, property)),
        value => Ok(value.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TiledMapObject {
    id: u32,
    name: String,
    layer_id: u32,
    modified: bool,
    /// Layer-local
    bounding_box: Aabb,
    kind: ObjectKind,
}

impl TiledMapObject {
    pub fn create(
        layer_id: u32,
        source: &GeometricObject,
        default_factor: f32,
    ) -> Result<Self, LevelError> {
        Ok(Self {
            id: source.id,
            name: source.name.clone(),
            layer_id,
            modified: false,
            bounding_box: source.bounding_box(),
            kind: ObjectKind::from_source(source, default_factor)?,
        })
    }

    /// Reset to the authored state. Calling it twice is the same as once.
    pub fn initialize(
        &mut self,
        source: &GeometricObject,
        default_factor: f32,
    ) -> Result<(), LevelError> {
        self.kind = ObjectKind::from_source(source, default_factor)?;
        self.name = source.name.clone();
        self.bounding_box = source.bounding_box();
        self.modified = false;
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer_id(&self) -> u32 {
        self.layer_id
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    pub fn center(&self) -> Vec2 {
        self.bounding_box.position
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn trigger(&self) -> Option<&TriggerObject> {
        match &self.kind {
            ObjectKind::Trigger(trigger) => Some(trigger),
            _ => None,
        }
    }

    pub fn is_player_start(&self) -> bool {
        self.kind == ObjectKind::PlayerStart
    }

    pub fn is_camera(&self) -> bool {
        self.kind == ObjectKind::Camera
    }

    /// Enable or disable a trigger. Returns false for other objects.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let ObjectKind::Trigger(trigger) = &mut self.kind else {
            return false;
        };
        if trigger.enabled != enabled {
            trigger.enabled = enabled;
            self.modified = true;
        }
        true
    }

    /// React to a collision transition. Returns the event for the driver,
    /// if any.
    pub fn handle_collision(
        &mut self,
        event: CollisionEvent,
        observer: Observer,
    ) -> Option<LevelEvent> {
        let ObjectKind::Trigger(trigger) = &mut self.kind else {
            return None;
        };
        if trigger.behavior.observer() != observer.kind() {
            return None;
        }

        if event == CollisionEvent::Started && trigger.trigger_once {
            if trigger.enter_event_triggered {
                return None;
            }
            trigger.enter_event_triggered = true;
            self.modified = true;
        }

        let object_id = self.id;
        let result = match (&trigger.behavior, event) {
            (TriggerBehavior::Generic, _) => Some(LevelEvent::Trigger {
                layer_id: self.layer_id,
                object_id,
                observer,
                event,
            }),
            (TriggerBehavior::Checkpoint, CollisionEvent::Started) => {
                Some(LevelEvent::CheckpointReached {
                    layer_id: self.layer_id,
                    object_id,
                })
            }
            (
                TriggerBehavior::Notification {
                    message, lifetime, ..
                },
                CollisionEvent::Started,
            ) => Some(LevelEvent::Notification {
                object_id,
                message: message.clone(),
                lifetime: *lifetime,
                visible: true,
            }),
            (
                TriggerBehavior::Notification {
                    message,
                    lifetime,
                    stop_when_collision_over: true,
                },
                CollisionEvent::Finished,
            ) => Some(LevelEvent::Notification {
                object_id,
                message: message.clone(),
                lifetime: *lifetime,
                visible: false,
            }),
            (
                TriggerBehavior::Sound {
                    sound_name,
                    volume,
                    looping,
                    ..
                },
                CollisionEvent::Started,
            ) => Some(LevelEvent::PlaySound {
                object_id,
                sound_name: sound_name.clone(),
                volume: *volume,
                looping: *looping,
            }),
            (
                TriggerBehavior::Sound {
                    sound_name,
                    stop_when_collision_over: true,
                    ..
                },
                CollisionEvent::Finished,
            ) => Some(LevelEvent::StopSound {
                object_id,
                sound_name: sound_name.clone(),
            }),
            (
                TriggerBehavior::ChangeLevel {
                    level_index,
                    player_start,
                },
                CollisionEvent::Started,
            ) => Some(LevelEvent::ChangeLevel {
                level_index: *level_index,
                player_start: player_start.clone(),
            }),
            (TriggerBehavior::Finish, CollisionEvent::Started) => {
                Some(LevelEvent::LevelCompleted { object_id })
            }
            _ => None,
        };

        if let Some(event) = &result {
            log::debug!("object {} ('{}'): {:?}", self.id, self.name, event);
        }
        result
    }

    /// Checkpoint entry, present only once the object changed
    pub fn save_checkpoint(&self) -> Option<ObjectCheckpoint> {
        if !self.modified {
            return None;
        }
        self.trigger().map(|trigger| ObjectCheckpoint {
            enabled: trigger.enabled,
            enter_event_triggered: trigger.enter_event_triggered,
        })
    }

    /// Apply a checkpoint entry on top of the authored state
    pub fn load_checkpoint(&mut self, checkpoint: &ObjectCheckpoint) {
        let ObjectKind::Trigger(trigger) = &mut self.kind else {
            return;
        };
        trigger.enabled = checkpoint.enabled;
        trigger.enter_event_triggered = checkpoint.enter_event_triggered;
        self.modified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::trigger::{CameraId, PlayerId};
    use crate::map::Properties;

    const PLAYER: Observer = Observer::Player(PlayerId(1));
    const CAMERA: Observer = Observer::Camera(CameraId(1));

    fn source(object_type: &str, properties: Properties) -> GeometricObject {
        GeometricObject::new(7, object_type, Vec2::ZERO, Vec2::splat(10.0))
            .with_name("door")
            .with_properties(properties)
    }

    fn create(object_type: &str, properties: Properties) -> TiledMapObject {
        TiledMapObject::create(1, &source(object_type, properties), 1.0).expect("valid object")
    }

    #[test]
    fn test_factory_picks_kind_from_type() {
        assert!(create("Player_Start", Properties::new()).is_player_start());
        assert!(create("camera", Properties::new()).is_camera());
        assert_eq!(create("crate", Properties::new()).kind(), &ObjectKind::Geometric);
        let finish = create("finish", Properties::new());
        assert_eq!(finish.trigger().map(|t| &t.behavior), Some(&TriggerBehavior::Finish));
        assert_eq!(finish.trigger().map(|t| t.behavior.observer()), Some(ObserverKind::Player));
    }

    #[test]
    fn test_missing_required_property() {
        let err = TiledMapObject::create(1, &source("sound", Properties::new()), 1.0);
        assert_eq!(
            err,
            Err(LevelError::MissingProperty {
                object: 7,
                name: "door".into(),
                property: "sound_name",
            })
        );
        let change_level = source("change_level", Properties::new());
        assert!(TiledMapObject::create(1, &change_level, 1.0).is_err());
    }

    #[test]
    fn test_common_trigger_properties() {
        let trigger = create(
            "trigger",
            Properties::new()
                .with("enabled", PropertyValue::Bool(false))
                .with("trigger_once", PropertyValue::Bool(true))
                .with("outside_box_factor", PropertyValue::Float(1.5)),
        );
        let t = trigger.trigger().expect("trigger");
        assert!(!t.enabled);
        assert!(t.trigger_once);
        assert_eq!(t.outside_box_factor, 1.5);
    }

    #[test]
    fn test_hysteresis_only_while_colliding() {
        let trigger = TriggerObject {
            enabled: true,
            trigger_once: false,
            enter_event_triggered: false,
            outside_box_factor: 2.0,
            behavior: TriggerBehavior::Generic,
        };
        let world = Aabb::new(Vec2::ZERO, Vec2::splat(5.0));
        let observer = Aabb::new(Vec2::new(8.0, 0.0), Vec2::splat(1.0));

        assert!(!trigger.collides(&world, &observer, false));
        assert!(trigger.collides(&world, &observer, true));

        let disabled = TriggerObject {
            enabled: false,
            ..trigger
        };
        assert!(!disabled.collides(&world, &world, true));
    }

    #[test]
    fn test_trigger_once_suppresses_started() {
        let mut object = create(
            "trigger",
            Properties::new().with("trigger_once", PropertyValue::Bool(true)),
        );
        assert!(!object.is_modified());

        assert!(object.handle_collision(CollisionEvent::Started, PLAYER).is_some());
        assert!(object.is_modified());
        assert!(object.handle_collision(CollisionEvent::Finished, PLAYER).is_some());
        assert!(object.handle_collision(CollisionEvent::Started, PLAYER).is_none());

        let checkpoint = object.save_checkpoint().expect("modified");
        assert!(checkpoint.enter_event_triggered);

        // A checkpoint without the flag re-arms the trigger
        object.load_checkpoint(&ObjectCheckpoint::default());
        assert!(object.handle_collision(CollisionEvent::Started, PLAYER).is_some());
    }

    #[test]
    fn test_behaviors_ignore_other_observers() {
        let mut checkpoint = create("checkpoint", Properties::new());
        assert!(checkpoint.handle_collision(CollisionEvent::Started, PLAYER).is_none());
        assert_eq!(
            checkpoint.handle_collision(CollisionEvent::Started, CAMERA),
            Some(LevelEvent::CheckpointReached {
                layer_id: 1,
                object_id: 7
            })
        );
    }

    #[test]
    fn test_sound_stops_only_when_asked() {
        let props = Properties::new().with("sound_name", PropertyValue::String("wind".into()));
        let mut keeps_playing = create("sound", props.clone());
        assert!(matches!(
            keeps_playing.handle_collision(CollisionEvent::Started, CAMERA),
            Some(LevelEvent::PlaySound { .. })
        ));
        assert!(keeps_playing.handle_collision(CollisionEvent::Finished, CAMERA).is_none());

        let mut stops = create(
            "sound",
            props.with("stop_when_collision_over", PropertyValue::Bool(true)),
        );
        assert_eq!(
            stops.handle_collision(CollisionEvent::Finished, CAMERA),
            Some(LevelEvent::StopSound {
                object_id: 7,
                sound_name: "wind".into()
            })
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let src = source("trigger", Properties::new());
        let mut object = TiledMapObject::create(1, &src, 1.0).expect("valid");
        object.set_enabled(false);
        assert!(object.is_modified());

        object.initialize(&src, 1.0).expect("valid");
        let once = object.clone();
        object.initialize(&src, 1.0).expect("valid");
        assert_eq!(object, once);
        assert!(!object.is_modified());
        assert_eq!(object.trigger().map(|t| t.enabled), Some(true));
        assert_eq!(object.save_checkpoint(), None);
    }
}
