//! Sparse level checkpoints
//!
//! Only what differs from the static map is stored. A layer or object
//! absent from a checkpoint is restored to its authored state on load.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelCheckpoint {
    /// Keyed by layer id
    #[serde(default)]
    pub layers: BTreeMap<u32, LayerCheckpoint>,
}

impl LevelCheckpoint {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerCheckpoint {
    /// Set when the layer scrolled away from its authored offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vec2>,
    /// Keyed by object id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub objects: BTreeMap<u32, ObjectCheckpoint>,
}

impl LayerCheckpoint {
    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.objects.is_empty()
    }
}

/// Mutable state of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCheckpoint {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enter_event_triggered: bool,
}

impl Default for ObjectCheckpoint {
    fn default() -> Self {
        Self {
            enabled: true,
            enter_event_triggered: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}
