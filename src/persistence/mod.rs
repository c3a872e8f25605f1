//! Checkpoint persistence
//!
//! Checkpoints are stored as a versioned JSON envelope naming the level they
//! belong to. The payload itself stays sparse.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::LevelCheckpoint;

/// Current envelope format version
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid checkpoint JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("checkpoint belongs to level '{found}', not '{expected}'")]
    WrongLevel { found: String, expected: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEnvelope {
    pub version: u32,
    pub level_name: String,
    pub checkpoint: LevelCheckpoint,
}

impl CheckpointEnvelope {
    pub fn new(level_name: impl Into<String>, checkpoint: LevelCheckpoint) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            level_name: level_name.into(),
            checkpoint,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let envelope: Self = serde_json::from_str(json)?;
        if envelope.version != CHECKPOINT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                found: envelope.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(envelope)
    }

    /// Unwrap the checkpoint, checking it was saved for `level_name`
    pub fn into_checkpoint_for(
        self,
        level_name: &str,
    ) -> Result<LevelCheckpoint, PersistenceError> {
        if self.level_name != level_name {
            return Err(PersistenceError::WrongLevel {
                found: self.level_name,
                expected: level_name.to_string(),
            });
        }
        Ok(self.checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LayerCheckpoint, ObjectCheckpoint};
    use std::collections::BTreeMap;

    fn sample() -> LevelCheckpoint {
        let mut objects = BTreeMap::new();
        objects.insert(
            12,
            ObjectCheckpoint {
                enabled: true,
                enter_event_triggered: true,
            },
        );
        let mut layers = BTreeMap::new();
        layers.insert(
            3,
            LayerCheckpoint {
                offset: None,
                objects,
            },
        );
        LevelCheckpoint { layers }
    }

    #[test]
    fn test_envelope_json() {
        let envelope = CheckpointEnvelope::new("forest", sample());
        let json = envelope.to_json().expect("serialize");
        assert_eq!(
            json,
            r#"{"version":1,"level_name":"forest","checkpoint":{"layers":{"3":{"objects":{"12":{"enabled":true,"enter_event_triggered":true}}}}}}"#
        );

        let back = CheckpointEnvelope::from_json(&json).expect("deserialize");
        assert_eq!(back.into_checkpoint_for("forest").expect("same level"), sample());
    }

    #[test]
    fn test_rejects_other_versions_and_levels() {
        let json = r#"{"version":99,"level_name":"forest","checkpoint":{}}"#;
        assert!(matches!(
            CheckpointEnvelope::from_json(json),
            Err(PersistenceError::VersionMismatch { found: 99, .. })
        ));

        let envelope = CheckpointEnvelope::new("forest", LevelCheckpoint::default());
        assert!(matches!(
            envelope.into_checkpoint_for("desert"),
            Err(PersistenceError::WrongLevel { .. })
        ));

        assert!(matches!(
            CheckpointEnvelope::from_json("{not json"),
            Err(PersistenceError::Json(_))
        ));
    }
}
