//! Level configuration errors

use thiserror::Error;

/// Problems in the map data that make a level impossible to build
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LevelError {
    #[error("map has no layers")]
    EmptyMap,

    #[error("layer id {0} is used twice")]
    DuplicateLayer(u32),

    #[error("unresolved layer reference '{0}'")]
    UnresolvedLayer(String),

    #[error("object {object} ('{name}') is missing required property '{property}'")]
    MissingProperty {
        object: u32,
        name: String,
        property: &'static str,
    },

    #[error("no player start named '{0}'")]
    MissingPlayerStart(String),

    #[error("map has no player start")]
    NoPlayerStart,

    #[error("unknown player {0}")]
    UnknownPlayer(u32),
}
