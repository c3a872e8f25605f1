//! Static tile map data consumed by the level runtime
//!
//! Nothing here is mutated at runtime: levels share one `TiledMap` and keep
//! their own state on the side.

pub mod data;
pub mod properties;

pub use data::{
    FLIPPED_DIAGONALLY, FLIPPED_HORIZONTALLY, FLIPPED_VERTICALLY, GeometricObject, LayerContent,
    LayerData, ObjectShape, TileData, TileInfo, TiledMap, Tileset, split_gid,
};
pub use properties::{Properties, PropertyValue};
