//! Static map data
//!
//! The read-only shape of a loaded tile map. Coordinates are y-up world
//! units: object positions are the min corner of their box, tile rows are
//! stored top row first.

use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::properties::Properties;
use crate::geometry::Aabb;

/// Gid bit set when a tile is mirrored horizontally
pub const FLIPPED_HORIZONTALLY: u32 = 0x8000_0000;
/// Gid bit set when a tile is mirrored vertically
pub const FLIPPED_VERTICALLY: u32 = 0x4000_0000;
/// Gid bit set when a tile is mirrored along its diagonal
pub const FLIPPED_DIAGONALLY: u32 = 0x2000_0000;
const FLIP_MASK: u32 = FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY;

/// Split a raw gid into the tile gid and its flip bits
pub fn split_gid(raw: u32) -> (u32, u32) {
    (raw & !FLIP_MASK, raw & FLIP_MASK)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TiledMap {
    pub name: String,
    pub tile_size: UVec2,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
    /// Bottom to top
    #[serde(default)]
    pub layers: Vec<LayerData>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub name: String,
    pub first_gid: u32,
    pub tile_count: u32,
    pub columns: u32,
    pub tile_size: UVec2,
    pub image_size: UVec2,
    /// Tiles with a type or properties; most tiles have neither
    #[serde(default)]
    pub tiles: Vec<TileData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileData {
    pub id: u32,
    #[serde(rename = "type", default)]
    pub tile_type: String,
    #[serde(default)]
    pub properties: Properties,
}

/// A gid resolved against the map's tilesets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    pub gid: u32,
    pub tileset_index: usize,
    pub local_id: u32,
}

impl Tileset {
    pub fn contains_gid(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }

    pub fn tile_data(&self, local_id: u32) -> Option<&TileData> {
        self.tiles.iter().find(|t| t.id == local_id)
    }

    /// Normalized texture rectangle of a tile, y-down texture space
    pub fn texcoords(&self, local_id: u32) -> Aabb {
        if self.columns == 0 || self.image_size.x == 0 || self.image_size.y == 0 {
            return Aabb::from_min_size(Vec2::ZERO, Vec2::ONE);
        }
        let column = (local_id % self.columns) as f32;
        let row = (local_id / self.columns) as f32;
        let tile = self.tile_size.as_vec2();
        let image = self.image_size.as_vec2();
        Aabb::from_min_size(Vec2::new(column, row) * tile / image, tile / image)
    }
}

impl TiledMap {
    pub fn layer(&self, id: u32) -> Option<&LayerData> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&LayerData> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Resolve a gid (flip bits allowed) to its tileset
    pub fn find_tile_info(&self, gid: u32) -> Option<TileInfo> {
        let (gid, _) = split_gid(gid);
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .enumerate()
            .find(|(_, ts)| ts.contains_gid(gid))
            .map(|(tileset_index, ts)| TileInfo {
                gid,
                tileset_index,
                local_id: gid - ts.first_gid,
            })
    }

    pub fn tileset(&self, info: &TileInfo) -> Option<&Tileset> {
        self.tilesets.get(info.tileset_index)
    }

    pub fn tile_data(&self, info: &TileInfo) -> Option<&TileData> {
        self.tileset(info)?.tile_data(info.local_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    pub id: u32,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Authored offset of the layer in world units
    #[serde(default)]
    pub offset: Vec2,
    #[serde(default)]
    pub properties: Properties,
    #[serde(flatten)]
    pub content: LayerContent,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerContent {
    /// Row-major gids, top row first; 0 is an empty cell
    Tiles {
        width: u32,
        height: u32,
        data: Vec<u32>,
    },
    Objects {
        objects: Vec<GeometricObject>,
    },
    Image {
        image: String,
        size: Vec2,
    },
}

impl LayerData {
    pub fn is_tile_layer(&self) -> bool {
        matches!(self.content, LayerContent::Tiles { .. })
    }

    pub fn objects(&self) -> &[GeometricObject] {
        match &self.content {
            LayerContent::Objects { objects } => objects,
            _ => &[],
        }
    }

    pub fn object(&self, id: u32) -> Option<&GeometricObject> {
        self.objects().iter().find(|o| o.id == id)
    }

    /// Box of every cell that holds a tile, in layer-local space
    pub fn tile_cells(&self, tile_size: Vec2) -> Vec<(Aabb, u32)> {
        let LayerContent::Tiles {
            width,
            height,
            data,
        } = &self.content
        else {
            return Vec::new();
        };
        let columns = (*width).max(1);
        let mut cells = Vec::new();
        for (index, raw) in data.iter().enumerate() {
            if split_gid(*raw).0 == 0 {
                continue;
            }
            let x = index as u32 % columns;
            let row = index as u32 / columns;
            if row >= *height {
                break;
            }
            let min = Vec2::new(x as f32, (height - 1 - row) as f32) * tile_size;
            cells.push((Aabb::from_min_size(min, tile_size), *raw));
        }
        cells
    }

    /// Layer-local extent of the layer content
    pub fn bounding_box(&self, tile_size: Vec2) -> Aabb {
        match &self.content {
            LayerContent::Tiles { width, height, .. } => Aabb::from_min_size(
                Vec2::ZERO,
                Vec2::new(*width as f32, *height as f32) * tile_size,
            ),
            LayerContent::Objects { objects } => objects
                .iter()
                .map(|o| o.bounding_box())
                .fold(Aabb::EMPTY, |acc, b| acc.union(&b)),
            LayerContent::Image { size, .. } => Aabb::from_min_size(Vec2::ZERO, *size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObjectShape {
    Rectangle,
    Ellipse,
    Point,
    /// Vertices relative to the object position
    Polygon { points: Vec<Vec2> },
    /// Tile object: drawn with a tile, `gid` may carry flip bits
    Tile { gid: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricObject {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(flatten)]
    pub shape: ObjectShape,
    /// Min corner
    pub position: Vec2,
    #[serde(default)]
    pub size: Vec2,
    #[serde(default)]
    pub properties: Properties,
}

impl GeometricObject {
    pub fn new(id: u32, object_type: impl Into<String>, position: Vec2, size: Vec2) -> Self {
        Self {
            id,
            name: String::new(),
            object_type: object_type.into(),
            shape: ObjectShape::Rectangle,
            position,
            size,
            properties: Properties::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Layer-local box; points have an empty box
    pub fn bounding_box(&self) -> Aabb {
        match &self.shape {
            ObjectShape::Point => Aabb::new(self.position, Vec2::ZERO),
            ObjectShape::Polygon { points } if !points.is_empty() => {
                let (min, max) = points.iter().fold(
                    (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
                    |(min, max), p| (min.min(*p), max.max(*p)),
                );
                Aabb::from_corners(self.position + min, self.position + max)
            }
            _ => Aabb::from_min_size(self.position, self.size),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self.shape {
            ObjectShape::Point => self.position,
            _ => self.bounding_box().position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tileset(first_gid: u32) -> Tileset {
        Tileset {
            name: "terrain".into(),
            first_gid,
            tile_count: 8,
            columns: 4,
            tile_size: UVec2::splat(16),
            image_size: UVec2::new(64, 32),
            tiles: vec![TileData {
                id: 5,
                tile_type: "spike".into(),
                properties: Properties::new(),
            }],
        }
    }

    #[test]
    fn test_find_tile_info_across_tilesets() {
        let map = TiledMap {
            tilesets: vec![tileset(1), tileset(9)],
            ..Default::default()
        };

        assert_eq!(map.find_tile_info(0), None);
        assert_eq!(map.find_tile_info(17), None);
        let info = map.find_tile_info(14 | FLIPPED_HORIZONTALLY).expect("resolved");
        assert_eq!((info.gid, info.tileset_index, info.local_id), (14, 1, 5));
        assert_eq!(map.tile_data(&info).map(|t| t.tile_type.as_str()), Some("spike"));
    }

    #[test]
    fn test_texcoords_follow_atlas_grid() {
        let uv = tileset(1).texcoords(5);
        assert_eq!(uv.min(), Vec2::new(0.25, 0.5));
        assert_eq!(uv.max(), Vec2::new(0.5, 1.0));
    }

    #[test]
    fn test_tile_cells_top_row_first() {
        let layer = LayerData {
            id: 1,
            name: "ground".into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            properties: Properties::new(),
            content: LayerContent::Tiles {
                width: 2,
                height: 2,
                data: vec![1, 0, 0, 2],
            },
        };
        let cells = layer.tile_cells(Vec2::splat(10.0));
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].0.min(), Vec2::new(0.0, 10.0));
        assert_eq!(cells[1].0.min(), Vec2::new(10.0, 0.0));
        assert_eq!(layer.bounding_box(Vec2::splat(10.0)).max(), Vec2::splat(20.0));
    }

    #[test]
    fn test_object_boxes() {
        let rect = GeometricObject::new(1, "", Vec2::new(2.0, 2.0), Vec2::new(4.0, 2.0));
        assert_eq!(rect.bounding_box().position, Vec2::new(4.0, 3.0));

        let mut poly = rect.clone();
        poly.shape = ObjectShape::Polygon {
            points: vec![Vec2::ZERO, Vec2::new(3.0, -1.0), Vec2::new(1.0, 2.0)],
        };
        assert_eq!(poly.bounding_box().min(), Vec2::new(2.0, 1.0));
        assert_eq!(poly.bounding_box().max(), Vec2::new(5.0, 4.0));

        let mut point = rect;
        point.shape = ObjectShape::Point;
        assert!(point.bounding_box().is_empty());
        assert_eq!(point.center(), Vec2::new(2.0, 2.0));
    }
}
