//! Tiles as particles
//!
//! Every drawable thing on a map layer (tile cells, tile objects, image
//! quads, pawns) is a textured quad stored as a `TileParticle`.

use glam::{Vec2, Vec4};

use crate::geometry::Aabb;
use crate::map::{
    FLIPPED_DIAGONALLY, FLIPPED_HORIZONTALLY, FLIPPED_VERTICALLY, TiledMap, split_gid,
};
use crate::particles::ParticleKind;
use crate::renderer::TileVertex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileParticle {
    /// Layer-local quad
    pub bounding_box: Aabb,
    /// Normalized texture rectangle (y-down)
    pub texcoords: Aabb,
    /// Atlas page, the index of the tileset
    pub page: f32,
    pub color: Vec4,
    /// Tile gid without flip bits, 0 for untextured quads
    pub gid: u32,
    /// Flip bits of the source gid
    pub flags: u32,
}

impl Default for TileParticle {
    fn default() -> Self {
        Self {
            bounding_box: Aabb::EMPTY,
            texcoords: Aabb::from_min_size(Vec2::ZERO, Vec2::ONE),
            page: 0.0,
            color: Vec4::ONE,
            gid: 0,
            flags: 0,
        }
    }
}

impl TileParticle {
    /// Untextured quad
    pub fn quad(bounding_box: Aabb, color: Vec4) -> Self {
        Self {
            bounding_box,
            color,
            ..Default::default()
        }
    }

    /// Textured quad for a raw gid. `None` when no tileset holds the tile.
    pub fn from_gid(map: &TiledMap, raw_gid: u32, bounding_box: Aabb, color: Vec4) -> Option<Self> {
        let info = map.find_tile_info(raw_gid)?;
        let tileset = map.tileset(&info)?;
        let (_, flags) = split_gid(raw_gid);
        Some(Self {
            bounding_box,
            texcoords: tileset.texcoords(info.local_id),
            page: info.tileset_index as f32,
            color,
            gid: info.gid,
            flags,
        })
    }

    /// Texture coordinate shown at a corner of the quad, `corner` being in
    /// y-down unit space (0,0 = top-left)
    fn corner_texcoord(&self, corner: Vec2) -> [f32; 3] {
        let mut uv = corner;
        if self.flags & FLIPPED_VERTICALLY != 0 {
            uv.y = 1.0 - uv.y;
        }
        if self.flags & FLIPPED_HORIZONTALLY != 0 {
            uv.x = 1.0 - uv.x;
        }
        if self.flags & FLIPPED_DIAGONALLY != 0 {
            uv = Vec2::new(uv.y, uv.x);
        }
        let uv = self.texcoords.min() + uv * self.texcoords.size();
        [uv.x, uv.y, self.page]
    }
}

/// Two triangles per tile
#[derive(Debug, Clone, Copy, Default)]
pub struct TileParticleKind;

impl ParticleKind for TileParticleKind {
    type Particle = TileParticle;
    type Vertex = TileVertex;

    const NAME: &'static str = "tile";

    fn particle_to_vertices(&self, particle: &TileParticle, output: &mut Vec<TileVertex>) {
        let min = particle.bounding_box.min();
        let max = particle.bounding_box.max();
        let color = particle.color.to_array();

        let bottom_left = TileVertex::new(
            [min.x, min.y],
            particle.corner_texcoord(Vec2::new(0.0, 1.0)),
            color,
        );
        let bottom_right = TileVertex::new(
            [max.x, min.y],
            particle.corner_texcoord(Vec2::new(1.0, 1.0)),
            color,
        );
        let top_right = TileVertex::new(
            [max.x, max.y],
            particle.corner_texcoord(Vec2::new(1.0, 0.0)),
            color,
        );
        let top_left = TileVertex::new(
            [min.x, max.y],
            particle.corner_texcoord(Vec2::new(0.0, 0.0)),
            color,
        );

        output.extend_from_slice(&[
            bottom_left,
            bottom_right,
            top_right,
            bottom_left,
            top_right,
            top_left,
        ]);
    }
}
