//! Vertex types for particle layers

use bytemuck::{Pod, Zeroable};

/// Static description of a vertex layout
///
/// The name identifies the layout in pipeline caches; `attributes` follow
/// the WGSL `@location` numbering of the programs that consume it.
#[derive(Debug)]
pub struct VertexDeclaration {
    pub name: &'static str,
    pub stride: wgpu::BufferAddress,
    pub attributes: &'static [wgpu::VertexAttribute],
}

impl VertexDeclaration {
    pub fn layout(&self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes,
        }
    }
}

/// A vertex that can be uploaded as-is into a vertex buffer
pub trait GpuVertex: Pod {
    const DECLARATION: &'static VertexDeclaration;
}

/// Textured, tinted 2D vertex used by tile particles
///
/// `texcoord.z` is the atlas page (bitmap index).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 2],
    pub texcoord: [f32; 3],
    pub color: [f32; 4],
}

const TILE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    },
    wgpu::VertexAttribute {
        offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x4,
    },
];

const TILE_DECLARATION: VertexDeclaration = VertexDeclaration {
    name: "tile_vertex",
    stride: std::mem::size_of::<TileVertex>() as wgpu::BufferAddress,
    attributes: &TILE_ATTRIBUTES,
};

impl GpuVertex for TileVertex {
    const DECLARATION: &'static VertexDeclaration = &TILE_DECLARATION;
}

impl TileVertex {
    pub const fn new(position: [f32; 2], texcoord: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            position,
            texcoord,
            color,
        }
    }
}
