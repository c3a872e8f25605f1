//! GPU resource layer used by particle layers
//!
//! Particle layers only ever need three things from the GPU: a vertex buffer
//! they can fill, a way to fill it, and a non-indexed triangle draw. Every
//! call may fail; callers treat failure as "draw nothing this frame".

use super::uniforms::UniformProvider;
use super::vertex::VertexDeclaration;

/// Handle to a vertex buffer owned by a [`RenderDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// A single non-indexed triangle-list draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Name of the GPU program (shader) to draw with
    pub program: &'static str,
    pub declaration: &'static VertexDeclaration,
    pub buffer: BufferId,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub uniforms: &'a UniformProvider,
}

pub trait RenderDevice {
    /// Create a vertex buffer of `size` bytes
    fn create_vertex_buffer(&mut self, size: u64) -> Option<BufferId>;

    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Map the first `size` bytes of a buffer for writing. Blocks.
    fn map_buffer(&mut self, buffer: BufferId, size: u64) -> Option<&mut [u8]>;

    /// Flush what was written since the matching `map_buffer`
    fn unmap_buffer(&mut self, buffer: BufferId);

    fn draw_arrays(&mut self, call: &DrawCall<'_>);
}
