//! CPU-only render device
//!
//! Keeps vertex buffers in memory and records draw calls instead of
//! submitting them. Used by the headless driver (servers, tools, replays) and
//! by tests that need to inspect what a layer uploaded.

use glam::{Vec2, Vec4};

use super::device::{BufferId, DrawCall, RenderDevice};
use super::uniforms;

/// A draw call as seen by the headless device
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: &'static str,
    pub declaration: &'static str,
    pub buffer: BufferId,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub offset: Vec2,
    pub camera_box: Option<Vec4>,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: Vec<Option<Vec<u8>>>,
    draws: Vec<RecordedDraw>,
    map_count: usize,
    /// Buffers larger than this fail to allocate
    pub max_buffer_size: Option<u64>,
    /// When set, every `map_buffer` call fails
    pub fail_maps: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bytes of a live buffer
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers
            .get(buffer.0 as usize)
            .and_then(|b| b.as_deref())
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    /// Number of successful `map_buffer` calls so far
    pub fn map_count(&self) -> usize {
        self.map_count
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Take the draws recorded since the last call (one frame's worth)
    pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.draws)
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_vertex_buffer(&mut self, size: u64) -> Option<BufferId> {
        if self.max_buffer_size.is_some_and(|max| size > max) {
            return None;
        }
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(Some(vec![0; size as usize]));
        Some(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
    }

    fn map_buffer(&mut self, buffer: BufferId, size: u64) -> Option<&mut [u8]> {
        if self.fail_maps {
            return None;
        }
        let data = self.buffers.get_mut(buffer.0 as usize)?.as_mut()?;
        let size = size as usize;
        if size > data.len() {
            return None;
        }
        self.map_count += 1;
        Some(&mut data[..size])
    }

    fn unmap_buffer(&mut self, _buffer: BufferId) {}

    fn draw_arrays(&mut self, call: &DrawCall<'_>) {
        self.draws.push(RecordedDraw {
            program: call.program,
            declaration: call.declaration.name,
            buffer: call.buffer,
            first_vertex: call.first_vertex,
            vertex_count: call.vertex_count,
            offset: call.uniforms.get_vec2(uniforms::OFFSET).unwrap_or(Vec2::ZERO),
            camera_box: call.uniforms.get_vec4(uniforms::CAMERA_BOX),
        });
    }
}
