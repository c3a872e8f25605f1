//! WebGPU render device
//!
//! Vertex buffers are written through a CPU staging copy: `map_buffer` hands
//! out the staging bytes and `unmap_buffer` uploads them with
//! `Queue::write_buffer`. Draws are queued and encoded into a single render
//! pass by [`WgpuDevice::render`].

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};
use wgpu::util::DeviceExt;

use super::device::{BufferId, DrawCall, RenderDevice};
use super::uniforms::{self, UniformProvider};

/// Name of the built-in tile program
pub const TILE_PROGRAM: &str = "tile";

/// Uniform block shared by every program (must match the WGSL side)
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    camera_box: [f32; 4], // center.xy, half_size.zw
    offset: [f32; 2],
    _pad: [f32; 2],
    tint: [f32; 4],
}

impl DrawUniforms {
    fn from_provider(provider: &UniformProvider) -> Self {
        let camera_box = provider
            .get_vec4(uniforms::CAMERA_BOX)
            .unwrap_or(Vec4::new(0.0, 0.0, 1.0, 1.0));
        let offset = provider.get_vec2(uniforms::OFFSET).unwrap_or(Vec2::ZERO);
        let tint = provider.get_vec4(uniforms::TINT).unwrap_or(Vec4::ONE);
        Self {
            camera_box: camera_box.to_array(),
            offset: offset.to_array(),
            _pad: [0.0; 2],
            tint: tint.to_array(),
        }
    }
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
    mapped_len: usize,
}

struct PendingDraw {
    pipeline_key: (&'static str, &'static str),
    buffer: BufferId,
    first_vertex: u32,
    vertex_count: u32,
    bind_group: wgpu::BindGroup,
}

pub struct WgpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: HashMap<&'static str, wgpu::ShaderModule>,
    /// Keyed by (program, vertex declaration)
    pipelines: HashMap<(&'static str, &'static str), wgpu::RenderPipeline>,
    buffers: Vec<Option<GpuBuffer>>,
    pending: Vec<PendingDraw>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniforms_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let mut result = Self {
            device,
            queue,
            format,
            bind_group_layout,
            pipeline_layout,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            buffers: Vec::new(),
            pending: Vec::new(),
        };
        result.register_program(TILE_PROGRAM, include_str!("tile.wgsl"));
        result
    }

    /// Register a WGSL program. It must expose `vs_main`/`fs_main` and
    /// declare the shared uniform block at group 0, binding 0.
    pub fn register_program(&mut self, name: &'static str, wgsl: &str) {
        log::info!("Registering GPU program '{}'", name);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });
        self.programs.insert(name, module);
        self.pipelines.retain(|(program, _), _| *program != name);
    }

    fn get_or_create_pipeline(
        &mut self,
        call: &DrawCall<'_>,
    ) -> Option<(&'static str, &'static str)> {
        let key = (call.program, call.declaration.name);
        if self.pipelines.contains_key(&key) {
            return Some(key);
        }
        let Some(shader) = self.programs.get(call.program) else {
            log::warn!("Unknown GPU program '{}', skipping draw", call.program);
            return None;
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(call.program),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[call.declaration.layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
        self.pipelines.insert(key, pipeline);
        Some(key)
    }

    /// Encode every queued draw into one render pass targeting `view`
    pub fn render(&mut self, view: &wgpu::TextureView, clear: wgpu::Color) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("level_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("level_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &self.pending {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline_key) else {
                    continue;
                };
                // The buffer may have been destroyed since the draw was queued
                let Some(Some(gpu_buffer)) = self.buffers.get(draw.buffer.0 as usize) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu_buffer.buffer.slice(..));
                render_pass.draw(draw.first_vertex..draw.first_vertex + draw.vertex_count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.pending.clear();
    }
}

impl RenderDevice for WgpuDevice {
    fn create_vertex_buffer(&mut self, size: u64) -> Option<BufferId> {
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if size == 0 || size > self.device.limits().max_buffer_size {
            log::warn!("Refusing vertex buffer of {} bytes", size);
            return None;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle_vertex_buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let entry = GpuBuffer {
            buffer,
            staging: vec![0; size as usize],
            mapped_len: 0,
        };

        // Reuse a freed slot if there is one
        if let Some(index) = self.buffers.iter().position(|b| b.is_none()) {
            self.buffers[index] = Some(entry);
            return Some(BufferId(index as u32));
        }
        self.buffers.push(Some(entry));
        Some(BufferId(self.buffers.len() as u32 - 1))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            if let Some(gpu_buffer) = slot.take() {
                gpu_buffer.buffer.destroy();
            }
        }
    }

    fn map_buffer(&mut self, buffer: BufferId, size: u64) -> Option<&mut [u8]> {
        let gpu_buffer = self.buffers.get_mut(buffer.0 as usize)?.as_mut()?;
        let size = size as usize;
        if size > gpu_buffer.staging.len() {
            return None;
        }
        gpu_buffer.mapped_len = size;
        Some(&mut gpu_buffer.staging[..size])
    }

    fn unmap_buffer(&mut self, buffer: BufferId) {
        let Some(Some(gpu_buffer)) = self.buffers.get_mut(buffer.0 as usize) else {
            return;
        };
        let len = gpu_buffer
            .mapped_len
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize)
            .min(gpu_buffer.staging.len());
        if len > 0 {
            self.queue
                .write_buffer(&gpu_buffer.buffer, 0, &gpu_buffer.staging[..len]);
        }
        gpu_buffer.mapped_len = 0;
    }

    fn draw_arrays(&mut self, call: &DrawCall<'_>) {
        if call.vertex_count == 0 {
            return;
        }
        let Some(pipeline_key) = self.get_or_create_pipeline(call) else {
            return;
        };

        let draw_uniforms = DrawUniforms::from_provider(call.uniforms);

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("draw_uniforms"),
                contents: bytemuck::bytes_of(&draw_uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniforms_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        self.pending.push(PendingDraw {
            pipeline_key,
            buffer: call.buffer,
            first_vertex: call.first_vertex,
            vertex_count: call.vertex_count,
            bind_group,
        });
    }
}
