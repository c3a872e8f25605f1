//! Rendering seam for particle layers
//!
//! `RenderDevice` is the only GPU surface the runtime touches. `WgpuDevice`
//! renders with WebGPU; `HeadlessDevice` keeps everything on the CPU.

pub mod device;
pub mod headless;
pub mod pipeline;
pub mod uniforms;
pub mod vertex;

pub use device::{BufferId, DrawCall, RenderDevice};
pub use headless::{HeadlessDevice, RecordedDraw};
pub use pipeline::{TILE_PROGRAM, WgpuDevice};
pub use uniforms::{RenderParams, UniformProvider, UniformValue};
pub use vertex::{GpuVertex, TileVertex, VertexDeclaration};
