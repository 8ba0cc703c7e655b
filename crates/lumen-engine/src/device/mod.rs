//! GPU device + surface management.
//!
//! This module is responsible for:
//! - the capability traits the render core is written against (`Device`, `CommandQueue`,
//!   `RenderEncoder`)
//! - the wgpu implementation of those traits
//! - creating & configuring the Surface (swapchain) and handing out per-frame targets

mod backend;
mod error;
mod format;
mod frame;
mod gpu;
mod init;
mod surface;
mod wgpu_backend;

pub use backend::{CommandQueue, CompletionHandler, Device, PipelineDescriptor, RenderEncoder};
pub use error::{GpuError, SurfaceErrorAction};
pub use format::{
    BufferUsage, ClearColor, IndexFormat, PixelFormat, VertexAttribute, VertexFormat, VertexLayout,
};
pub use frame::FrameTarget;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use wgpu_backend::{
    WgpuDevice, WgpuEncoder, WgpuFrameTarget, WgpuPipeline, WgpuQueue, pixel_format_from_wgpu,
    pixel_format_to_wgpu,
};
