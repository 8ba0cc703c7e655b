//! Capability traits the rendering core is written against.
//!
//! The core never names a concrete graphics API. A backend supplies buffer allocation,
//! pipeline compilation, command encoding, submission and a completion callback; `wgpu_backend`
//! is the production implementation.

use std::ops::Range;

use super::format::{BufferUsage, ClearColor, IndexFormat, PixelFormat, VertexLayout};
use super::GpuError;

/// One-shot callback the queue invokes once the device has finished a submission.
///
/// Callbacks fire in submission order, off the submitting thread. A queue that loses a
/// submission (device loss) drops the handler unrun.
pub type CompletionHandler = Box<dyn FnOnce() + Send + 'static>;

/// Everything a backend needs to compile a render pipeline.
///
/// Entry points are already resolved and validated against the layout by
/// `render::PipelineBuilder`.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescriptor<'a> {
    pub label: &'a str,
    /// WGSL source containing both entry points.
    pub source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub vertex_layout: &'a VertexLayout,
    pub pixel_format: PixelFormat,
    /// Number of uniform buffers bound to the fragment stage, at slots `0..n`.
    pub fragment_buffers: u32,
}

/// Logical GPU handle and factory for device resources.
pub trait Device {
    type Buffer;
    type Pipeline;
    type Queue: CommandQueue<Buffer = Self::Buffer, Pipeline = Self::Pipeline>;

    /// Human-readable adapter name, for logs.
    fn name(&self) -> String;

    fn new_command_queue(&self) -> Result<Self::Queue, GpuError>;

    /// Allocates a buffer initialized with `contents`.
    fn new_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, GpuError>;

    fn new_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
    ) -> Result<Self::Pipeline, GpuError>;
}

/// Ordered channel of command buffers.
pub trait CommandQueue {
    type Buffer;
    type Pipeline;
    /// Color attachment a render pass writes into.
    type Target;
    /// Presentable surface image.
    type Drawable;
    type Encoder: RenderEncoder<Buffer = Self::Buffer, Pipeline = Self::Pipeline>;

    /// Overwrites buffer contents; ordered before the next `commit`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Opens a render pass that clears `target` to `clear`.
    fn begin_render_pass(&self, target: &Self::Target, clear: ClearColor) -> Self::Encoder;

    /// Ends encoding, submits, schedules `drawable` for presentation and registers
    /// `on_completed` against the submission.
    fn commit(
        &self,
        encoder: Self::Encoder,
        drawable: Self::Drawable,
        on_completed: CompletionHandler,
    );
}

/// Records commands for one render pass.
pub trait RenderEncoder {
    type Buffer;
    type Pipeline;

    fn set_pipeline(&mut self, pipeline: &Self::Pipeline);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &Self::Buffer);
    fn set_fragment_buffer(&mut self, slot: u32, buffer: &Self::Buffer);

    /// Non-indexed draw.
    fn draw(&mut self, vertices: Range<u32>);

    /// Indexed draw reading `indices` (element range, not bytes) from `index_buffer`.
    fn draw_indexed(
        &mut self,
        index_buffer: &Self::Buffer,
        format: IndexFormat,
        indices: Range<u32>,
    );
}
