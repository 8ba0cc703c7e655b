//! wgpu implementation of the capability traits.

use std::ops::Range;
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use super::backend::{CommandQueue, CompletionHandler, Device, PipelineDescriptor, RenderEncoder};
use super::format::{BufferUsage, ClearColor, IndexFormat, PixelFormat, VertexFormat, VertexLayout};
use super::{FrameTarget, GpuError};

/// Frame target handed out by `Gpu::acquire_frame`.
pub type WgpuFrameTarget = FrameTarget<wgpu::TextureView, wgpu::SurfaceTexture>;

/// Device handle used by the render core.
///
/// wgpu handles are reference counted, so this is a cheap clone of the objects owned by `Gpu`.
#[derive(Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    name: String,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, name: String) -> Self {
        Self {
            device,
            queue,
            name,
        }
    }
}

/// Compiled pipeline plus the bind group layouts its fragment buffers are bound through.
///
/// Fragment buffer slot `n` is `@group(n) @binding(0)` in WGSL.
pub struct WgpuPipeline {
    pipeline: wgpu::RenderPipeline,
    fragment_layouts: Vec<wgpu::BindGroupLayout>,
}

impl Device for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Pipeline = WgpuPipeline;
    type Queue = WgpuQueue;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn new_command_queue(&self) -> Result<WgpuQueue, GpuError> {
        WgpuQueue::new(self.device.clone(), self.queue.clone())
    }

    fn new_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<wgpu::Buffer, GpuError> {
        let max = self.device.limits().max_buffer_size;
        if contents.len() as u64 > max {
            return Err(GpuError::Allocation(format!(
                "{label}: {} bytes exceeds device limit of {max}",
                contents.len()
            )));
        }

        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };

        let buffer = scoped(&self.device, wgpu::ErrorFilter::OutOfMemory, || {
            scoped(&self.device, wgpu::ErrorFilter::Validation, || {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
            })
        });

        match buffer {
            Ok(Ok(buffer)) => Ok(buffer),
            Ok(Err(e)) | Err(e) => Err(GpuError::Allocation(format!("{label}: {e}"))),
        }
    }

    fn new_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
    ) -> Result<WgpuPipeline, GpuError> {
        let format = pixel_format_to_wgpu(desc.pixel_format).ok_or_else(|| {
            GpuError::Compilation(format!(
                "{:?} cannot be used as a color target",
                desc.pixel_format
            ))
        })?;

        scoped(&self.device, wgpu::ErrorFilter::Validation, || {
            self.create_pipeline(desc, format)
        })
        .map_err(|e| GpuError::Compilation(format!("{}: {e}", desc.label)))
    }
}

impl WgpuDevice {
    fn create_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
        format: wgpu::TextureFormat,
    ) -> WgpuPipeline {
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let fragment_layouts: Vec<wgpu::BindGroupLayout> = (0..desc.fragment_buffers)
            .map(|slot| {
                self.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(&format!("{} fragment buffer {slot}", desc.label)),
                        entries: &[wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        }],
                    })
            })
            .collect();
        let layout_refs: Vec<&wgpu::BindGroupLayout> = fragment_layouts.iter().collect();

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &layout_refs,
                immediate_size: 0,
            });

        let attributes = vertex_attributes(desc.vertex_layout);

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(desc.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: desc.vertex_layout.stride(),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(desc.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
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

        WgpuPipeline {
            pipeline,
            fragment_layouts,
        }
    }
}

/// Runs `create` inside an error scope.
///
/// Without a scope wgpu hands validation and out-of-memory errors to the uncaptured error
/// handler, which panics.
fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    create: impl FnOnce() -> T,
) -> Result<T, wgpu::Error> {
    let scope = device.push_error_scope(filter);
    let value = create();
    match pollster::block_on(scope.pop()) {
        Some(e) => Err(e),
        None => Ok(value),
    }
}

/// Command queue plus the thread that drives completion callbacks.
///
/// wgpu only runs `on_submitted_work_done` callbacks while the device is being polled. The
/// completion pump blocks on each submission index in turn, so callbacks fire off the render
/// thread and in submission order. The pump exits when the queue is dropped.
pub struct WgpuQueue {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pump: mpsc::Sender<wgpu::SubmissionIndex>,
}

impl WgpuQueue {
    fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, GpuError> {
        let (pump, submissions) = mpsc::channel::<wgpu::SubmissionIndex>();
        let poll_device = device.clone();

        std::thread::Builder::new()
            .name("lumen-completion".to_string())
            .spawn(move || {
                for index in submissions {
                    let wait = wgpu::PollType::Wait {
                        submission_index: Some(index),
                        timeout: None,
                    };
                    if let Err(e) = poll_device.poll(wait) {
                        log::error!("device poll failed: {e}");
                    }
                }
                log::debug!("completion pump stopped");
            })
            .map_err(|e| {
                GpuError::Initialization(format!("failed to spawn completion thread: {e}"))
            })?;

        Ok(Self {
            device,
            queue,
            pump,
        })
    }
}

impl CommandQueue for WgpuQueue {
    type Buffer = wgpu::Buffer;
    type Pipeline = WgpuPipeline;
    type Target = wgpu::TextureView;
    type Drawable = wgpu::SurfaceTexture;
    type Encoder = WgpuEncoder;

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn begin_render_pass(&self, target: &wgpu::TextureView, clear: ClearColor) -> WgpuEncoder {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen frame encoder"),
            });

        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r,
                            g: clear.g,
                            b: clear.b,
                            a: clear.a,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        WgpuEncoder {
            device: self.device.clone(),
            encoder,
            pass,
            fragment_layouts: Vec::new(),
        }
    }

    fn commit(
        &self,
        encoder: WgpuEncoder,
        drawable: wgpu::SurfaceTexture,
        on_completed: CompletionHandler,
    ) {
        let WgpuEncoder { encoder, pass, .. } = encoder;
        // The pass must end before the encoder can finish.
        drop(pass);

        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.queue.on_submitted_work_done(on_completed);
        drawable.present();

        if self.pump.send(index.clone()).is_err() {
            // The handler stays registered; its slot comes back when wgpu drops it.
            log::error!("completion pump is gone; frame {index:?} will not report completion");
        }
    }
}

/// Records one render pass.
pub struct WgpuEncoder {
    device: wgpu::Device,
    encoder: wgpu::CommandEncoder,
    pass: wgpu::RenderPass<'static>,
    fragment_layouts: Vec<wgpu::BindGroupLayout>,
}

impl RenderEncoder for WgpuEncoder {
    type Buffer = wgpu::Buffer;
    type Pipeline = WgpuPipeline;

    fn set_pipeline(&mut self, pipeline: &WgpuPipeline) {
        self.pass.set_pipeline(&pipeline.pipeline);
        self.fragment_layouts = pipeline.fragment_layouts.clone();
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        self.pass.set_vertex_buffer(slot, buffer.slice(..));
    }

    fn set_fragment_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        let Some(layout) = self.fragment_layouts.get(slot as usize) else {
            log::warn!("fragment buffer slot {slot} is not declared by the bound pipeline");
            return;
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen fragment buffer"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.pass.set_bind_group(slot, &bind_group, &[]);
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.pass.draw(vertices, 0..1);
    }

    fn draw_indexed(
        &mut self,
        index_buffer: &wgpu::Buffer,
        format: IndexFormat,
        indices: Range<u32>,
    ) {
        let format = match format {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        };
        self.pass.set_index_buffer(index_buffer.slice(..), format);
        self.pass.draw_indexed(indices, 0, 0..1);
    }
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes()
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: vertex_format_to_wgpu(a.format),
            offset: a.offset,
            shader_location: a.location,
        })
        .collect()
}

fn vertex_format_to_wgpu(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
        VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
    }
}

/// Maps a pipeline output format to wgpu; `None` for non-color formats.
pub fn pixel_format_to_wgpu(format: PixelFormat) -> Option<wgpu::TextureFormat> {
    let f = match format {
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
        PixelFormat::Depth32Float => return None,
    };
    Some(f)
}

/// Maps a surface format back to a pipeline output format.
pub fn pixel_format_from_wgpu(format: wgpu::TextureFormat) -> Option<PixelFormat> {
    let f = match format {
        wgpu::TextureFormat::Bgra8Unorm => PixelFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => PixelFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8Unorm => PixelFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => PixelFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => PixelFormat::Rgba16Float,
        wgpu::TextureFormat::Rgb10a2Unorm => PixelFormat::Rgb10a2Unorm,
        wgpu::TextureFormat::Depth32Float => PixelFormat::Depth32Float,
        _ => return None,
    };
    Some(f)
}
