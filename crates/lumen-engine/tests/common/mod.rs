//! Recording backend for render loop tests.
//!
//! Every device and queue call is appended to a shared event log. Submissions go to a worker
//! thread standing in for the GPU: it completes them in order after a fixed delay, logs
//! `Completed`, then runs the completion handler.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};

use lumen_engine::device::{
    BufferUsage, ClearColor, CommandQueue, CompletionHandler, Device, FrameTarget, GpuError,
    IndexFormat, PipelineDescriptor, RenderEncoder, VertexFormat, VertexLayout,
};
use lumen_engine::render::{MeshData, ShaderLibrary};

pub const SHADER: &str = r#"
struct VertexIn {
    @location(0) color: vec4<f32>,
    @location(1) pos: vec2<f32>,
};

struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

struct FragmentUniforms {
    brightness: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: FragmentUniforms;

@vertex
fn vs_main(in: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(in.pos, 0.0, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color.rgb * uniforms.brightness, in.color.a);
}
"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NewBuffer {
        id: u32,
        usage: BufferUsage,
        len: usize,
    },
    Write {
        buffer: u32,
        bytes: Vec<u8>,
    },
    BeginPass { target: u32 },
    SetPipeline(u32),
    SetVertexBuffer {
        slot: u32,
        buffer: u32,
    },
    SetFragmentBuffer {
        slot: u32,
        buffer: u32,
    },
    Draw(Range<u32>),
    DrawIndexed {
        buffer: u32,
        format: IndexFormat,
        indices: Range<u32>,
    },
    Commit {
        submission: u64,
        drawable: u32,
    },
    Completed { submission: u64 },
    /// The GPU dropped the submission's handler without running it.
    Lost { submission: u64 },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

#[derive(Debug)]
pub struct MockBuffer {
    pub id: u32,
    pub usage: BufferUsage,
}

#[derive(Debug)]
pub struct MockPipeline {
    pub id: u32,
    pub entry_points: (String, String),
}

pub struct MockDevice {
    pub log: EventLog,
    pub pipelines_created: Arc<AtomicUsize>,
    next_id: AtomicU32,
    max_buffer_len: usize,
    gpu_delay: Duration,
    lost: Vec<u64>,
}

impl MockDevice {
    pub fn new(gpu_delay: Duration) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            pipelines_created: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU32::new(1),
            max_buffer_len: usize::MAX,
            gpu_delay,
            lost: Vec::new(),
        }
    }

    /// Submissions whose completion handlers the GPU drops instead of running.
    pub fn with_lost_submissions(mut self, submissions: &[u64]) -> Self {
        self.lost = submissions.to_vec();
        self
    }

    pub fn with_max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.log.lock().unwrap().clear();
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl Device for MockDevice {
    type Buffer = MockBuffer;
    type Pipeline = MockPipeline;
    type Queue = MockQueue;

    fn name(&self) -> String {
        "mock".to_string()
    }

    fn new_command_queue(&self) -> Result<MockQueue, GpuError> {
        let (tx, rx) = mpsc::channel::<(u64, CompletionHandler)>();
        let log = self.log.clone();
        let delay = self.gpu_delay;
        let lost = self.lost.clone();

        thread::spawn(move || {
            for (submission, handler) in rx {
                thread::sleep(delay);
                if lost.contains(&submission) {
                    log.lock().unwrap().push(Event::Lost { submission });
                    drop(handler);
                    continue;
                }
                log.lock().unwrap().push(Event::Completed { submission });
                handler();
            }
        });

        Ok(MockQueue {
            log: self.log.clone(),
            gpu: tx,
            submissions: AtomicU64::new(0),
        })
    }

    fn new_buffer(
        &self,
        _label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<MockBuffer, GpuError> {
        if contents.len() > self.max_buffer_len {
            return Err(GpuError::Allocation(format!("{} bytes", contents.len())));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.push(Event::NewBuffer {
            id,
            usage,
            len: contents.len(),
        });
        Ok(MockBuffer { id, usage })
    }

    fn new_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
    ) -> Result<MockPipeline, GpuError> {
        self.pipelines_created.fetch_add(1, Ordering::SeqCst);
        Ok(MockPipeline {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            entry_points: (desc.vertex_entry.to_string(), desc.fragment_entry.to_string()),
        })
    }
}

pub struct MockQueue {
    log: EventLog,
    gpu: mpsc::Sender<(u64, CompletionHandler)>,
    submissions: AtomicU64,
}

impl CommandQueue for MockQueue {
    type Buffer = MockBuffer;
    type Pipeline = MockPipeline;
    type Target = u32;
    type Drawable = u32;
    type Encoder = MockEncoder;

    fn write_buffer(&self, buffer: &MockBuffer, _offset: u64, data: &[u8]) {
        self.log.lock().unwrap().push(Event::Write {
            buffer: buffer.id,
            bytes: data.to_vec(),
        });
    }

    fn begin_render_pass(&self, target: &u32, _clear: ClearColor) -> MockEncoder {
        self.log
            .lock()
            .unwrap()
            .push(Event::BeginPass { target: *target });
        MockEncoder {
            log: self.log.clone(),
        }
    }

    fn commit(&self, _encoder: MockEncoder, drawable: u32, on_completed: CompletionHandler) {
        let submission = self.submissions.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push(Event::Commit {
                submission,
                drawable,
            });
        self.gpu.send((submission, on_completed)).unwrap();
    }
}

pub struct MockEncoder {
    log: EventLog,
}

impl MockEncoder {
    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl RenderEncoder for MockEncoder {
    type Buffer = MockBuffer;
    type Pipeline = MockPipeline;

    fn set_pipeline(&mut self, pipeline: &MockPipeline) {
        self.push(Event::SetPipeline(pipeline.id));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &MockBuffer) {
        self.push(Event::SetVertexBuffer {
            slot,
            buffer: buffer.id,
        });
    }

    fn set_fragment_buffer(&mut self, slot: u32, buffer: &MockBuffer) {
        self.push(Event::SetFragmentBuffer {
            slot,
            buffer: buffer.id,
        });
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.push(Event::Draw(vertices));
    }

    fn draw_indexed(
        &mut self,
        index_buffer: &MockBuffer,
        format: IndexFormat,
        indices: Range<u32>,
    ) {
        self.push(Event::DrawIndexed {
            buffer: index_buffer.id,
            format,
            indices,
        });
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub color: [f32; 4],
    pub pos: [f32; 2],
}

pub fn vertex_layout() -> VertexLayout {
    VertexLayout::packed(&[(0, VertexFormat::Float32x4), (1, VertexFormat::Float32x2)])
}

pub fn triangle() -> MeshData<Vertex> {
    MeshData::new(
        vec![
            Vertex {
                color: [1.0, 0.0, 0.0, 1.0],
                pos: [-1.0, -1.0],
            },
            Vertex {
                color: [0.0, 1.0, 0.0, 1.0],
                pos: [0.0, 1.0],
            },
            Vertex {
                color: [0.0, 0.0, 1.0, 1.0],
                pos: [1.0, -1.0],
            },
        ],
        vertex_layout(),
    )
}

pub fn library() -> ShaderLibrary {
    ShaderLibrary::from_wgsl("test shaders", SHADER).unwrap()
}

pub fn target(id: u32) -> FrameTarget<u32, u32> {
    FrameTarget::new(id, id)
}

/// Brightness values written to uniform buffers, in write order.
pub fn written_brightness(events: &[Event]) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Write { bytes, .. } => {
                Some(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            _ => None,
        })
        .collect()
}

pub fn position(events: &[Event], wanted: &Event) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} not in log"))
}
