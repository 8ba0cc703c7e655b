use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};

use crate::device::{
    ClearColor, CommandQueue, Device, FrameTarget, GpuError, PixelFormat, RenderEncoder,
};
use crate::time::AnimationClock;

use super::geometry::{GeometryBuffer, GeometrySource};
use super::pipeline::{PipelineBuilder, PipelineState};
use super::shader::ShaderLibrary;
use super::sync::FrameSynchronizer;
use super::uniform::UniformRing;

/// Render loop configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub label: String,
    pub vertex_program: String,
    pub fragment_program: String,
    pub clear_color: ClearColor,

    /// Frames the CPU may run ahead of the GPU.
    ///
    /// 1 serializes frames completely. Larger values get one uniform buffer per frame slot.
    pub max_frames_in_flight: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            label: "lumen".to_string(),
            vertex_program: "vs_main".to_string(),
            fragment_program: "fs_main".to_string(),
            clear_color: ClearColor::default(),
            max_frames_in_flight: 1,
        }
    }
}

/// Fragment-stage uniform record.
///
/// Padded to 16 bytes for uniform buffer alignment; only `brightness` is read.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FragmentUniforms {
    pub brightness: f32,
    pub _pad: [f32; 3],
}

impl FragmentUniforms {
    pub fn new(brightness: f32) -> Self {
        Self {
            brightness,
            _pad: [0.0; 3],
        }
    }
}

/// Where the CPU side of the render loop currently is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStage {
    Idle,
    Acquiring,
    Updating,
    Encoding,
    /// Last frame submitted, completion not yet signaled.
    Submitted,
}

/// Result of one `render_frame` call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Submitted { frame_index: u64 },
    /// The surface had nothing to draw into; nothing was acquired or encoded.
    Dropped,
}

/// Counters since initialization.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub submitted: u64,
    pub dropped: u64,
}

type TargetOf<D> = FrameTarget<
    <<D as Device>::Queue as CommandQueue>::Target,
    <<D as Device>::Queue as CommandQueue>::Drawable,
>;

/// Per-frame orchestrator.
///
/// Owns the command queue, the pipeline, the geometry and the uniform ring. Each
/// `render_frame` waits for a frame slot, advances the animation, encodes one pass and submits
/// it with a completion handler that frees the slot.
pub struct Renderer<D: Device> {
    queue: D::Queue,
    pipeline: PipelineState<D::Pipeline>,
    geometry: GeometryBuffer<D::Buffer>,
    uniforms: UniformRing<D::Buffer, FragmentUniforms>,
    sync: FrameSynchronizer,
    clock: AnimationClock,
    clear_color: ClearColor,
    stage: FrameStage,
    frame_index: u64,
    stats: FrameStats,
}

impl<D: Device> Renderer<D> {
    /// Creates the queue, uploads geometry and uniforms, then compiles the pipeline.
    ///
    /// The pipeline is compiled against the geometry's own layout. Any error here is a
    /// startup failure.
    pub fn initialize(
        device: &D,
        library: &ShaderLibrary,
        geometry: &impl GeometrySource,
        format: PixelFormat,
        config: &RendererConfig,
    ) -> Result<Self, GpuError> {
        log::info!("initializing renderer `{}` on {}", config.label, device.name());

        let frames_in_flight = config.max_frames_in_flight.max(1);
        if frames_in_flight != config.max_frames_in_flight {
            log::warn!("max_frames_in_flight of 0 raised to 1");
        }

        let queue = device.new_command_queue()?;
        let geometry = GeometryBuffer::upload(device, geometry)?;
        let uniforms = UniformRing::new(
            device,
            "lumen fragment uniforms",
            FragmentUniforms::new(1.0),
            frames_in_flight,
        )?;

        let pipeline = PipelineBuilder::new(library)
            .label(&config.label)
            .fragment_buffers(1)
            .build(
                device,
                &config.vertex_program,
                &config.fragment_program,
                geometry.layout(),
                format,
            )?;

        Ok(Self {
            queue,
            pipeline,
            geometry,
            uniforms,
            sync: FrameSynchronizer::new(frames_in_flight),
            clock: AnimationClock::new(),
            clear_color: config.clear_color,
            stage: FrameStage::Idle,
            frame_index: 0,
            stats: FrameStats::default(),
        })
    }

    /// Renders one frame timestamped now.
    pub fn render_frame(&mut self, target: TargetOf<D>) -> FrameOutcome {
        self.render_frame_at(target, Instant::now())
    }

    /// Renders one frame with an explicit timestamp.
    ///
    /// Blocks while all frame slots are in flight. A target without a render pass target or
    /// drawable is dropped before anything is acquired.
    pub fn render_frame_at(&mut self, target: TargetOf<D>, now: Instant) -> FrameOutcome {
        let (view, drawable) = match target.into_parts() {
            Ok(parts) => parts,
            Err(reason) => {
                self.stats.dropped += 1;
                log::debug!("{reason}");
                return FrameOutcome::Dropped;
            }
        };

        self.enter(FrameStage::Acquiring);
        let permit = self.sync.acquire();

        self.enter(FrameStage::Updating);
        let elapsed = self.clock.tick(now);
        let uniforms = FragmentUniforms::new(self.clock.brightness());
        self.uniforms
            .slot_mut(self.frame_index)
            .write(&self.queue, uniforms);
        log::trace!(
            "frame {}: dt {:?}, brightness {:.4}",
            self.frame_index,
            elapsed,
            uniforms.brightness
        );

        self.enter(FrameStage::Encoding);
        let mut encoder = self.queue.begin_render_pass(&view, self.clear_color);
        encoder.set_pipeline(self.pipeline.raw());
        encoder.set_vertex_buffer(0, self.geometry.vertex_buffer());
        encoder.set_fragment_buffer(0, self.uniforms.slot(self.frame_index).buffer());
        self.geometry.encode_draws(&mut encoder);

        self.queue
            .commit(encoder, drawable, permit.into_completion_handler());
        self.enter(FrameStage::Submitted);

        let frame_index = self.frame_index;
        self.frame_index += 1;
        self.stats.submitted += 1;

        FrameOutcome::Submitted { frame_index }
    }

    /// Blocks until every submitted frame has completed.
    pub fn wait_idle(&self) {
        self.sync.wait_idle();
    }

    /// Current loop stage. `Submitted` turns back into `Idle` once no frame is in flight.
    pub fn stage(&self) -> FrameStage {
        match self.stage {
            FrameStage::Submitted if self.sync.in_flight() == 0 => FrameStage::Idle,
            s => s,
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Frames whose completion has been signaled.
    pub fn completed_frames(&self) -> u64 {
        self.sync.completed()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.sync.in_flight()
    }

    pub fn max_frames_in_flight(&self) -> usize {
        self.sync.capacity()
    }

    /// Accumulated animation time.
    pub fn animation_time(&self) -> Duration {
        self.clock.time()
    }

    /// Uniform record written for the most recent frame.
    pub fn current_uniforms(&self) -> FragmentUniforms {
        let last = self.frame_index.saturating_sub(1);
        *self.uniforms.slot(last).value()
    }

    pub fn pipeline(&self) -> &PipelineState<D::Pipeline> {
        &self.pipeline
    }

    pub fn geometry(&self) -> &GeometryBuffer<D::Buffer> {
        &self.geometry
    }

    pub fn queue(&self) -> &D::Queue {
        &self.queue
    }

    fn enter(&mut self, stage: FrameStage) {
        log::trace!("frame {}: {:?} -> {:?}", self.frame_index, self.stage, stage);
        self.stage = stage;
    }
}
