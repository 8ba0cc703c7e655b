use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::{Gpu, GpuInit, VertexFormat, VertexLayout, WgpuDevice};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::render::{FrameOutcome, MeshData, Renderer, RendererConfig, ShaderLibrary};
use lumen_engine::window::{Runtime, RuntimeConfig};

/// Interleaved vertex record: RGBA color then clip-space position.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    color: [f32; 4],
    pos: [f32; 2],
}

fn triangle() -> MeshData<Vertex> {
    let layout = VertexLayout::packed(&[
        (0, VertexFormat::Float32x4),
        (1, VertexFormat::Float32x2),
    ]);
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
        layout,
    )
}

#[derive(Default)]
struct TriangleApp {
    renderer: Option<Renderer<WgpuDevice>>,
}

impl App for TriangleApp {
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let library = ShaderLibrary::from_wgsl(
            "triangle.wgsl",
            include_str!("../shaders/triangle.wgsl"),
        )?;
        let format = gpu.pixel_format()?;

        let renderer = Renderer::initialize(
            &gpu.backend(),
            &library,
            &triangle(),
            format,
            &RendererConfig::default(),
        )
        .context("failed to build the triangle renderer")?;

        self.renderer = Some(renderer);
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(renderer) = self.renderer.as_mut() else {
            return AppControl::Continue;
        };

        ctx.present(|target| {
            if let FrameOutcome::Submitted { frame_index } = renderer.render_frame(target) {
                if frame_index > 0 && frame_index % 600 == 0 {
                    let stats = renderer.stats();
                    log::debug!(
                        "{} frames submitted, {} dropped, {} completed",
                        stats.submitted,
                        stats.dropped,
                        renderer.completed_frames()
                    );
                }
            }
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Lumen triangle".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
    };

    Runtime::run(config, GpuInit::default(), TriangleApp::default())
}
