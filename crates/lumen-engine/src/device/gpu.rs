use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface;
use super::wgpu_backend::{self, WgpuDevice, WgpuFrameTarget};
use super::{FrameTarget, GpuError, GpuInit, PixelFormat, SurfaceErrorAction};

/// Owns wgpu core objects and the surface configuration.
///
/// This is the presentation-surface provider for the render loop:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - hands out a `FrameTarget` per frame, empty when the surface cannot produce one
pub struct Gpu<'w> {
    /// wgpu instance used to create the adapter and surface.
    instance: wgpu::Instance,

    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; the window must outlive the `Gpu` instance.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let GpuInit {
            prefer_srgb,
            power_preference,
            force_fallback_adapter,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| GpuError::Initialization(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter,
            })
            .await
            .map_err(|e| GpuError::Initialization(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| GpuError::Initialization(format!("failed to create device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .ok_or_else(|| {
                GpuError::Initialization("surface has no color format usable by a pipeline".into())
            })?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);
        let present_mode = surface::choose_present_mode(&surface_caps, present_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        if surface::is_drawable(size) {
            surface.configure(&device, &config);
        }

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    /// Returns the render-core view of the device.
    pub fn backend(&self) -> WgpuDevice {
        WgpuDevice::new(
            self.device.clone(),
            self.queue.clone(),
            self.adapter.get_info().name,
        )
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the surface format as a pipeline output format.
    pub fn pixel_format(&self) -> Result<PixelFormat, GpuError> {
        wgpu_backend::pixel_format_from_wgpu(self.config.format).ok_or_else(|| {
            GpuError::Compilation(format!(
                "surface format {:?} has no pipeline equivalent",
                self.config.format
            ))
        })
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Returns the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Reconfigures the surface after a resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    /// Acquires the next surface texture.
    ///
    /// Transient surface errors and a zero-sized window produce an empty target, which the
    /// render loop treats as a dropped frame. Only unrecoverable errors are returned.
    pub fn acquire_frame(&mut self) -> Result<WgpuFrameTarget, GpuError> {
        if !surface::is_drawable(self.size) {
            return Ok(FrameTarget::empty());
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                log::warn!("surface texture unavailable: {err}");
                return match self.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        Err(GpuError::Allocation("surface ran out of memory".into()))
                    }
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        Ok(FrameTarget::empty())
                    }
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(FrameTarget::new(view, surface_texture))
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
