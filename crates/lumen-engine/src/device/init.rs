/// Adapter, device and swapchain settings used by `Gpu::new`.
///
/// The defaults suit the render loop: vsync-paced FIFO presentation and an sRGB target, so the
/// animated brightness is perceptually even.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when the surface offers one.
    pub prefer_srgb: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Use the software adapter (CI, headless machines).
    pub force_fallback_adapter: bool,

    /// Swapchain present mode. Unsupported modes fall back to FIFO.
    pub present_mode: wgpu::PresentMode,

    /// Unsupported modes fall back to the surface's first listed mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Swapchain latency hint.
    ///
    /// Independent of `RendererConfig::max_frames_in_flight`, which bounds CPU run-ahead.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
