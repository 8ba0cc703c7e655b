use winit::window::Window;

use crate::device::{Gpu, WgpuFrameTarget};

use super::app::AppControl;

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires this frame's target from the surface and hands it to `draw`.
    ///
    /// The target may be empty (resize churn, occlusion); `draw` still runs and is expected to
    /// drop the frame. Unrecoverable surface errors end the app.
    pub fn present<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(WgpuFrameTarget),
    {
        let target = match self.gpu.acquire_frame() {
            Ok(t) => t,
            Err(e) => {
                log::error!("surface failure: {e}");
                return AppControl::Exit;
            }
        };

        self.window.pre_present_notify();
        draw(target);

        AppControl::Continue
    }
}
