use super::GpuError;

/// What the presentation surface supplies for one frame.
///
/// Either half may be missing while the surface is being resized or is occluded; the frame is
/// then dropped.
pub struct FrameTarget<T, D> {
    /// Color attachment for the render pass.
    pub target: Option<T>,
    /// Image presented once the frame's commands finish.
    pub drawable: Option<D>,
}

impl<T, D> FrameTarget<T, D> {
    pub fn new(target: T, drawable: D) -> Self {
        Self {
            target: Some(target),
            drawable: Some(drawable),
        }
    }

    /// A frame with nothing to draw into.
    pub fn empty() -> Self {
        Self {
            target: None,
            drawable: None,
        }
    }

    /// Returns both halves, or `DroppedFrame` naming the missing one.
    pub fn into_parts(self) -> Result<(T, D), GpuError> {
        match (self.target, self.drawable) {
            (Some(t), Some(d)) => Ok((t, d)),
            (None, _) => Err(GpuError::DroppedFrame("no render pass target")),
            (_, None) => Err(GpuError::DroppedFrame("no drawable")),
        }
    }
}
