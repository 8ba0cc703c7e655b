use thiserror::Error;

/// Errors produced by the rendering core.
///
/// Startup errors (`Initialization`, `Compilation`, `Allocation`) abort initialization and are
/// returned to the caller. `DroppedFrame` is absorbed by the render loop and never surfaced.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No usable device or surface.
    #[error("gpu initialization failed: {0}")]
    Initialization(String),

    /// Missing shader program, wrong stage, or a layout/format combination the device rejects.
    #[error("pipeline compilation failed: {0}")]
    Compilation(String),

    /// Device memory could not be reserved.
    #[error("buffer allocation failed: {0}")]
    Allocation(String),

    /// Geometry that cannot match the vertex layout it declares.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Never produced: `FrameSynchronizer::acquire` blocks without a deadline.
    #[error("timed out waiting for a frame slot")]
    FrameAcquisitionTimeout,

    /// The surface had no render target or drawable for this frame.
    #[error("frame dropped: {0}")]
    DroppedFrame(&'static str),
}

impl GpuError {
    /// Returns `true` for errors that end startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GpuError::DroppedFrame(_))
    }
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
