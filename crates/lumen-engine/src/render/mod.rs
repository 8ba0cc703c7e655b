//! GPU rendering subsystem.
//!
//! Everything here is written against the `device` capability traits:
//! - `ShaderLibrary` + `PipelineBuilder` compile the one pipeline at startup
//! - `GeometryBuffer` and `UniformRing` hold device memory
//! - `FrameSynchronizer` bounds frames in flight
//! - `Renderer` drives one submission per frame

mod driver;
mod geometry;
mod pipeline;
mod shader;
mod sync;
mod uniform;

pub use driver::{FragmentUniforms, FrameOutcome, FrameStage, FrameStats, Renderer, RendererConfig};
pub use geometry::{GeometryBuffer, GeometrySource, IndexBuffer, IndexData, MeshData, Submesh};
pub use pipeline::{PipelineBuilder, PipelineState};
pub use shader::{ShaderLibrary, ShaderStage};
pub use sync::{FramePermit, FrameSynchronizer};
pub use uniform::{UniformBuffer, UniformRing};
