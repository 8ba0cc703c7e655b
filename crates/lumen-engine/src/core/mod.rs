//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the application that owns a
//! `render::Renderer`.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
