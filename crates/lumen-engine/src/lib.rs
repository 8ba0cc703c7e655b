//! Lumen engine crate.
//!
//! A minimal real-time rendering driver: one pipeline, one geometry submission per frame,
//! and CPU submission throttled against GPU completion.

pub mod device;
pub mod render;
pub mod time;
pub mod core;
pub mod window;

pub mod logging;
