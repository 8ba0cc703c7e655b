//! Time subsystem.
//!
//! Frame timing for the render loop, kept free of any runtime or GPU coupling:
//! - one `AnimationClock` per render loop
//! - call `tick()` once per rendered frame with the frame's timestamp

mod animation_clock;

pub use animation_clock::{brightness, AnimationClock};
