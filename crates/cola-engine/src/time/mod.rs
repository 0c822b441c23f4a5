//! Frame timing.
//!
//! One `FrameClock` per window; `tick()` once per update/render pair.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
