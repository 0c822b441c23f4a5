//! Cola engine crate.
//!
//! Platform + GPU runtime pieces: a winit window runtime driving a session's
//! lifecycle hooks, and a handle-based graphics API rendered through wgpu.

pub mod core;
pub mod device;
pub mod gfx;
pub mod input;
pub mod logging;
pub mod time;
pub mod window;
