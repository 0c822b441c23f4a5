//! Handle-based graphics API.
//!
//! `Gl` exposes GL-style calls (create/bind/upload/compile/link/draw) over
//! opaque integer handles. Objects live in CPU-side tables; draws are
//! recorded per frame and handed to a `Backend` on `swap_buffers`.
//!
//! Backends:
//! - `WgpuBackend` renders through wgpu onto a window surface
//! - `HeadlessBackend` discards frames (tests, tooling)

mod backend;
mod context;
mod handles;
mod objects;
mod shader;
mod types;
mod wgpu_backend;

pub use backend::{Backend, DrawCall, FrameCommand, FrameSubmission, HeadlessBackend};
pub use context::Gl;
pub use handles::{BufferHandle, ProgramHandle, ShaderHandle, VertexArrayHandle};
pub use objects::{
    AttribBinding, BufferObject, LinkedProgram, Objects, ProgramObject, ShaderObject,
    VertexArrayObject,
};
pub use types::{AttribType, BufferUsage, Color, ShaderStage, Topology, VertexAttrib, Viewport};
pub use wgpu_backend::WgpuBackend;
