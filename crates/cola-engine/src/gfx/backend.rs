use anyhow::Result;

use super::handles::{ProgramHandle, VertexArrayHandle};
use super::objects::Objects;
use super::types::{Color, Topology, Viewport};

/// One recorded draw, with the state it was issued under.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub vertex_array: VertexArrayHandle,
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
    pub viewport: Viewport,
}

/// Commands recorded between two buffer swaps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FrameCommand {
    Clear(Color),
    Draw(DrawCall),
}

/// What a backend receives on `swap_buffers`.
pub struct FrameSubmission<'a> {
    pub commands: &'a [FrameCommand],
    pub objects: &'a Objects,
}

/// Turns recorded frames into pixels.
///
/// An `Err` from `present` means the target is gone for good; the owning
/// `Gl` reports itself lost and the runtime shuts the session down.
pub trait Backend {
    fn present(&mut self, frame: FrameSubmission<'_>) -> Result<()>;

    /// Called when the drawable changes size (physical pixels).
    fn resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}

/// Backend with no output. Frames are recorded and dropped.
#[derive(Debug, Default)]
pub struct HeadlessBackend;

impl Backend for HeadlessBackend {
    fn present(&mut self, frame: FrameSubmission<'_>) -> Result<()> {
        log::trace!("headless present: {} commands", frame.commands.len());
        Ok(())
    }
}
