use crate::input::{InputFrame, InputState, Key};
use crate::time::FrameTime;

/// Per-tick context passed to `Session::on_update`.
pub struct UpdateCtx<'a> {
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
}

impl UpdateCtx<'_> {
    /// True while `key` is held.
    pub fn key_down(&self, key: Key) -> bool {
        self.input.key_down(key)
    }

    /// True if `key` went down since the previous tick.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.input_frame.key_pressed(key)
    }
}
