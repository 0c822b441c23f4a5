use crate::gfx::Gl;
use crate::time::FrameTime;

use super::ctx::UpdateCtx;

/// Control directive returned by `Session::on_update`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    /// Close the window. The runtime still runs `on_unload` before exiting.
    Exit,
}

/// Lifecycle hooks of one window session.
///
/// The runtime calls them on the thread owning the graphics context:
/// `on_load` once, then `on_update` + `on_render` every tick with
/// `on_resize` whenever the drawable changes size, and `on_unload` once at
/// the end.
pub trait Session {
    fn on_load(&mut self, gl: &mut Gl<'_>);

    fn on_update(&mut self, ctx: &UpdateCtx<'_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }

    fn on_render(&mut self, gl: &mut Gl<'_>, time: FrameTime);

    /// New drawable size in physical pixels.
    fn on_resize(&mut self, gl: &mut Gl<'_>, width: u32, height: u32) {
        let _ = (gl, width, height);
    }

    fn on_unload(&mut self, gl: &mut Gl<'_>) {
        let _ = gl;
    }
}
