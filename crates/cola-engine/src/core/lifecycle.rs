use crate::gfx::Gl;
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;

use super::app::{AppControl, Session};
use super::ctx::UpdateCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Created,
    Running,
    Closed,
}

/// Sequences a session's hooks independently of any windowing library.
///
/// Guarantees: `on_load` runs at most once and before anything else;
/// no hook runs after `on_unload`; `on_unload` runs exactly once for a
/// loaded session, however the session ends.
pub struct Lifecycle<S> {
    session: S,
    phase: Phase,
}

impl<S: Session> Lifecycle<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            phase: Phase::Created,
        }
    }

    pub fn load(&mut self, gl: &mut Gl<'_>) {
        if self.phase != Phase::Created {
            return;
        }
        self.session.on_load(gl);
        self.phase = Phase::Running;
        log::debug!("session loaded");
    }

    /// Runs one tick: update, then render unless update asked to exit.
    ///
    /// Returns `Exit` when the session should be shut down.
    pub fn frame(
        &mut self,
        gl: &mut Gl<'_>,
        input: &InputState,
        input_frame: &InputFrame,
        time: FrameTime,
    ) -> AppControl {
        if self.phase != Phase::Running {
            return AppControl::Exit;
        }

        let ctx = UpdateCtx {
            input,
            input_frame,
            time,
        };
        if self.session.on_update(&ctx) == AppControl::Exit {
            log::debug!("close requested at frame {}", time.frame_index);
            return AppControl::Exit;
        }

        self.session.on_render(gl, time);

        if gl.is_lost() {
            return AppControl::Exit;
        }
        AppControl::Continue
    }

    pub fn resize(&mut self, gl: &mut Gl<'_>, width: u32, height: u32) {
        if self.phase != Phase::Running {
            return;
        }
        self.session.on_resize(gl, width, height);
    }

    /// Unloads the session. Later calls are no-ops.
    pub fn shutdown(&mut self, gl: &mut Gl<'_>) {
        if self.phase == Phase::Running {
            self.session.on_unload(gl);
            log::debug!("session unloaded");
        }
        self.phase = Phase::Closed;
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn session(&self) -> &S {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, Key, KeyState};
    use crate::time::FrameClock;

    #[derive(Default)]
    struct Probe {
        calls: Vec<&'static str>,
    }

    impl Session for Probe {
        fn on_load(&mut self, _gl: &mut Gl<'_>) {
            self.calls.push("load");
        }

        fn on_update(&mut self, ctx: &UpdateCtx<'_>) -> AppControl {
            self.calls.push("update");
            if ctx.key_down(Key::Q) {
                AppControl::Exit
            } else {
                AppControl::Continue
            }
        }

        fn on_render(&mut self, _gl: &mut Gl<'_>, _time: FrameTime) {
            self.calls.push("render");
        }

        fn on_resize(&mut self, _gl: &mut Gl<'_>, _w: u32, _h: u32) {
            self.calls.push("resize");
        }

        fn on_unload(&mut self, _gl: &mut Gl<'_>) {
            self.calls.push("unload");
        }
    }

    fn tick(lc: &mut Lifecycle<Probe>, gl: &mut Gl<'_>, input: &InputState) -> AppControl {
        let frame = InputFrame::default();
        let time = FrameClock::new().tick();
        lc.frame(gl, input, &frame, time)
    }

    #[test]
    fn hooks_run_in_order() {
        let mut gl = Gl::headless();
        let input = InputState::default();
        let mut lc = Lifecycle::new(Probe::default());

        lc.load(&mut gl);
        lc.resize(&mut gl, 800, 600);
        assert_eq!(tick(&mut lc, &mut gl, &input), AppControl::Continue);
        lc.shutdown(&mut gl);

        assert_eq!(
            lc.session().calls,
            vec!["load", "resize", "update", "render", "unload"]
        );
    }

    #[test]
    fn exit_from_update_skips_render() {
        let mut gl = Gl::headless();
        let mut input = InputState::default();
        let mut scratch = InputFrame::default();
        input.apply_event(
            &mut scratch,
            InputEvent::Key { key: Key::Q, state: KeyState::Pressed, repeat: false },
        );
        let mut lc = Lifecycle::new(Probe::default());

        lc.load(&mut gl);
        assert_eq!(tick(&mut lc, &mut gl, &input), AppControl::Exit);
        lc.shutdown(&mut gl);

        assert_eq!(lc.session().calls, vec!["load", "update", "unload"]);
    }

    #[test]
    fn unload_runs_once_and_nothing_follows_it() {
        let mut gl = Gl::headless();
        let input = InputState::default();
        let mut lc = Lifecycle::new(Probe::default());

        lc.load(&mut gl);
        lc.shutdown(&mut gl);
        lc.shutdown(&mut gl);
        lc.resize(&mut gl, 10, 10);
        assert_eq!(tick(&mut lc, &mut gl, &input), AppControl::Exit);

        assert!(lc.is_closed());
        assert_eq!(lc.session().calls, vec!["load", "unload"]);
    }

    #[test]
    fn shutdown_before_load_skips_unload() {
        let mut gl = Gl::headless();
        let mut lc = Lifecycle::new(Probe::default());

        lc.shutdown(&mut gl);
        lc.load(&mut gl);

        assert!(lc.session().calls.is_empty());
        assert!(!lc.is_running());
    }
}
