use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppControl, Lifecycle, Session};
use crate::device::{Gpu, GpuInit};
use crate::gfx::{Gl, WgpuBackend};
use crate::input::{InputEvent, InputFrame, InputState};
use crate::time::FrameClock;

use super::keymap::translate_key_event;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cola".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            resizable: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `session` until it closes.
    ///
    /// Returns after `on_unload` has run. Errors come from platform setup
    /// (event loop, window, GPU), never from the session.
    pub fn run<S>(config: RuntimeConfig, gpu_init: GpuInit, session: S) -> Result<()>
    where
        S: Session + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, session);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.setup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gl: Gl<'this>,
}

struct AppState<S>
where
    S: Session + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    lifecycle: Lifecycle<S>,

    entry: Option<WindowEntry>,
    setup_error: Option<anyhow::Error>,
}

impl<S> AppState<S>
where
    S: Session + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, session: S) -> Self {
        Self {
            config,
            gpu_init,
            lifecycle: Lifecycle::new(session),
            entry: None,
            setup_error: None,
        }
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        WindowEntryTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gl_builder: |w| {
                let gpu = pollster::block_on(Gpu::new(w, gpu_init))
                    .context("GPU initialization failed for window")?;
                Ok::<_, anyhow::Error>(Gl::new(WgpuBackend::new(gpu)))
            },
        }
        .try_build()
    }

    /// Unloads the session, then drops the window and its GPU state.
    fn unload(&mut self) {
        let (lifecycle, entry) = (&mut self.lifecycle, &mut self.entry);

        if let Some(entry) = entry.as_mut() {
            entry.with_gl_mut(|gl| lifecycle.shutdown(gl));
        }
        self.entry = None;
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.unload();
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (lifecycle, Some(entry)) = (&mut self.lifecycle, self.entry.as_mut()) else {
            return;
        };

        entry.with_mut(|fields| {
            fields.gl.resize_surface(size.width, size.height);
            lifecycle.resize(fields.gl, size.width, size.height);
            fields.window.request_redraw();
        });
    }

    /// Runs one update/render tick. Returns the session's verdict.
    fn tick(&mut self) -> AppControl {
        let (lifecycle, Some(entry)) = (&mut self.lifecycle, self.entry.as_mut()) else {
            return AppControl::Exit;
        };

        entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let control = lifecycle.frame(fields.gl, fields.input_state, fields.input_frame, time);

            // Per-tick deltas are consumed.
            fields.input_frame.clear();
            control
        })
    }
}

impl<S> ApplicationHandler for AppState<S>
where
    S: Session + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.lifecycle.is_closed() {
            return;
        }

        let entry = match self.create_window_entry(event_loop) {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.setup_error = Some(e);
                event_loop.exit();
                return;
            }
        };
        let entry = self.entry.insert(entry);

        let lifecycle = &mut self.lifecycle;
        entry.with_mut(|fields| {
            lifecycle.load(fields.gl);

            let size = fields.window.inner_size();
            lifecycle.resize(fields.gl, size.width, size.height);

            fields.window.request_redraw();
        });
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the session renders every tick.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let input = match &event {
            WindowEvent::KeyboardInput { event, .. } => Some(translate_key_event(event)),
            WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),
            _ => None,
        };
        if let (Some(ev), Some(entry)) = (input, self.entry.as_mut()) {
            entry.with_mut(|fields| fields.input_state.apply_event(fields.input_frame, ev));
        }

        match event {
            WindowEvent::CloseRequested => {
                log::debug!("window close requested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => {
                if self.tick() == AppControl::Exit {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Exits not initiated by us (e.g. the platform tearing the loop down).
        self.unload();
    }
}
