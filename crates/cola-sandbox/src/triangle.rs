use std::borrow::Cow;

use cola_engine::core::{AppControl, Session, UpdateCtx};
use cola_engine::gfx::{
    BufferHandle, BufferUsage, Color, Gl, ProgramHandle, ShaderHandle, ShaderStage, Topology,
    VertexArrayHandle, VertexAttrib,
};
use cola_engine::input::Key;
use cola_engine::time::FrameTime;

use crate::shaders;

/// Three `(x, y, z)` corners in clip space.
pub const TRIANGLE_VERTICES: [f32; 9] = [
    0.0, 0.5, 0.0, //
    0.5, -0.5, 0.0, //
    -0.5, -0.5, 0.0,
];

const POSITION_LOCATION: u32 = 0;

/// Outcome of one shader compile, as read back from the info log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReport {
    pub stage: ShaderStage,
    pub outcome: CompileOutcome,
}

impl ShaderReport {
    /// An empty info log means success.
    fn from_info_log(stage: ShaderStage, info_log: String) -> Self {
        let outcome = if info_log.is_empty() {
            CompileOutcome::Compiled
        } else {
            CompileOutcome::Failed(info_log)
        };
        Self { stage, outcome }
    }

    /// Console text, without the level prefix.
    pub fn message(&self) -> String {
        match &self.outcome {
            CompileOutcome::Compiled => format!("{} shader compiled successfully.", self.stage.name()),
            CompileOutcome::Failed(info) => format!("{} shader compile error: {info}", self.stage.name()),
        }
    }

    /// Failures go out as errors, successes as info.
    pub fn level(&self) -> log::Level {
        match self.outcome {
            CompileOutcome::Compiled => log::Level::Info,
            CompileOutcome::Failed(_) => log::Level::Error,
        }
    }

    fn emit(&self) {
        log::log!(self.level(), "{}", self.message());
    }
}

/// Draws one static yellow triangle on black until Escape is pressed.
pub struct TriangleSession {
    vertex_source: Cow<'static, str>,
    fragment_source: Cow<'static, str>,

    vertex_buffer: Option<BufferHandle>,
    vertex_array: Option<VertexArrayHandle>,
    program: Option<ProgramHandle>,

    reports: Vec<ShaderReport>,
}

impl TriangleSession {
    pub fn new() -> Self {
        Self::with_shaders(shaders::VERTEX, shaders::FRAGMENT)
    }

    pub fn with_shaders(
        vertex_source: impl Into<Cow<'static, str>>,
        fragment_source: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            vertex_buffer: None,
            vertex_array: None,
            program: None,
            reports: Vec::new(),
        }
    }

    /// Compile outcomes from the last `on_load`, vertex stage first.
    pub fn reports(&self) -> &[ShaderReport] {
        &self.reports
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.vertex_buffer
    }

    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertex_array
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    fn compile_stage(&mut self, gl: &mut Gl<'_>, stage: ShaderStage) -> ShaderHandle {
        let source = match stage {
            ShaderStage::Vertex => &self.vertex_source,
            ShaderStage::Fragment => &self.fragment_source,
        };

        let shader = gl.create_shader(stage);
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        // Failures are reported and otherwise ignored; linking goes ahead.
        let report = ShaderReport::from_info_log(stage, gl.shader_info_log(shader));
        report.emit();
        self.reports.push(report);

        shader
    }
}

impl Default for TriangleSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for TriangleSession {
    fn on_load(&mut self, gl: &mut Gl<'_>) {
        gl.clear_color(Color::BLACK);

        let vertex_buffer = gl.create_buffer();
        gl.bind_array_buffer(Some(vertex_buffer));
        gl.buffer_data(&TRIANGLE_VERTICES, BufferUsage::StaticDraw);
        gl.bind_array_buffer(None);

        let vertex_array = gl.create_vertex_array();
        gl.bind_vertex_array(Some(vertex_array));
        gl.bind_array_buffer(Some(vertex_buffer));
        let stride = 3 * std::mem::size_of::<f32>() as u32;
        gl.vertex_attrib_pointer(POSITION_LOCATION, VertexAttrib::floats(3).with_stride(stride));
        gl.enable_vertex_attrib(POSITION_LOCATION);
        gl.bind_vertex_array(None);

        self.reports.clear();
        let vertex_shader = self.compile_stage(gl, ShaderStage::Vertex);
        let fragment_shader = self.compile_stage(gl, ShaderStage::Fragment);

        let program = gl.create_program();
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);
        if !gl.program_link_status(program) {
            log::debug!("program link failed: {}", gl.program_info_log(program));
        }

        gl.detach_shader(program, vertex_shader);
        gl.detach_shader(program, fragment_shader);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        self.vertex_buffer = Some(vertex_buffer);
        self.vertex_array = Some(vertex_array);
        self.program = Some(program);
    }

    fn on_update(&mut self, ctx: &UpdateCtx<'_>) -> AppControl {
        if ctx.key_down(Key::Escape) {
            log::debug!("escape held, closing");
            return AppControl::Exit;
        }
        AppControl::Continue
    }

    fn on_render(&mut self, gl: &mut Gl<'_>, _time: FrameTime) {
        gl.clear();

        gl.use_program(self.program);
        gl.bind_vertex_array(self.vertex_array);
        gl.draw_arrays(Topology::Triangles, 0, 3);

        gl.swap_buffers();
    }

    fn on_resize(&mut self, gl: &mut Gl<'_>, width: u32, height: u32) {
        gl.viewport(0, 0, width, height);
    }

    fn on_unload(&mut self, gl: &mut Gl<'_>) {
        gl.bind_array_buffer(None);
        if let Some(buffer) = self.vertex_buffer.take() {
            gl.delete_buffer(buffer);
        }

        gl.use_program(None);
        if let Some(program) = self.program.take() {
            gl.delete_program(program);
        }

        // The vertex array is left to the context.
    }
}

#[cfg(test)]
mod tests {
    use cola_engine::core::Lifecycle;
    use cola_engine::gfx::{DrawCall, FrameCommand, Viewport};
    use cola_engine::input::{InputEvent, InputFrame, InputState, KeyState};
    use cola_engine::time::FrameClock;

    use super::*;

    fn loaded(session: TriangleSession) -> (Gl<'static>, Lifecycle<TriangleSession>) {
        let mut gl = Gl::headless();
        let mut lifecycle = Lifecycle::new(session);
        lifecycle.load(&mut gl);
        (gl, lifecycle)
    }

    fn tick(gl: &mut Gl<'_>, lifecycle: &mut Lifecycle<TriangleSession>, input: &InputState) -> AppControl {
        let frame = InputFrame::default();
        lifecycle.frame(gl, input, &frame, FrameClock::new().tick())
    }

    fn escape_held() -> InputState {
        let mut input = InputState::default();
        let mut frame = InputFrame::default();
        input.apply_event(
            &mut frame,
            InputEvent::Key { key: Key::Escape, state: KeyState::Pressed, repeat: false },
        );
        input
    }

    #[test]
    fn buffer_holds_the_fixed_triangle() {
        let (gl, lifecycle) = loaded(TriangleSession::new());
        let buffer = lifecycle.session().vertex_buffer().unwrap();

        let data: &[f32] = bytemuck::cast_slice(gl.objects().buffer(buffer).unwrap().data());
        assert_eq!(data, &[0.0, 0.5, 0.0, 0.5, -0.5, 0.0, -0.5, -0.5, 0.0]);
    }

    #[test]
    fn load_leaves_one_of_each_object_and_no_shaders() {
        let (gl, lifecycle) = loaded(TriangleSession::new());
        let session = lifecycle.session();

        assert_eq!(gl.objects().buffer_count(), 1);
        assert_eq!(gl.objects().vertex_array_count(), 1);
        assert_eq!(gl.objects().program_count(), 1);
        assert_eq!(gl.objects().shader_count(), 0);
        assert!(gl.program_link_status(session.program().unwrap()));

        assert_eq!(gl.current_clear_color(), Color::BLACK);
        assert_eq!(gl.bound_vertex_array(), None);
        assert_eq!(gl.bound_array_buffer(), Some(session.vertex_buffer().unwrap()));
    }

    #[test]
    fn vertex_array_reads_packed_positions_at_location_zero() {
        let (gl, lifecycle) = loaded(TriangleSession::new());
        let session = lifecycle.session();
        let vao = gl.objects().vertex_array(session.vertex_array().unwrap()).unwrap();

        let binding = vao.attrib(0).unwrap();
        assert!(binding.enabled);
        assert_eq!(binding.buffer, session.vertex_buffer().unwrap());
        assert_eq!(binding.attrib, VertexAttrib::floats(3).with_stride(12));
    }

    #[test]
    fn both_shaders_report_success() {
        let (_gl, lifecycle) = loaded(TriangleSession::new());
        let messages: Vec<String> = lifecycle.session().reports().iter().map(|r| r.message()).collect();

        assert_eq!(
            messages,
            vec![
                "Vertex shader compiled successfully.".to_string(),
                "Fragment shader compiled successfully.".to_string(),
            ]
        );
    }

    #[test]
    fn failed_compile_reports_at_error_level() {
        let compiled = ShaderReport { stage: ShaderStage::Vertex, outcome: CompileOutcome::Compiled };
        assert_eq!(compiled.level(), log::Level::Info);

        let failed = ShaderReport {
            stage: ShaderStage::Fragment,
            outcome: CompileOutcome::Failed("0:3: unexpected token".into()),
        };
        assert_eq!(failed.level(), log::Level::Error);
        assert_eq!(failed.message(), "Fragment shader compile error: 0:3: unexpected token");
    }

    #[test]
    fn one_frame_is_one_triangle_draw() {
        let (mut gl, mut lifecycle) = loaded(TriangleSession::new());
        lifecycle.resize(&mut gl, 800, 600);

        assert_eq!(tick(&mut gl, &mut lifecycle, &InputState::default()), AppControl::Continue);

        let session = lifecycle.session();
        assert_eq!(gl.frames_presented(), 1);
        assert_eq!(
            gl.last_frame(),
            &[
                FrameCommand::Clear(Color::BLACK),
                FrameCommand::Draw(DrawCall {
                    program: session.program().unwrap(),
                    vertex_array: session.vertex_array().unwrap(),
                    topology: Topology::Triangles,
                    first: 0,
                    count: 3,
                    viewport: Viewport::new(0, 0, 800, 600),
                }),
            ]
        );
    }

    #[test]
    fn resize_sets_full_window_viewport() {
        let (mut gl, mut lifecycle) = loaded(TriangleSession::new());
        gl.viewport(17, 23, 5, 5);

        lifecycle.resize(&mut gl, 1024, 768);
        assert_eq!(gl.current_viewport(), Viewport::new(0, 0, 1024, 768));

        lifecycle.resize(&mut gl, 320, 200);
        assert_eq!(gl.current_viewport(), Viewport::new(0, 0, 320, 200));
    }

    #[test]
    fn escape_closes_without_rendering() {
        let (mut gl, mut lifecycle) = loaded(TriangleSession::new());

        assert_eq!(tick(&mut gl, &mut lifecycle, &escape_held()), AppControl::Exit);
        assert_eq!(gl.frames_presented(), 0);
    }

    #[test]
    fn unload_frees_buffer_and_program_but_not_vertex_array() {
        let (mut gl, mut lifecycle) = loaded(TriangleSession::new());
        tick(&mut gl, &mut lifecycle, &InputState::default());

        lifecycle.shutdown(&mut gl);

        assert_eq!(gl.objects().buffer_count(), 0);
        assert_eq!(gl.objects().program_count(), 0);
        assert_eq!(gl.objects().vertex_array_count(), 1);
        assert_eq!(gl.current_program(), None);
        assert_eq!(gl.bound_array_buffer(), None);
    }

    #[test]
    fn escape_path_still_unloads() {
        let (mut gl, mut lifecycle) = loaded(TriangleSession::new());

        if tick(&mut gl, &mut lifecycle, &escape_held()) == AppControl::Exit {
            lifecycle.shutdown(&mut gl);
        }

        assert!(lifecycle.is_closed());
        assert_eq!(gl.objects().buffer_count(), 0);
        assert_eq!(gl.objects().program_count(), 0);
    }

    #[test]
    fn malformed_shader_is_reported_and_not_fatal() {
        let broken = "#version 450\nvoid main() { gl_Position = vec4(1.0, ; }\n";
        let (mut gl, mut lifecycle) = loaded(TriangleSession::with_shaders(broken, shaders::FRAGMENT));

        let session = lifecycle.session();
        let program = session.program().unwrap();
        assert!(gl.objects().program(program).is_some());
        assert!(!gl.program_link_status(program));
        assert_eq!(gl.objects().shader_count(), 0);

        let report = &session.reports()[0];
        assert_eq!(report.stage, ShaderStage::Vertex);
        let CompileOutcome::Failed(info) = &report.outcome else {
            panic!("expected a compile failure, got {:?}", report.outcome);
        };
        assert!(!info.is_empty());
        assert_eq!(report.message(), format!("Vertex shader compile error: {info}"));
        assert_eq!(session.reports()[1].outcome, CompileOutcome::Compiled);

        // Rendering with the unlinked program still runs.
        lifecycle.resize(&mut gl, 800, 600);
        assert_eq!(tick(&mut gl, &mut lifecycle, &InputState::default()), AppControl::Continue);
        assert_eq!(gl.frames_presented(), 1);
    }

    #[test]
    fn unwritten_varying_fails_link_without_crashing() {
        let reads_color = "#version 450
layout(location = 0) in vec3 v_color;
layout(location = 0) out vec4 out_color;
void main() {
    out_color = vec4(v_color, 1.0);
}
";
        let (mut gl, mut lifecycle) = loaded(TriangleSession::with_shaders(shaders::VERTEX, reads_color));

        let session = lifecycle.session();
        assert!(session.reports().iter().all(|r| r.outcome == CompileOutcome::Compiled));

        let program = session.program().unwrap();
        assert!(!gl.program_link_status(program));
        assert!(gl.program_info_log(program).contains("location 0"));

        lifecycle.resize(&mut gl, 800, 600);
        assert_eq!(tick(&mut gl, &mut lifecycle, &InputState::default()), AppControl::Continue);
        assert_eq!(gl.frames_presented(), 1);
    }
}
