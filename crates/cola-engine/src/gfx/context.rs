use std::fmt;

use bytemuck::Pod;

use super::backend::{Backend, DrawCall, FrameCommand, FrameSubmission, HeadlessBackend};
use super::handles::{BufferHandle, HandleAllocator, ProgramHandle, ShaderHandle, VertexArrayHandle};
use super::objects::Objects;
use super::shader::compile_glsl;
use super::types::{BufferUsage, Color, ShaderStage, Topology, VertexAttrib, Viewport};

/// Handle-based immediate-mode graphics context.
///
/// Calls never return errors. Misuse (unknown handle, missing binding) is
/// logged at `warn` and the call is ignored. Draws are recorded and handed
/// to the backend on `swap_buffers`.
pub struct Gl<'b> {
    ids: HandleAllocator,
    objects: Objects,

    clear_color: Color,
    viewport: Viewport,
    array_buffer: Option<BufferHandle>,
    vertex_array: Option<VertexArrayHandle>,
    program: Option<ProgramHandle>,

    pending: Vec<FrameCommand>,
    last_frame: Vec<FrameCommand>,
    frames_presented: u64,
    lost: bool,

    backend: Box<dyn Backend + 'b>,
}

impl<'b> Gl<'b> {
    pub fn new(backend: impl Backend + 'b) -> Self {
        Self {
            ids: HandleAllocator::default(),
            objects: Objects::default(),
            clear_color: Color::default(),
            viewport: Viewport::default(),
            array_buffer: None,
            vertex_array: None,
            program: None,
            pending: Vec::new(),
            last_frame: Vec::new(),
            frames_presented: 0,
            lost: false,
            backend: Box::new(backend),
        }
    }

    // ── global state ──────────────────────────────────────────────────────

    pub fn clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Clears the color buffer with the current clear color.
    pub fn clear(&mut self) {
        self.pending.push(FrameCommand::Clear(self.clear_color));
    }

    pub fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = Viewport::new(x, y, width, height);
    }

    // ── buffers ───────────────────────────────────────────────────────────

    pub fn create_buffer(&mut self) -> BufferHandle {
        let h = BufferHandle::from_id(self.ids.next());
        self.objects.insert_buffer(h);
        h
    }

    pub fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) {
        if let Some(h) = buffer {
            if self.objects.buffer(h).is_none() {
                return invalid("bind_array_buffer", format_args!("{h} does not exist"));
            }
        }
        self.array_buffer = buffer;
    }

    /// Replaces the contents of the bound array buffer.
    pub fn buffer_data<T: Pod>(&mut self, data: &[T], usage: BufferUsage) {
        let Some(h) = self.array_buffer else {
            return invalid("buffer_data", "no array buffer bound");
        };
        match self.objects.buffer_mut(h) {
            Some(buffer) => buffer.upload(bytemuck::cast_slice(data), usage),
            None => invalid("buffer_data", format_args!("{h} does not exist")),
        }
    }

    pub fn delete_buffer(&mut self, buffer: BufferHandle) {
        if !self.objects.remove_buffer(buffer) {
            return invalid("delete_buffer", format_args!("{buffer} does not exist"));
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if let Some(vao) = self.vertex_array.and_then(|h| self.objects.vertex_array(h)) {
            if vao.references(buffer) {
                log::debug!("{buffer} deleted while the bound vertex array still reads from it");
            }
        }
    }

    // ── vertex arrays ─────────────────────────────────────────────────────

    pub fn create_vertex_array(&mut self) -> VertexArrayHandle {
        let h = VertexArrayHandle::from_id(self.ids.next());
        self.objects.insert_vertex_array(h);
        h
    }

    pub fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        if let Some(h) = vertex_array {
            if self.objects.vertex_array(h).is_none() {
                return invalid("bind_vertex_array", format_args!("{h} does not exist"));
            }
        }
        self.vertex_array = vertex_array;
    }

    /// Points `location` of the bound vertex array at the bound array buffer.
    pub fn vertex_attrib_pointer(&mut self, location: u32, attrib: VertexAttrib) {
        if !(1..=4).contains(&attrib.components) {
            return invalid(
                "vertex_attrib_pointer",
                format_args!("{} components is out of range 1..=4", attrib.components),
            );
        }
        let Some(vao) = self.vertex_array else {
            return invalid("vertex_attrib_pointer", "no vertex array bound");
        };
        let Some(buffer) = self.array_buffer else {
            return invalid("vertex_attrib_pointer", "no array buffer bound");
        };
        if let Some(obj) = self.objects.vertex_array_mut(vao) {
            obj.set_pointer(location, attrib, buffer);
        }
    }

    pub fn enable_vertex_attrib(&mut self, location: u32) {
        self.set_attrib_enabled("enable_vertex_attrib", location, true);
    }

    pub fn disable_vertex_attrib(&mut self, location: u32) {
        self.set_attrib_enabled("disable_vertex_attrib", location, false);
    }

    fn set_attrib_enabled(&mut self, op: &str, location: u32, enabled: bool) {
        let Some(vao) = self.vertex_array else {
            return invalid(op, "no vertex array bound");
        };
        if let Some(obj) = self.objects.vertex_array_mut(vao) {
            obj.set_enabled(location, enabled);
        }
    }

    pub fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if !self.objects.remove_vertex_array(vertex_array) {
            return invalid("delete_vertex_array", format_args!("{vertex_array} does not exist"));
        }
        if self.vertex_array == Some(vertex_array) {
            self.vertex_array = None;
        }
    }

    // ── shaders ───────────────────────────────────────────────────────────

    pub fn create_shader(&mut self, stage: ShaderStage) -> ShaderHandle {
        let h = ShaderHandle::from_id(self.ids.next());
        self.objects.insert_shader(h, stage);
        h
    }

    pub fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        match self.objects.shader_mut(shader) {
            Some(s) => s.set_source(source),
            None => invalid("shader_source", format_args!("{shader} does not exist")),
        }
    }

    pub fn compile_shader(&mut self, shader: ShaderHandle) {
        let Some(s) = self.objects.shader_mut(shader) else {
            return invalid("compile_shader", format_args!("{shader} does not exist"));
        };
        let result = compile_glsl(s.stage(), s.source());
        s.set_compile_result(result);
    }

    pub fn shader_compiled(&self, shader: ShaderHandle) -> bool {
        self.objects.shader(shader).is_some_and(|s| s.compiled())
    }

    /// Compiler output of the last compile; empty on success.
    pub fn shader_info_log(&self, shader: ShaderHandle) -> String {
        match self.objects.shader(shader) {
            Some(s) => s.info_log().to_owned(),
            None => {
                invalid("shader_info_log", format_args!("{shader} does not exist"));
                String::new()
            }
        }
    }

    pub fn delete_shader(&mut self, shader: ShaderHandle) {
        if !self.objects.delete_shader(shader) {
            invalid("delete_shader", format_args!("{shader} does not exist"));
        }
    }

    // ── programs ──────────────────────────────────────────────────────────

    pub fn create_program(&mut self) -> ProgramHandle {
        let h = ProgramHandle::from_id(self.ids.next());
        self.objects.insert_program(h);
        h
    }

    pub fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Err(msg) = self.objects.attach(program, shader) {
            invalid("attach_shader", msg);
        }
    }

    pub fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Err(msg) = self.objects.detach(program, shader) {
            invalid("detach_shader", msg);
        }
    }

    pub fn link_program(&mut self, program: ProgramHandle) {
        match self.objects.link(program) {
            Ok(true) => log::debug!("{program} linked"),
            Ok(false) => log::debug!(
                "{program} failed to link: {}",
                self.objects.program(program).map(|p| p.info_log()).unwrap_or_default()
            ),
            Err(msg) => invalid("link_program", msg),
        }
    }

    pub fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.objects.program(program).is_some_and(|p| p.link_status())
    }

    pub fn program_info_log(&self, program: ProgramHandle) -> String {
        self.objects
            .program(program)
            .map(|p| p.info_log().to_owned())
            .unwrap_or_default()
    }

    pub fn use_program(&mut self, program: Option<ProgramHandle>) {
        if let Some(h) = program {
            if self.objects.program(h).is_none() {
                return invalid("use_program", format_args!("{h} does not exist"));
            }
        }
        let previous = std::mem::replace(&mut self.program, program);
        if let Some(prev) = previous.filter(|p| Some(*p) != program) {
            self.objects.program_unbound(prev);
        }
    }

    pub fn delete_program(&mut self, program: ProgramHandle) {
        let in_use = self.program == Some(program);
        if !self.objects.delete_program(program, in_use) {
            invalid("delete_program", format_args!("{program} does not exist"));
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Records a draw of `count` vertices starting at `first`.
    pub fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        let Some(program) = self.program else {
            return invalid("draw_arrays", "no program in use");
        };
        let Some(vertex_array) = self.vertex_array else {
            return invalid("draw_arrays", "no vertex array bound");
        };
        self.pending.push(FrameCommand::Draw(DrawCall {
            program,
            vertex_array,
            topology,
            first,
            count,
            viewport: self.viewport,
        }));
    }

    /// Presents everything recorded since the previous swap.
    pub fn swap_buffers(&mut self) {
        let commands = std::mem::take(&mut self.pending);

        let submission = FrameSubmission {
            commands: &commands,
            objects: &self.objects,
        };
        if let Err(err) = self.backend.present(submission) {
            log::error!("present failed: {err:#}");
            self.lost = true;
        }

        self.last_frame = commands;
        self.frames_presented += 1;
    }

    /// Forwards a drawable resize to the backend.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    // ── introspection ─────────────────────────────────────────────────────

    pub fn objects(&self) -> &Objects {
        &self.objects
    }

    pub fn current_viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn current_clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn bound_array_buffer(&self) -> Option<BufferHandle> {
        self.array_buffer
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertex_array
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Commands of the most recently presented frame.
    pub fn last_frame(&self) -> &[FrameCommand] {
        &self.last_frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// True once the backend reported an unrecoverable present failure.
    pub fn is_lost(&self) -> bool {
        self.lost
    }
}

impl Gl<'static> {
    /// Context with no output, for tests and tooling.
    pub fn headless() -> Self {
        Self::new(HeadlessBackend)
    }
}

fn invalid(op: &str, msg: impl fmt::Display) {
    log::warn!("{op}: {msg}");
}
