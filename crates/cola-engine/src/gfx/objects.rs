//! Object tables behind the handle API.
//!
//! Pure CPU bookkeeping shared by every backend. Backends read these tables
//! when a frame is presented; only `Gl` mutates them.

use std::collections::{BTreeMap, HashMap};

use super::handles::{BufferHandle, ProgramHandle, ShaderHandle, VertexArrayHandle};
use super::shader::link_interface;
use super::types::{BufferUsage, ShaderStage, VertexAttrib};

/// Contents of a buffer object.
#[derive(Debug, Default)]
pub struct BufferObject {
    data: Vec<u8>,
    usage: BufferUsage,
    generation: u64,
}

impl BufferObject {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Bumped on every upload; backends use it to invalidate GPU copies.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn upload(&mut self, data: &[u8], usage: BufferUsage) {
        self.data.clear();
        self.data.extend_from_slice(data);
        self.usage = usage;
        self.generation += 1;
    }
}

/// One attribute slot of a vertex array.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttribBinding {
    pub attrib: VertexAttrib,
    /// Array buffer bound when the pointer was specified.
    pub buffer: BufferHandle,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct VertexArrayObject {
    attribs: BTreeMap<u32, AttribBinding>,
    pending_enable: Vec<u32>,
    generation: u64,
}

impl VertexArrayObject {
    /// Enabled attributes ordered by location.
    pub fn enabled_attribs(&self) -> impl Iterator<Item = (u32, &AttribBinding)> {
        self.attribs
            .iter()
            .filter(|(_, b)| b.enabled)
            .map(|(loc, b)| (*loc, b))
    }

    pub fn attrib(&self, location: u32) -> Option<&AttribBinding> {
        self.attribs.get(&location)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_pointer(&mut self, location: u32, attrib: VertexAttrib, buffer: BufferHandle) {
        let enabled = self
            .attribs
            .get(&location)
            .map(|b| b.enabled)
            .unwrap_or_else(|| self.pending_enable.contains(&location));
        self.pending_enable.retain(|l| *l != location);
        self.attribs.insert(location, AttribBinding { attrib, buffer, enabled });
        self.generation += 1;
    }

    pub(crate) fn set_enabled(&mut self, location: u32, enabled: bool) {
        match self.attribs.get_mut(&location) {
            Some(binding) => binding.enabled = enabled,
            // Enabling before the pointer is specified is legal; remember it.
            None if enabled => self.pending_enable.push(location),
            None => self.pending_enable.retain(|l| *l != location),
        }
        self.generation += 1;
    }

    pub(crate) fn references(&self, buffer: BufferHandle) -> bool {
        self.attribs.values().any(|b| b.buffer == buffer)
    }
}

#[derive(Debug)]
pub struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    info_log: String,
    attachments: usize,
    delete_pending: bool,
}

impl ShaderObject {
    pub(crate) fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            source: String::new(),
            compiled: false,
            info_log: String::new(),
            attachments: 0,
            delete_pending: false,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compiled(&self) -> bool {
        self.compiled
    }

    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    pub(crate) fn set_source(&mut self, source: &str) {
        self.source = source.to_owned();
    }

    pub(crate) fn set_compile_result(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.compiled = true;
                self.info_log.clear();
            }
            Err(log) => {
                self.compiled = false;
                self.info_log = log;
            }
        }
    }
}

/// Stage sources captured at link time.
///
/// Later edits to the shader objects do not affect a linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedProgram {
    pub vertex_source: String,
    pub fragment_source: String,
}

#[derive(Debug, Default)]
pub struct ProgramObject {
    attached: Vec<ShaderHandle>,
    linked: Option<LinkedProgram>,
    info_log: String,
    generation: u64,
    delete_pending: bool,
}

impl ProgramObject {
    pub fn attached(&self) -> &[ShaderHandle] {
        &self.attached
    }

    pub fn linked(&self) -> Option<&LinkedProgram> {
        self.linked.as_ref()
    }

    pub fn link_status(&self) -> bool {
        self.linked.is_some()
    }

    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    /// Bumped on every link attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// All live objects of one `Gl` context.
#[derive(Debug, Default)]
pub struct Objects {
    buffers: HashMap<BufferHandle, BufferObject>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayObject>,
    shaders: HashMap<ShaderHandle, ShaderObject>,
    programs: HashMap<ProgramHandle, ProgramObject>,
}

impl Objects {
    pub fn buffer(&self, h: BufferHandle) -> Option<&BufferObject> {
        self.buffers.get(&h)
    }

    pub fn vertex_array(&self, h: VertexArrayHandle) -> Option<&VertexArrayObject> {
        self.vertex_arrays.get(&h)
    }

    pub fn shader(&self, h: ShaderHandle) -> Option<&ShaderObject> {
        self.shaders.get(&h)
    }

    pub fn program(&self, h: ProgramHandle) -> Option<&ProgramObject> {
        self.programs.get(&h)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub(crate) fn insert_buffer(&mut self, h: BufferHandle) {
        self.buffers.insert(h, BufferObject::default());
    }

    pub(crate) fn buffer_mut(&mut self, h: BufferHandle) -> Option<&mut BufferObject> {
        self.buffers.get_mut(&h)
    }

    pub(crate) fn remove_buffer(&mut self, h: BufferHandle) -> bool {
        self.buffers.remove(&h).is_some()
    }

    pub(crate) fn insert_vertex_array(&mut self, h: VertexArrayHandle) {
        self.vertex_arrays.insert(h, VertexArrayObject::default());
    }

    pub(crate) fn vertex_array_mut(&mut self, h: VertexArrayHandle) -> Option<&mut VertexArrayObject> {
        self.vertex_arrays.get_mut(&h)
    }

    pub(crate) fn remove_vertex_array(&mut self, h: VertexArrayHandle) -> bool {
        self.vertex_arrays.remove(&h).is_some()
    }

    pub(crate) fn insert_shader(&mut self, h: ShaderHandle, stage: ShaderStage) {
        self.shaders.insert(h, ShaderObject::new(stage));
    }

    pub(crate) fn shader_mut(&mut self, h: ShaderHandle) -> Option<&mut ShaderObject> {
        self.shaders.get_mut(&h)
    }

    /// Deletes a shader, or flags it while a program still holds it.
    pub(crate) fn delete_shader(&mut self, h: ShaderHandle) -> bool {
        let Some(shader) = self.shaders.get_mut(&h) else {
            return false;
        };
        if shader.attachments > 0 {
            shader.delete_pending = true;
        } else {
            self.shaders.remove(&h);
        }
        true
    }

    pub(crate) fn insert_program(&mut self, h: ProgramHandle) {
        self.programs.insert(h, ProgramObject::default());
    }

    pub(crate) fn attach(&mut self, program: ProgramHandle, shader: ShaderHandle) -> Result<(), String> {
        if !self.shaders.contains_key(&shader) {
            return Err(format!("{shader} does not exist"));
        }
        let prog = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("{program} does not exist"))?;
        if prog.attached.contains(&shader) {
            return Err(format!("{shader} is already attached to {program}"));
        }
        prog.attached.push(shader);
        if let Some(s) = self.shaders.get_mut(&shader) {
            s.attachments += 1;
        }
        Ok(())
    }

    pub(crate) fn detach(&mut self, program: ProgramHandle, shader: ShaderHandle) -> Result<(), String> {
        let prog = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("{program} does not exist"))?;
        let Some(pos) = prog.attached.iter().position(|s| *s == shader) else {
            return Err(format!("{shader} is not attached to {program}"));
        };
        prog.attached.remove(pos);
        self.release_shader(shader);
        Ok(())
    }

    fn release_shader(&mut self, shader: ShaderHandle) {
        let Some(s) = self.shaders.get_mut(&shader) else { return };
        s.attachments = s.attachments.saturating_sub(1);
        if s.attachments == 0 && s.delete_pending {
            self.shaders.remove(&shader);
        }
    }

    /// Links `program` from its attached shaders.
    ///
    /// Link succeeds with exactly one compiled vertex shader and one compiled
    /// fragment shader attached whose interfaces match. The program object
    /// survives a failed link.
    pub(crate) fn link(&mut self, program: ProgramHandle) -> Result<bool, String> {
        let attached = self
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .ok_or_else(|| format!("{program} does not exist"))?;

        let result = self.resolve_link(&attached);

        let Some(prog) = self.programs.get_mut(&program) else {
            return Err(format!("{program} does not exist"));
        };
        prog.generation += 1;
        match result {
            Ok(linked) => {
                prog.linked = Some(linked);
                prog.info_log.clear();
                Ok(true)
            }
            Err(log) => {
                prog.linked = None;
                prog.info_log = log;
                Ok(false)
            }
        }
    }

    fn resolve_link(&self, attached: &[ShaderHandle]) -> Result<LinkedProgram, String> {
        let mut vertex = None;
        let mut fragment = None;

        for handle in attached {
            let Some(shader) = self.shaders.get(handle) else { continue };
            if !shader.compiled {
                return Err(format!("{} shader ({handle}) is not compiled", shader.stage.name()));
            }
            let slot = match shader.stage {
                ShaderStage::Vertex => &mut vertex,
                ShaderStage::Fragment => &mut fragment,
            };
            if slot.is_some() {
                return Err(format!("more than one {} shader attached", shader.stage.name()));
            }
            *slot = Some(shader.source.clone());
        }

        match (vertex, fragment) {
            (Some(vertex_source), Some(fragment_source)) => {
                link_interface(&vertex_source, &fragment_source)?;
                Ok(LinkedProgram {
                    vertex_source,
                    fragment_source,
                })
            }
            (None, _) => Err("no Vertex shader attached".to_string()),
            (_, None) => Err("no Fragment shader attached".to_string()),
        }
    }

    /// Deletes a program, or flags it while it is still in use.
    ///
    /// Attached shaders are released either way once it is gone.
    pub(crate) fn delete_program(&mut self, h: ProgramHandle, in_use: bool) -> bool {
        let Some(prog) = self.programs.get_mut(&h) else {
            return false;
        };
        if in_use {
            prog.delete_pending = true;
            return true;
        }
        self.drop_program(h);
        true
    }

    /// Completes a deferred deletion once the program is no longer current.
    pub(crate) fn program_unbound(&mut self, h: ProgramHandle) {
        if self.programs.get(&h).is_some_and(|p| p.delete_pending) {
            self.drop_program(h);
        }
    }

    fn drop_program(&mut self, h: ProgramHandle) {
        if let Some(prog) = self.programs.remove(&h) {
            for shader in prog.attached {
                self.release_shader(shader);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    const VS: &str = "#version 450\nlayout(location = 0) in vec3 p;\nvoid main() { gl_Position = vec4(p, 1.0); }\n";
    const FS: &str = "#version 450\nlayout(location = 0) out vec4 c;\nvoid main() { c = vec4(1.0); }\n";

    fn ids() -> impl FnMut() -> NonZeroU32 {
        let mut next = 0u32;
        move || {
            next += 1;
            NonZeroU32::new(next).unwrap()
        }
    }

    fn compiled_shader(objects: &mut Objects, h: ShaderHandle, stage: ShaderStage, src: &str) {
        objects.insert_shader(h, stage);
        let shader = objects.shader_mut(h).unwrap();
        shader.set_source(src);
        shader.set_compile_result(Ok(()));
    }

    #[test]
    fn link_needs_both_stages() {
        let mut id = ids();
        let mut objects = Objects::default();
        let vs = ShaderHandle::from_id(id());
        let prog = ProgramHandle::from_id(id());

        compiled_shader(&mut objects, vs, ShaderStage::Vertex, "vs");
        objects.insert_program(prog);
        objects.attach(prog, vs).unwrap();

        assert_eq!(objects.link(prog), Ok(false));
        let p = objects.program(prog).unwrap();
        assert!(!p.link_status());
        assert!(p.info_log().contains("Fragment"));
    }

    #[test]
    fn link_captures_sources() {
        let mut id = ids();
        let mut objects = Objects::default();
        let vs = ShaderHandle::from_id(id());
        let fs = ShaderHandle::from_id(id());
        let prog = ProgramHandle::from_id(id());

        compiled_shader(&mut objects, vs, ShaderStage::Vertex, VS);
        compiled_shader(&mut objects, fs, ShaderStage::Fragment, FS);
        objects.insert_program(prog);
        objects.attach(prog, vs).unwrap();
        objects.attach(prog, fs).unwrap();

        assert_eq!(objects.link(prog), Ok(true));
        let linked = objects.program(prog).unwrap().linked().unwrap();
        assert_eq!(linked.vertex_source, VS);
        assert_eq!(linked.fragment_source, FS);
    }

    #[test]
    fn unmatched_fragment_input_fails_link() {
        let mut id = ids();
        let mut objects = Objects::default();
        let vs = ShaderHandle::from_id(id());
        let fs = ShaderHandle::from_id(id());
        let prog = ProgramHandle::from_id(id());

        let reads_color = "#version 450\nlayout(location = 0) in vec3 v_color;\nlayout(location = 0) out vec4 c;\nvoid main() { c = vec4(v_color, 1.0); }\n";
        compiled_shader(&mut objects, vs, ShaderStage::Vertex, VS);
        compiled_shader(&mut objects, fs, ShaderStage::Fragment, reads_color);
        objects.insert_program(prog);
        objects.attach(prog, vs).unwrap();
        objects.attach(prog, fs).unwrap();

        assert_eq!(objects.link(prog), Ok(false));
        let p = objects.program(prog).unwrap();
        assert!(!p.link_status());
        assert!(p.info_log().contains("location 0"));
    }

    #[test]
    fn uncompiled_shader_fails_link() {
        let mut id = ids();
        let mut objects = Objects::default();
        let vs = ShaderHandle::from_id(id());
        let fs = ShaderHandle::from_id(id());
        let prog = ProgramHandle::from_id(id());

        compiled_shader(&mut objects, vs, ShaderStage::Vertex, "vs");
        objects.insert_shader(fs, ShaderStage::Fragment);
        objects
            .shader_mut(fs)
            .unwrap()
            .set_compile_result(Err("syntax error".into()));
        objects.insert_program(prog);
        objects.attach(prog, vs).unwrap();
        objects.attach(prog, fs).unwrap();

        assert_eq!(objects.link(prog), Ok(false));
        assert!(objects.program(prog).unwrap().info_log().contains("not compiled"));
    }

    #[test]
    fn attached_shader_deletion_is_deferred_until_detach() {
        let mut id = ids();
        let mut objects = Objects::default();
        let vs = ShaderHandle::from_id(id());
        let prog = ProgramHandle::from_id(id());

        compiled_shader(&mut objects, vs, ShaderStage::Vertex, "vs");
        objects.insert_program(prog);
        objects.attach(prog, vs).unwrap();

        assert!(objects.delete_shader(vs));
        assert_eq!(objects.shader_count(), 1);

        objects.detach(prog, vs).unwrap();
        assert_eq!(objects.shader_count(), 0);
    }

    #[test]
    fn program_in_use_is_deleted_on_unbind() {
        let mut id = ids();
        let mut objects = Objects::default();
        let prog = ProgramHandle::from_id(id());
        objects.insert_program(prog);

        assert!(objects.delete_program(prog, true));
        assert_eq!(objects.program_count(), 1);

        objects.program_unbound(prog);
        assert_eq!(objects.program_count(), 0);
    }

    #[test]
    fn enable_before_pointer_is_remembered() {
        let mut id = ids();
        let buf = BufferHandle::from_id(id());
        let mut vao = VertexArrayObject::default();

        vao.set_enabled(0, true);
        vao.set_pointer(0, VertexAttrib::floats(3), buf);

        let enabled: Vec<_> = vao.enabled_attribs().map(|(loc, _)| loc).collect();
        assert_eq!(enabled, vec![0]);
        assert!(vao.references(buf));
    }
}
