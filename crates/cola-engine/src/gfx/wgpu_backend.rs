//! wgpu backend.
//!
//! GPU copies of buffers and render pipelines are created lazily the first
//! time a presented frame needs them, and dropped once their objects are gone.

use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::{Gpu, SurfaceErrorAction};

use super::backend::{Backend, DrawCall, FrameCommand, FrameSubmission};
use super::handles::{BufferHandle, ProgramHandle, VertexArrayHandle};
use super::objects::{LinkedProgram, Objects, VertexArrayObject};
use super::types::{Color, ShaderStage, Topology};

pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    generation: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramHandle,
    program_generation: u64,
    vertex_array: VertexArrayHandle,
    layout_generation: u64,
    topology: Topology,
    format: wgpu::TextureFormat,
}

/// One vertex buffer slot derived from a vertex array.
#[derive(Debug, Clone, PartialEq)]
struct VertexStream {
    buffer: BufferHandle,
    base_offset: u64,
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexStream {
    /// Whether vertices `first..first + count` lie inside a `len`-byte buffer.
    fn fits(&self, first: u32, count: u32, len: u64) -> bool {
        let Some(last) = (first as u64 + count as u64).checked_sub(1) else {
            return true;
        };
        let tail = self
            .attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0);
        self.base_offset + last * self.stride + tail <= len
    }
}

struct ResolvedDraw {
    key: PipelineKey,
    streams: Vec<VertexStream>,
    viewport: [f32; 4],
    first: u32,
    count: u32,
}

struct Pass {
    clear: Option<Color>,
    draws: Vec<ResolvedDraw>,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        Self {
            gpu,
            buffers: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    fn prune(&mut self, objects: &Objects) {
        let format = self.gpu.surface_format();
        self.buffers.retain(|h, _| objects.buffer(*h).is_some());
        self.pipelines.retain(|k, _| {
            objects.program(k.program).is_some_and(|p| p.generation() == k.program_generation)
                && objects
                    .vertex_array(k.vertex_array)
                    .is_some_and(|v| v.generation() == k.layout_generation)
                && k.format == format
        });
    }

    fn resolve(&mut self, objects: &Objects, call: &DrawCall) -> Option<ResolvedDraw> {
        if call.count == 0 {
            return None;
        }

        let program = objects.program(call.program)?;
        let Some(linked) = program.linked() else {
            log::debug!("skipping draw: {} is not linked", call.program);
            return None;
        };
        let vao = objects.vertex_array(call.vertex_array)?;

        let streams = match vertex_streams(vao) {
            Ok(streams) => streams,
            Err(msg) => {
                log::debug!("skipping draw with {}: {msg}", call.vertex_array);
                return None;
            }
        };

        for stream in &streams {
            let Some(buffer) = objects.buffer(stream.buffer) else {
                log::debug!("skipping draw: {} no longer exists", stream.buffer);
                return None;
            };
            if !stream.fits(call.first, call.count, buffer.data().len() as u64) {
                log::debug!("skipping draw: vertices {}..{} overrun {}", call.first, call.first + call.count, stream.buffer);
                return None;
            }
            self.ensure_buffer(stream.buffer, buffer.data(), buffer.generation());
        }

        let size = self.gpu.size();
        let viewport = call.viewport.to_top_left(size.width, size.height)?;

        let key = PipelineKey {
            program: call.program,
            program_generation: program.generation(),
            vertex_array: call.vertex_array,
            layout_generation: vao.generation(),
            topology: call.topology,
            format: self.gpu.surface_format(),
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = build_pipeline(self.gpu.device(), key.format, linked, &streams, call.topology);
            self.pipelines.insert(key, pipeline);
        }

        Some(ResolvedDraw {
            key,
            streams,
            viewport,
            first: call.first,
            count: call.count,
        })
    }

    fn ensure_buffer(&mut self, handle: BufferHandle, data: &[u8], generation: u64) {
        if self.buffers.get(&handle).is_some_and(|b| b.generation == generation) {
            return;
        }
        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("cola vertex buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.insert(handle, GpuBuffer { buffer, generation });
    }
}

impl Backend for WgpuBackend<'_> {
    fn present(&mut self, frame: FrameSubmission<'_>) -> Result<()> {
        self.prune(frame.objects);

        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            // Minimized; nothing to draw into.
            return Ok(());
        }

        let mut passes: Vec<Pass> = Vec::new();
        for cmd in frame.commands {
            match cmd {
                FrameCommand::Clear(color) => passes.push(Pass {
                    clear: Some(*color),
                    draws: Vec::new(),
                }),
                FrameCommand::Draw(call) => {
                    let Some(draw) = self.resolve(frame.objects, call) else { continue };
                    match passes.last_mut() {
                        Some(pass) => pass.draws.push(draw),
                        None => passes.push(Pass {
                            clear: None,
                            draws: vec![draw],
                        }),
                    }
                }
            }
        }

        let mut gpu_frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let msg = err.to_string();
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(anyhow::anyhow!("surface error: {msg}")),
                    action => {
                        log::debug!("frame dropped ({action:?}): {msg}");
                        Ok(())
                    }
                };
            }
        };

        for pass in &passes {
            let load = match pass.clear {
                Some(color) => wgpu::LoadOp::Clear(color.into()),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = gpu_frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cola frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &gpu_frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &pass.draws {
                let Some(pipeline) = self.pipelines.get(&draw.key) else { continue };
                rpass.set_pipeline(pipeline);
                for (slot, stream) in draw.streams.iter().enumerate() {
                    let Some(gpu_buffer) = self.buffers.get(&stream.buffer) else { continue };
                    rpass.set_vertex_buffer(slot as u32, gpu_buffer.buffer.slice(stream.base_offset..));
                }
                let [x, y, w, h] = draw.viewport;
                rpass.set_viewport(x, y, w, h, 0.0, 1.0);
                rpass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }

        self.gpu.submit(gpu_frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }
}

/// `set_vertex_buffer` offsets and strides must be multiples of this.
const VERTEX_ALIGNMENT: u64 = 4;

/// Splits the enabled attributes of `vao` into vertex buffer slots.
///
/// Attributes reading the same buffer with the same stride share a slot when
/// they fit in one stride-sized window starting at the slot's first attribute.
fn vertex_streams(vao: &VertexArrayObject) -> Result<Vec<VertexStream>, String> {
    let mut streams: Vec<VertexStream> = Vec::new();

    for (location, binding) in vao.enabled_attribs() {
        let attrib = binding.attrib;
        let format = attrib
            .vertex_format()
            .ok_or_else(|| format!("attribute {location} has an unsupported format"))?;

        let stride = attrib.effective_stride() as u64;
        if stride % VERTEX_ALIGNMENT != 0 {
            return Err(format!("attribute {location} stride {stride} is not 4-byte aligned"));
        }
        if format.size() > stride {
            return Err(format!("attribute {location} is wider than its stride"));
        }

        let shared = streams.iter_mut().find(|s| {
            s.buffer == binding.buffer
                && s.stride == stride
                && attrib.offset >= s.base_offset
                && attrib.offset - s.base_offset + format.size() <= stride
        });

        match shared {
            Some(stream) => stream.attributes.push(wgpu::VertexAttribute {
                format,
                offset: attrib.offset - stream.base_offset,
                shader_location: location,
            }),
            None => {
                if attrib.offset % VERTEX_ALIGNMENT != 0 {
                    return Err(format!("attribute {location} offset is not 4-byte aligned"));
                }
                streams.push(VertexStream {
                    buffer: binding.buffer,
                    base_offset: attrib.offset,
                    stride,
                    attributes: vec![wgpu::VertexAttribute {
                        format,
                        offset: 0,
                        shader_location: location,
                    }],
                });
            }
        }
    }

    Ok(streams)
}

fn build_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    program: &LinkedProgram,
    streams: &[VertexStream],
    topology: Topology,
) -> wgpu::RenderPipeline {
    let vertex = stage_module(device, ShaderStage::Vertex, &program.vertex_source);
    let fragment = stage_module(device, ShaderStage::Fragment, &program.fragment_source);

    let layouts: Vec<wgpu::VertexBufferLayout<'_>> = streams
        .iter()
        .map(|s| wgpu::VertexBufferLayout {
            array_stride: s.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &s.attributes,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("cola program pipeline"),
        layout: None,

        vertex: wgpu::VertexState {
            module: &vertex,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            buffers: &layouts,
        },

        fragment: Some(wgpu::FragmentState {
            module: &fragment,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: topology.into(),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn stage_module(device: &wgpu::Device, stage: ShaderStage, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStage::Vertex => "cola vertex stage",
            ShaderStage::Fragment => "cola fragment stage",
        }),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage: stage.to_naga(),
            defines: &[],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Gl, VertexAttrib};

    fn vao_with(attribs: &[(u32, VertexAttrib)]) -> (Gl<'static>, VertexArrayHandle, BufferHandle) {
        let mut gl = Gl::headless();
        let buf = gl.create_buffer();
        let vao = gl.create_vertex_array();
        gl.bind_vertex_array(Some(vao));
        gl.bind_array_buffer(Some(buf));
        for (location, attrib) in attribs {
            gl.vertex_attrib_pointer(*location, *attrib);
            gl.enable_vertex_attrib(*location);
        }
        (gl, vao, buf)
    }

    #[test]
    fn packed_positions_form_one_stream() {
        let (gl, vao, buf) = vao_with(&[(0, VertexAttrib::floats(3).with_stride(12))]);
        let streams = vertex_streams(gl.objects().vertex_array(vao).unwrap()).unwrap();

        assert_eq!(
            streams,
            vec![VertexStream {
                buffer: buf,
                base_offset: 0,
                stride: 12,
                attributes: vec![wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                }],
            }]
        );
    }

    #[test]
    fn interleaved_attributes_share_a_stream() {
        let (gl, vao, _) = vao_with(&[
            (0, VertexAttrib::floats(3).with_stride(24)),
            (1, VertexAttrib::floats(3).with_stride(24).with_offset(12)),
        ]);
        let streams = vertex_streams(gl.objects().vertex_array(vao).unwrap()).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].attributes.len(), 2);
    }

    #[test]
    fn planar_attributes_get_their_own_streams() {
        let (gl, vao, _) = vao_with(&[
            (0, VertexAttrib::floats(3)),
            (1, VertexAttrib::floats(2).with_offset(36)),
        ]);
        let streams = vertex_streams(gl.objects().vertex_array(vao).unwrap()).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[1].base_offset, 36);
        assert_eq!(streams[1].attributes[0].offset, 0);
        assert_eq!(streams[1].stride, 8);
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let (gl, vao, _) = vao_with(&[(0, VertexAttrib::floats(3).with_offset(2))]);
        assert!(vertex_streams(gl.objects().vertex_array(vao).unwrap()).is_err());
    }

    #[test]
    fn draw_range_is_bounds_checked() {
        let (gl, vao, _) = vao_with(&[(0, VertexAttrib::floats(3))]);
        let stream = vertex_streams(gl.objects().vertex_array(vao).unwrap())
            .unwrap()
            .remove(0);

        assert!(stream.fits(0, 3, 36));
        assert!(!stream.fits(0, 4, 36));
        assert!(!stream.fits(1, 3, 36));
    }
}
