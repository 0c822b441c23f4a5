/// Straight-alpha RGBA color in `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

/// Viewport rectangle in physical pixels, origin at the bottom-left corner.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Converts to a top-left-origin `[x, y, w, h]` rect clamped to a
    /// `surface_width × surface_height` target.
    ///
    /// The rect itself is clamped, so a viewport hanging off the surface maps
    /// the whole clip space onto the visible part. GL instead keeps the full
    /// viewport transform and clips what falls outside.
    ///
    /// Returns `None` when nothing of the viewport lies on the surface.
    pub fn to_top_left(self, surface_width: u32, surface_height: u32) -> Option<[f32; 4]> {
        let sw = surface_width as i64;
        let sh = surface_height as i64;

        let left = self.x as i64;
        let right = left + self.width as i64;
        let top = sh - (self.y as i64 + self.height as i64);
        let bottom = top + self.height as i64;

        let x0 = left.clamp(0, sw);
        let x1 = right.clamp(0, sw);
        let y0 = top.clamp(0, sh);
        let y1 = bottom.clamp(0, sh);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some([x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32])
    }
}

/// Expected update frequency of a buffer's contents.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Pipeline stage of a shader object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Fragment => "Fragment",
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// Primitive assembly mode for `draw_arrays`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(t: Topology) -> Self {
        match t {
            Topology::Points => wgpu::PrimitiveTopology::PointList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

/// Scalar type of one attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttribType {
    Float,
    Int,
    UnsignedInt,
}

impl AttribType {
    /// Size of one component in bytes.
    pub const fn size(self) -> u32 {
        match self {
            AttribType::Float | AttribType::Int | AttribType::UnsignedInt => 4,
        }
    }
}

/// Describes how one vertex attribute is read from the bound array buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttrib {
    /// Component count, 1 to 4.
    pub components: u8,
    pub ty: AttribType,
    pub normalized: bool,
    /// Bytes between consecutive vertices; 0 means tightly packed.
    pub stride: u32,
    /// Byte offset of the first component in the buffer.
    pub offset: u64,
}

impl VertexAttrib {
    /// Tightly packed `f32` attribute.
    pub const fn floats(components: u8) -> Self {
        Self {
            components,
            ty: AttribType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub const fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Size of one element in bytes.
    pub const fn element_size(&self) -> u32 {
        self.components as u32 * self.ty.size()
    }

    /// Stride with the tightly-packed default resolved.
    pub const fn effective_stride(&self) -> u32 {
        if self.stride == 0 { self.element_size() } else { self.stride }
    }

    pub(crate) fn vertex_format(&self) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as F;
        let format = match (self.ty, self.components) {
            (AttribType::Float, 1) => F::Float32,
            (AttribType::Float, 2) => F::Float32x2,
            (AttribType::Float, 3) => F::Float32x3,
            (AttribType::Float, 4) => F::Float32x4,
            (AttribType::Int, 1) => F::Sint32,
            (AttribType::Int, 2) => F::Sint32x2,
            (AttribType::Int, 3) => F::Sint32x3,
            (AttribType::Int, 4) => F::Sint32x4,
            (AttribType::UnsignedInt, 1) => F::Uint32,
            (AttribType::UnsignedInt, 2) => F::Uint32x2,
            (AttribType::UnsignedInt, 3) => F::Uint32x3,
            (AttribType::UnsignedInt, 4) => F::Uint32x4,
            _ => return None,
        };
        Some(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_viewport_maps_to_full_surface() {
        let vp = Viewport::new(0, 0, 800, 600);
        assert_eq!(vp.to_top_left(800, 600), Some([0.0, 0.0, 800.0, 600.0]));
    }

    #[test]
    fn bottom_left_origin_is_flipped() {
        // Lower-left quarter in GL terms is the lower-left quarter on screen.
        let vp = Viewport::new(0, 0, 400, 300);
        assert_eq!(vp.to_top_left(800, 600), Some([0.0, 300.0, 400.0, 300.0]));
    }

    #[test]
    fn viewport_is_clamped_to_surface() {
        let vp = Viewport::new(-100, 0, 1000, 600);
        assert_eq!(vp.to_top_left(800, 600), Some([0.0, 0.0, 800.0, 600.0]));

        let off_screen = Viewport::new(900, 0, 100, 100);
        assert_eq!(off_screen.to_top_left(800, 600), None);
    }

    #[test]
    fn packed_stride_defaults_to_element_size() {
        let attrib = VertexAttrib::floats(3);
        assert_eq!(attrib.effective_stride(), 12);
        assert_eq!(attrib.with_stride(16).effective_stride(), 16);
        assert_eq!(attrib.vertex_format(), Some(wgpu::VertexFormat::Float32x3));
        assert_eq!(VertexAttrib::floats(5).vertex_format(), None);
    }
}
