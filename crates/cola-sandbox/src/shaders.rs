//! The fixed shader pair.

/// Passes the position through with `w = 1`.
pub const VERTEX: &str = r"#version 450

layout(location = 0) in vec3 a_position;

void main() {
    gl_Position = vec4(a_position, 1.0);
}
";

/// Solid opaque yellow.
pub const FRAGMENT: &str = r"#version 450

layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(1.0, 1.0, 0.0, 1.0);
}
";
