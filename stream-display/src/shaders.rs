//! Fixed NV12 pipeline sources (GLSL ES 3.00).

pub const VERTEX_SHADER: &str = r#"#version 300 es
layout (location = 0) in vec2 aPosition;
layout (location = 1) in vec2 aTexCoord;
out vec2 vTexCoord;

void main() {
    gl_Position = vec4(aPosition, 0.0, 1.0);
    vTexCoord = aTexCoord;
}
"#;

/// Samples the R8 luma plane and the GR88 chroma plane.
pub const NV12_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;

in vec2 vTexCoord;
out vec4 FragColor;

uniform sampler2D plane0;
uniform sampler2D plane1;
uniform mat3 yuvmat;
uniform vec3 offset;

const float CHROMA_CENTER = 128.0 / 255.0;

void main() {
    vec3 yuv = vec3(texture(plane0, vTexCoord).r, texture(plane1, vTexCoord).rg);
    yuv -= offset + vec3(0.0, CHROMA_CENTER, CHROMA_CENTER);
    FragColor = vec4(clamp(yuvmat * yuv, 0.0, 1.0), 1.0);
}
"#;

pub const UNIFORM_PLANES: [&str; 2] = ["plane0", "plane1"];
pub const UNIFORM_MATRIX: &str = "yuvmat";
pub const UNIFORM_OFFSET: &str = "offset";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_names_present() {
        for name in UNIFORM_PLANES.iter().chain([&UNIFORM_MATRIX, &UNIFORM_OFFSET]) {
            assert!(
                NV12_FRAGMENT_SHADER.contains(&format!(" {name};")),
                "missing uniform {name}"
            );
        }
        assert!(VERTEX_SHADER.starts_with("#version 300 es"));
    }
}
