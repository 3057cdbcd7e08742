//! GLSL dialect detection and shader generation for each [`Effect`].

use std::fmt::Write;

use glium::CapabilitiesSource;
use scene3d_core::{Effect, GlslVersion};

/// Try to get the best GLSL target for the given capabilities.
///
/// Prefers `330`, then `140`, then `120`; `None` if none is available.
pub fn get_best_target(ctx: &impl CapabilitiesSource) -> Option<GlslVersion> {
    let glsl_versions = &ctx.get_capabilities().supported_glsl_versions;
    let has = |major, minor| {
        glsl_versions
            .iter()
            .any(|v| *v == glium::Version(glium::Api::Gl, major, minor))
    };

    if has(3, 3) {
        Some(GlslVersion::Glsl330)
    } else if has(1, 4) {
        Some(GlslVersion::Glsl140)
    } else if has(1, 2) {
        Some(GlslVersion::Glsl120)
    } else {
        None
    }
}

fn vertex_prelude(version: GlslVersion) -> &'static str {
    match version {
        GlslVersion::Glsl120 => "#define ATTRIBUTE attribute\n#define VARYING varying\n",
        GlslVersion::Glsl140 | GlslVersion::Glsl330 => "#define ATTRIBUTE in\n#define VARYING out\n",
    }
}

fn fragment_prelude(version: GlslVersion) -> &'static str {
    match version {
        GlslVersion::Glsl120 => {
            "#define VARYING varying\n#define TEXTURE texture2D\n#define FRAG_COLOR gl_FragColor\n"
        }
        GlslVersion::Glsl140 | GlslVersion::Glsl330 => {
            "#define VARYING in\n#define TEXTURE texture\n#define FRAG_COLOR frag_color\nout vec4 frag_color;\n"
        }
    }
}

/// Fullscreen quad vertex shader. `v_uv` spans `[0, 1]` over the viewport.
pub fn vertex_source(version: GlslVersion) -> String {
    format!(
        "{}\n{}\
ATTRIBUTE vec2 position;
VARYING vec2 v_uv;

void main() {{
    v_uv = position * 0.5 + 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}}
",
        version.directive(),
        vertex_prelude(version)
    )
}

/// Fragment shader for `effect`. Blur weights are baked in as constants.
pub fn fragment_source(version: GlslVersion, effect: &Effect) -> String {
    let body = match effect {
        Effect::Copy => "\
uniform sampler2D source;

void main() {
    FRAG_COLOR = TEXTURE(source, v_uv);
}
"
        .to_owned(),
        Effect::BloomExtract => "\
uniform sampler2D source;
uniform float threshold;

void main() {
    vec4 c = TEXTURE(source, v_uv);
    float luma = dot(c.rgb, vec3(0.2126, 0.7152, 0.0722));
    float factor = max(luma - threshold, 0.0) / max(luma, 1e-4);
    FRAG_COLOR = vec4(c.rgb * factor, 1.0);
}
"
        .to_owned(),
        Effect::Blur { axis, kernel } => {
            let (dx, dy) = axis.step();
            let mut taps = String::new();
            for (offset, weight) in kernel.offsets_and_weights() {
                let _ = writeln!(
                    taps,
                    "    acc += TEXTURE(source, v_uv + vec2({}.0, {}.0) * texel_size) * {:?};",
                    offset * dx,
                    offset * dy,
                    weight
                );
            }
            format!(
                "\
uniform sampler2D source;
uniform vec2 texel_size;

void main() {{
    vec4 acc = vec4(0.0);
{taps}    FRAG_COLOR = acc;
}}
"
            )
        }
        Effect::Composite => "\
uniform sampler2D scene;
uniform sampler2D bloom;
uniform float bloom_strength;

void main() {
    vec4 s = TEXTURE(scene, v_uv);
    vec4 b = TEXTURE(bloom, v_uv);
    FRAG_COLOR = vec4(s.rgb + b.rgb * bloom_strength, s.a);
}
"
        .to_owned(),
        Effect::SolidColor => "\
uniform vec4 color;

void main() {
    FRAG_COLOR = color;
}
"
        .to_owned(),
    };

    format!(
        "{}\n{}VARYING vec2 v_uv;\n\n{}",
        version.directive(),
        fragment_prelude(version),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene3d_core::{BlurAxis, BlurKernel};

    #[test]
    fn legacy_dialect_uses_builtin_output() {
        let src = fragment_source(GlslVersion::Glsl120, &Effect::Copy);
        assert!(src.starts_with("#version 120\n"));
        assert!(src.contains("#define FRAG_COLOR gl_FragColor"));
        assert!(!src.contains("out vec4"));
    }

    #[test]
    fn blur_bakes_one_line_per_tap() {
        let effect = Effect::Blur {
            axis: BlurAxis::Vertical,
            kernel: BlurKernel::new(3, None),
        };
        let src = fragment_source(GlslVersion::Glsl330, &effect);
        assert_eq!(src.matches("acc += TEXTURE").count(), 7);
        assert!(src.contains("vec2(0.0, -3.0)"));
        assert!(src.contains("out vec4 frag_color;"));
    }

    #[test]
    fn vertex_shader_declares_position_attribute() {
        let src = vertex_source(GlslVersion::Glsl140);
        assert!(src.contains("in vec2 position;"));
        assert!(src.contains("out vec2 v_uv;"));
    }
}
