//! Backend-neutral description of the draw work a pass issues.
//!
//! Every provider turns an [`Effect`] into a program of its own (GLSL for the
//! OpenGL providers, a CPU kernel for the software provider), then executes
//! [`DrawCommand`]s against it.

use crate::color::Color;
use crate::error::{GraphicsError, ShaderStage};
use crate::geometry::{Rect, Rectf};
use crate::handles::{ProgramId, TextureId};
use crate::kernel::{BlurKernel, MAX_BLUR_RADIUS};

/// Direction of one separable blur pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

impl BlurAxis {
    /// Unit step in texels along this axis.
    #[inline]
    pub fn step(self) -> (i32, i32) {
        match self {
            BlurAxis::Horizontal => (1, 0),
            BlurAxis::Vertical => (0, 1),
        }
    }
}

/// Program kinds understood by all providers.
///
/// Uniform names per kind:
/// - `Copy`: texture `source`
/// - `BloomExtract`: texture `source`, scalar `threshold`
/// - `Blur`: texture `source`
/// - `Composite`: textures `scene`, `bloom`; scalar `bloom_strength`
/// - `SolidColor`: vector `color`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Effect {
    Copy,
    BloomExtract,
    Blur { axis: BlurAxis, kernel: BlurKernel },
    Composite,
    SolidColor,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Copy => "copy",
            Effect::BloomExtract => "bloom_extract",
            Effect::Blur {
                axis: BlurAxis::Horizontal,
                ..
            } => "blur_horizontal",
            Effect::Blur {
                axis: BlurAxis::Vertical,
                ..
            } => "blur_vertical",
            Effect::Composite => "composite",
            Effect::SolidColor => "solid_color",
        }
    }

    /// Rejects programs no provider can build. Called by every provider
    /// before compiling.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if let Effect::Blur { kernel, .. } = self {
            if kernel.radius() > MAX_BLUR_RADIUS {
                return Err(GraphicsError::ShaderCompile {
                    stage: ShaderStage::Fragment,
                    log: format!(
                        "blur kernel needs {} taps, at most {} are supported",
                        kernel.taps(),
                        2 * MAX_BLUR_RADIUS + 1
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Blend factor applied to source or destination.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

impl BlendFactor {
    #[inline]
    pub fn apply(self, value: f32, src_alpha: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => value,
            BlendFactor::SrcAlpha => value * src_alpha,
            BlendFactor::OneMinusSrcAlpha => value * (1.0 - src_alpha),
        }
    }
}

/// Additive blend equation `src * src_factor + dst * dst_factor`.
/// When disabled the source replaces the destination.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendState {
    pub const REPLACE: BlendState = BlendState {
        enabled: false,
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
    };

    pub const ADDITIVE: BlendState = BlendState {
        enabled: true,
        src: BlendFactor::One,
        dst: BlendFactor::One,
    };

    pub const ALPHA: BlendState = BlendState {
        enabled: true,
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };

    /// Combines a shaded `src` color with the existing `dst` color.
    pub fn blend(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        if !self.enabled {
            return src;
        }
        let a = src[3];
        let mut out = [0.0; 4];
        for c in 0..4 {
            out[c] = self.src.apply(src[c], a) + self.dst.apply(dst[c], a);
        }
        out
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Named uniform values for one draw.
#[derive(Debug, Clone, Default)]
pub struct Uniforms {
    textures: Vec<(&'static str, TextureId)>,
    scalars: Vec<(&'static str, f32)>,
    vectors: Vec<(&'static str, [f32; 4])>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture(mut self, name: &'static str, texture: TextureId) -> Self {
        self.textures.push((name, texture));
        self
    }

    pub fn with_scalar(mut self, name: &'static str, value: f32) -> Self {
        self.scalars.push((name, value));
        self
    }

    pub fn with_color(mut self, name: &'static str, color: Color) -> Self {
        self.vectors.push((name, color.to_array()));
        self
    }

    pub fn texture(&self, name: &'static str) -> Result<TextureId, GraphicsError> {
        self.textures
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
            .ok_or(GraphicsError::MissingUniform(name))
    }

    pub fn scalar(&self, name: &'static str) -> Result<f32, GraphicsError> {
        self.scalars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .ok_or(GraphicsError::MissingUniform(name))
    }

    pub fn vector(&self, name: &'static str) -> Result<[f32; 4], GraphicsError> {
        self.vectors
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .ok_or(GraphicsError::MissingUniform(name))
    }

    /// All sampled textures, used for feedback-loop checks.
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().map(|(_, t)| *t)
    }
}

/// Geometry covered by a draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Primitive {
    /// Two triangles covering the whole viewport.
    FullscreenQuad,
    /// Axis-aligned rectangle, normalised to the viewport.
    Rect(Rectf),
}

/// Where a draw lands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The window's back buffer.
    Default,
    /// Color attachment backed by a texture.
    Texture(TextureId),
}

/// Default-framebuffer buffer to read pixels from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadBuffer {
    Front,
    Back,
}

/// One draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub program: ProgramId,
    pub target: RenderTarget,
    pub viewport: Rect,
    pub primitive: Primitive,
    pub blend: BlendState,
    pub uniforms: &'a Uniforms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_blur_is_a_compile_error() {
        let effect = Effect::Blur {
            axis: BlurAxis::Horizontal,
            kernel: BlurKernel::new(MAX_BLUR_RADIUS + 1, None),
        };
        assert!(matches!(
            effect.validate(),
            Err(GraphicsError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
    }

    #[test]
    fn additive_blend_sums_colors() {
        let out = BlendState::ADDITIVE.blend([0.25, 0.5, 0.0, 1.0], [0.25, 0.25, 1.0, 1.0]);
        assert_eq!(out, [0.5, 0.75, 1.0, 2.0]);
    }

    #[test]
    fn missing_uniform_is_reported_by_name() {
        let u = Uniforms::new().with_scalar("threshold", 0.5);
        assert_eq!(u.scalar("threshold").unwrap(), 0.5);
        assert!(matches!(
            u.texture("source"),
            Err(GraphicsError::MissingUniform("source"))
        ));
    }
}
