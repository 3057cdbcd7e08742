//! CPU versions of the programs described by [`Effect`].

use scene3d_core::{Effect, GraphicsError, TextureId, Uniforms};

use crate::surface::Surface;

/// Rec. 709 luma weights.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// An effect with its uniforms resolved against live textures.
pub(crate) enum Shader<'a> {
    Copy {
        source: &'a Surface,
    },
    BloomExtract {
        source: &'a Surface,
        threshold: f32,
    },
    Blur {
        source: &'a Surface,
        step: (i32, i32),
        taps: Vec<(i32, f32)>,
    },
    Composite {
        scene: &'a Surface,
        bloom: &'a Surface,
        strength: f32,
    },
    Solid([f32; 4]),
}

impl<'a> Shader<'a> {
    pub fn bind<F>(effect: &Effect, uniforms: &Uniforms, lookup: F) -> Result<Self, GraphicsError>
    where
        F: Fn(TextureId) -> Result<&'a Surface, GraphicsError>,
    {
        Ok(match effect {
            Effect::Copy => Shader::Copy {
                source: lookup(uniforms.texture("source")?)?,
            },
            Effect::BloomExtract => Shader::BloomExtract {
                source: lookup(uniforms.texture("source")?)?,
                threshold: uniforms.scalar("threshold")?,
            },
            Effect::Blur { axis, kernel } => Shader::Blur {
                source: lookup(uniforms.texture("source")?)?,
                step: axis.step(),
                taps: kernel.offsets_and_weights().collect(),
            },
            Effect::Composite => Shader::Composite {
                scene: lookup(uniforms.texture("scene")?)?,
                bloom: lookup(uniforms.texture("bloom")?)?,
                strength: uniforms.scalar("bloom_strength")?,
            },
            Effect::SolidColor => Shader::Solid(uniforms.vector("color")?),
        })
    }

    /// Shades the fragment at normalised coordinates `(u, v)`.
    pub fn shade(&self, u: f32, v: f32) -> [f32; 4] {
        match self {
            Shader::Copy { source } => sample(source, u, v),
            Shader::BloomExtract { source, threshold } => {
                let c = sample(source, u, v);
                let luma = c[0] * LUMA[0] + c[1] * LUMA[1] + c[2] * LUMA[2];
                let factor = (luma - threshold).max(0.0) / luma.max(1e-4);
                [c[0] * factor, c[1] * factor, c[2] * factor, 1.0]
            }
            Shader::Blur { source, step, taps } => {
                let (x, y) = source.texel_at(u, v);
                let mut acc = [0.0f32; 4];
                for &(offset, weight) in taps {
                    let t = source.fetch(x + offset * step.0, y + offset * step.1);
                    for c in 0..4 {
                        acc[c] += t[c] * weight;
                    }
                }
                acc
            }
            Shader::Composite {
                scene,
                bloom,
                strength,
            } => {
                let s = sample(scene, u, v);
                let b = sample(bloom, u, v);
                [
                    s[0] + b[0] * strength,
                    s[1] + b[1] * strength,
                    s[2] + b[2] * strength,
                    s[3],
                ]
            }
            Shader::Solid(color) => *color,
        }
    }
}

#[inline]
fn sample(surface: &Surface, u: f32, v: f32) -> [f32; 4] {
    let (x, y) = surface.texel_at(u, v);
    surface.fetch(x, y)
}
