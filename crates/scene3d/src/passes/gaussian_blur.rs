//! Separable Gaussian blur.
//!
//! A horizontal pass writes into a pooled intermediate, a vertical pass reads
//! it back into the output. The intermediate defaults to a half-float format;
//! rounding the horizontal result to 8 bits before the vertical pass shows
//! up as banding on smooth gradients.

use std::any::Any;

use scene3d_core::{
    BlendState, BlurAxis, BlurKernel, Effect, GraphicsError, Rect, RenderTarget, Texture,
    TextureFormat, Uniforms,
};
use tracing::trace;

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::pool::PooledFramebuffer;
use crate::port::{InData, OutData, PassIo, PortDescriptor};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlurSettings {
    /// Taps on each side of the center, `0` copies the input.
    pub radius: u32,
    /// Defaults to `radius / 2`.
    pub sigma: Option<f32>,
    /// Format of the horizontal pass result.
    pub intermediate_format: TextureFormat,
    pub output_format: TextureFormat,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            radius: 4,
            sigma: None,
            intermediate_format: TextureFormat::Rgba16F,
            output_format: TextureFormat::Rgba16F,
        }
    }
}

impl BlurSettings {
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = Some(sigma);
        self
    }

    pub fn with_intermediate_format(mut self, format: TextureFormat) -> Self {
        self.intermediate_format = format;
        self
    }

    pub fn with_output_format(mut self, format: TextureFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn kernel(&self) -> BlurKernel {
        BlurKernel::new(self.radius, self.sigma)
    }
}

/// The two-pass blur itself, shared by [`GaussianBlurPass`] and the bloom
/// pass.
#[derive(Debug)]
pub struct GaussianBlur {
    settings: BlurSettings,
    horizontal: Effect,
    vertical: Effect,
    output: Option<PooledFramebuffer>,
}

impl GaussianBlur {
    /// Compiles both programs. Fails for radii no provider can build.
    pub fn new(gc: &mut GraphicContext, settings: BlurSettings) -> Result<Self, GraphicsError> {
        let kernel = settings.kernel();
        let horizontal = Effect::Blur {
            axis: BlurAxis::Horizontal,
            kernel,
        };
        let vertical = Effect::Blur {
            axis: BlurAxis::Vertical,
            kernel,
        };
        gc.program(&horizontal)?;
        gc.program(&vertical)?;
        Ok(Self {
            settings,
            horizontal,
            vertical,
            output: None,
        })
    }

    pub fn settings(&self) -> &BlurSettings {
        &self.settings
    }

    /// Blurs `source` into a target owned by this blur, valid until the next
    /// call.
    pub fn blur(&mut self, gc: &mut GraphicContext, source: Texture) -> Result<Texture, GraphicsError> {
        let size = source.size;
        let bounds = Rect::from_size(size);
        trace!(?size, radius = self.settings.radius, "gaussian blur");

        let intermediate =
            gc.acquire_framebuffer_or_fallback(size, self.settings.intermediate_format)?;
        let result = self.separable(gc, source, &intermediate, bounds);
        gc.release_framebuffer(intermediate);
        result
    }

    fn separable(
        &mut self,
        gc: &mut GraphicContext,
        source: Texture,
        intermediate: &PooledFramebuffer,
        bounds: Rect,
    ) -> Result<Texture, GraphicsError> {
        let uniforms = Uniforms::new().with_texture("source", source.id);
        gc.draw_fullscreen(
            &self.horizontal,
            intermediate.target(),
            bounds,
            BlendState::REPLACE,
            &uniforms,
        )?;

        let output = gc.ensure_framebuffer(&mut self.output, bounds.size(), self.settings.output_format)?;
        let uniforms = Uniforms::new().with_texture("source", intermediate.id());
        gc.draw_fullscreen(
            &self.vertical,
            RenderTarget::Texture(output.id),
            bounds,
            BlendState::REPLACE,
            &uniforms,
        )?;
        Ok(output)
    }

    pub fn release(&mut self, gc: &mut GraphicContext) {
        gc.release_slot(&mut self.output);
    }
}

/// Standalone blur of one texture.
#[derive(Debug)]
pub struct GaussianBlurPass {
    blur: GaussianBlur,
}

impl GaussianBlurPass {
    pub const SOURCE: InData<Texture> = InData::new("source");
    pub const BLURRED: OutData<Texture> = OutData::new("blurred");

    pub fn new(gc: &mut GraphicContext, settings: BlurSettings) -> Result<Self, GraphicsError> {
        Ok(Self {
            blur: GaussianBlur::new(gc, settings)?,
        })
    }

    pub fn settings(&self) -> &BlurSettings {
        self.blur.settings()
    }
}

impl RenderPass for GaussianBlurPass {
    fn name(&self) -> &str {
        "gaussian_blur"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![Self::SOURCE.descriptor(), Self::BLURRED.descriptor()]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        let source = Self::SOURCE.get(io)?;
        let blurred = self.blur.blur(gc, source)?;
        Self::BLURRED.set(io, blurred)
    }

    fn release(&mut self, gc: &mut GraphicContext) {
        self.blur.release(gc);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
