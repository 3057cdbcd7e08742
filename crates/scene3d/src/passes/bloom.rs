use std::any::Any;

use scene3d_core::{BlendState, Effect, GraphicsError, Rect, RenderTarget, Texture, Uniforms};
use tracing::trace;

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::passes::gaussian_blur::{BlurSettings, GaussianBlur};
use crate::pool::PooledFramebuffer;
use crate::port::{InData, OutData, PassIo, PortDescriptor};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BloomSettings {
    /// Luminance above which pixels glow.
    pub threshold: f32,
    /// The bright-pass target is the viewport divided by this.
    pub downscale: u32,
    pub blur: BlurSettings,
    /// Weight of the bloom contribution when composited.
    pub strength: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            downscale: 2,
            blur: BlurSettings::default(),
            strength: 1.0,
        }
    }
}

impl BloomSettings {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_downscale(mut self, downscale: u32) -> Self {
        self.downscale = downscale;
        self
    }

    pub fn with_blur(mut self, blur: BlurSettings) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }
}

/// Extracts over-threshold luminance from the scene and blurs it into the
/// bloom contribution.
#[derive(Debug)]
pub struct BloomPass {
    settings: BloomSettings,
    extract: Option<PooledFramebuffer>,
    blur: GaussianBlur,
}

impl BloomPass {
    pub const VIEWPORT: InData<Rect> = InData::new("viewport");
    pub const FINAL_COLOR: InData<Texture> = InData::new("final_color");
    pub const BLOOM_CONTRIBUTION: OutData<Texture> = OutData::new("bloom_contribution");

    pub fn new(gc: &mut GraphicContext, settings: BloomSettings) -> Result<Self, GraphicsError> {
        gc.program(&Effect::BloomExtract)?;
        Ok(Self {
            settings,
            extract: None,
            blur: GaussianBlur::new(gc, settings.blur)?,
        })
    }

    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    /// Threshold changes apply from the next frame; blur and format settings
    /// are fixed at construction.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.settings.threshold = threshold;
    }

    /// Draws the bright pass of `scene` into the downscaled extract target.
    fn setup_bloom_extract(
        &mut self,
        gc: &mut GraphicContext,
        viewport: Rect,
        scene: Texture,
    ) -> Result<Texture, GraphicsError> {
        let size = viewport.size().scaled_down(self.settings.downscale);
        let extract =
            gc.ensure_framebuffer(&mut self.extract, size, self.settings.blur.intermediate_format)?;
        trace!(?size, threshold = self.settings.threshold, "bloom extract");

        let uniforms = Uniforms::new()
            .with_texture("source", scene.id)
            .with_scalar("threshold", self.settings.threshold);
        gc.draw_fullscreen(
            &Effect::BloomExtract,
            RenderTarget::Texture(extract.id),
            Rect::from_size(size),
            BlendState::REPLACE,
            &uniforms,
        )?;
        Ok(extract)
    }
}

impl RenderPass for BloomPass {
    fn name(&self) -> &str {
        "bloom"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            Self::VIEWPORT.descriptor(),
            Self::FINAL_COLOR.descriptor(),
            Self::BLOOM_CONTRIBUTION.descriptor(),
        ]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        let viewport = Self::VIEWPORT.get(io)?;
        let scene = Self::FINAL_COLOR.get(io)?;
        let extract = self.setup_bloom_extract(gc, viewport, scene)?;
        let bloom = self.blur.blur(gc, extract)?;
        Self::BLOOM_CONTRIBUTION.set(io, bloom)
    }

    fn release(&mut self, gc: &mut GraphicContext) {
        self.blur.release(gc);
        gc.release_slot(&mut self.extract);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
