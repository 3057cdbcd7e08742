use std::any::Any;

use scene3d_core::{
    BlendState, Effect, GraphicsError, Rect, RenderTarget, Texture, TextureFormat, Uniforms,
};

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::pool::PooledFramebuffer;
use crate::port::{InData, OutData, PassIo, PortDescriptor};

/// Adds `strength × bloom` to the scene color.
#[derive(Debug)]
pub struct CompositePass {
    strength: f32,
    format: TextureFormat,
    target: Option<PooledFramebuffer>,
}

impl CompositePass {
    pub const SCENE_COLOR: InData<Texture> = InData::new("scene_color");
    pub const BLOOM: InData<Texture> = InData::new("bloom");
    pub const COMPOSITED: OutData<Texture> = OutData::new("composited");

    pub fn new(gc: &mut GraphicContext, strength: f32) -> Result<Self, GraphicsError> {
        gc.program(&Effect::Composite)?;
        Ok(Self {
            strength,
            format: TextureFormat::Rgba16F,
            target: None,
        })
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength;
    }
}

impl RenderPass for CompositePass {
    fn name(&self) -> &str {
        "composite"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            Self::SCENE_COLOR.descriptor(),
            Self::BLOOM.descriptor(),
            Self::COMPOSITED.descriptor(),
        ]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        let scene = Self::SCENE_COLOR.get(io)?;
        let bloom = Self::BLOOM.get(io)?;
        let out = gc.ensure_framebuffer(&mut self.target, scene.size, self.format)?;

        let uniforms = Uniforms::new()
            .with_texture("scene", scene.id)
            .with_texture("bloom", bloom.id)
            .with_scalar("bloom_strength", self.strength);
        gc.draw_fullscreen(
            &Effect::Composite,
            RenderTarget::Texture(out.id),
            Rect::from_size(out.size),
            BlendState::REPLACE,
            &uniforms,
        )?;
        Self::COMPOSITED.set(io, out)
    }

    fn release(&mut self, gc: &mut GraphicContext) {
        gc.release_slot(&mut self.target);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
