use std::any::Any;

use scene3d_core::{
    BlendState, Color, DrawCommand, Effect, GraphicsError, Primitive, ProgramId, Rect, Rectf,
    RenderTarget, Texture, TextureFormat, Uniforms,
};

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::pool::PooledFramebuffer;
use crate::port::{InData, OutData, PassIo, PortDescriptor};

/// Renders a list of solid rectangles into the scene color target.
///
/// Colors may exceed 1.0; the target is a float format when the provider
/// has one, so over-bright values survive until bloom extraction.
pub struct GeometryPass {
    clear: Color,
    items: Vec<(Rectf, Color)>,
    program: ProgramId,
    format: TextureFormat,
    target: Option<PooledFramebuffer>,
}

impl std::fmt::Debug for GeometryPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryPass")
            .field("clear", &self.clear)
            .field("items", &self.items.len())
            .field("format", &self.format)
            .finish()
    }
}

impl GeometryPass {
    pub const VIEWPORT: InData<Rect> = InData::new("viewport");
    pub const SCENE_COLOR: OutData<Texture> = OutData::new("scene_color");

    pub fn new(gc: &mut GraphicContext, clear: Color) -> Result<Self, GraphicsError> {
        Ok(Self {
            clear,
            items: Vec::new(),
            program: gc.program(&Effect::SolidColor)?,
            format: TextureFormat::Rgba16F,
            target: None,
        })
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn push(&mut self, rect: Rectf, color: Color) {
        self.items.push((rect, color));
    }

    pub fn set_items(&mut self, items: Vec<(Rectf, Color)>) {
        self.items = items;
    }

    pub fn items(&self) -> &[(Rectf, Color)] {
        &self.items
    }

    pub fn set_clear_color(&mut self, clear: Color) {
        self.clear = clear;
    }
}

impl RenderPass for GeometryPass {
    fn name(&self) -> &str {
        "geometry"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![Self::VIEWPORT.descriptor(), Self::SCENE_COLOR.descriptor()]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        let viewport = Self::VIEWPORT.get(io)?;
        let scene = gc.ensure_framebuffer(&mut self.target, viewport.size(), self.format)?;
        let target = RenderTarget::Texture(scene.id);
        let bounds = Rect::from_size(scene.size);

        gc.clear(target, self.clear)?;
        for (rect, color) in &self.items {
            let uniforms = Uniforms::new().with_color("color", *color);
            gc.draw(&DrawCommand {
                program: self.program,
                target,
                viewport: bounds,
                primitive: Primitive::Rect(*rect),
                blend: BlendState::REPLACE,
                uniforms: &uniforms,
            })?;
        }
        Self::SCENE_COLOR.set(io, scene)
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
