use std::any::Any;

use scene3d_core::{Rect, RenderTarget, Texture};

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::port::{InData, OutData, PassIo, PortDescriptor};

/// Copies the finished image to the default framebuffer.
#[derive(Debug, Default)]
pub struct OutputPass;

impl OutputPass {
    pub const SOURCE: InData<Texture> = InData::new("source");
    pub const VIEWPORT: InData<Rect> = InData::new("viewport");
    /// Region of the default framebuffer written this frame.
    pub const PRESENTED: OutData<Rect> = OutData::new("presented");

    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for OutputPass {
    fn name(&self) -> &str {
        "output"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            Self::SOURCE.descriptor(),
            Self::VIEWPORT.descriptor(),
            Self::PRESENTED.descriptor(),
        ]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        let source = Self::SOURCE.get(io)?;
        let viewport = Self::VIEWPORT.get(io)?;
        gc.blit_or_copy(source, RenderTarget::Default, viewport)?;
        Self::PRESENTED.set(io, viewport)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
