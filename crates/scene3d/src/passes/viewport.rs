use std::any::Any;

use scene3d_core::Rect;

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::port::{OutData, PassIo, PortDescriptor};

/// Publishes the current viewport so downstream passes follow resizes
/// through their inputs.
#[derive(Debug, Default)]
pub struct ViewportPass;

impl ViewportPass {
    pub const VIEWPORT: OutData<Rect> = OutData::new("viewport");

    pub fn new() -> Self {
        Self
    }
}

impl RenderPass for ViewportPass {
    fn name(&self) -> &str {
        "viewport"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![Self::VIEWPORT.descriptor()]
    }

    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
        Self::VIEWPORT.set(io, gc.viewport_rect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
