//! The [`RenderPass`] trait, the unit of work in a [`crate::Pipeline`].

use std::any::Any;

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::port::{PassIo, PortDescriptor};

/// A unit of GPU work with declared input and output ports.
///
/// Passes compile their programs when constructed, so a pass that exists is
/// ready to run. Construction failures never reach the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// struct Tint {
///     program: ProgramId,
///     target: Option<PooledFramebuffer>,
/// }
///
/// impl Tint {
///     const SOURCE: InData<Texture> = InData::new("source");
///     const TINTED: OutData<Texture> = OutData::new("tinted");
/// }
///
/// impl RenderPass for Tint {
///     fn name(&self) -> &str {
///         "tint"
///     }
///
///     fn ports(&self) -> Vec<PortDescriptor> {
///         vec![Self::SOURCE.descriptor(), Self::TINTED.descriptor()]
///     }
///
///     fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError> {
///         let source = Self::SOURCE.get(io)?;
///         // ... draw into self.target ...
///         Self::TINTED.set(io, target)
///     }
/// }
/// ```
pub trait RenderPass: 'static {
    fn name(&self) -> &str;

    /// Ports this pass reads and writes. Queried once, when the pass is added.
    fn ports(&self) -> Vec<PortDescriptor>;

    /// Renders one frame. Must write every declared output exactly once.
    fn run(&mut self, gc: &mut GraphicContext, io: &mut PassIo<'_>) -> Result<(), PipelineError>;

    /// Returns owned GPU resources. Called once, before the context goes
    /// away.
    fn release(&mut self, _gc: &mut GraphicContext) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
