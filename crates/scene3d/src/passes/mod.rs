//! Built-in passes and the standard scene pipeline.
//!
//! The standard pipeline runs `viewport → geometry → bloom → composite →
//! output`. The viewport feeds every pass that sizes targets, and the scene
//! color feeds both bloom and composite.

pub mod bloom;
pub mod composite;
pub mod gaussian_blur;
pub mod geometry;
pub mod output;
pub mod viewport;

pub use bloom::{BloomPass, BloomSettings};
pub use composite::CompositePass;
pub use gaussian_blur::{BlurSettings, GaussianBlur, GaussianBlurPass};
pub use geometry::GeometryPass;
pub use output::OutputPass;
pub use viewport::ViewportPass;

use scene3d_core::Color;

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pipeline::{PassHandle, Pipeline};

/// Handles to the passes of [`standard_pipeline`].
#[derive(Debug, Copy, Clone)]
pub struct StandardPasses {
    pub viewport: PassHandle<ViewportPass>,
    pub geometry: PassHandle<GeometryPass>,
    pub bloom: PassHandle<BloomPass>,
    pub composite: PassHandle<CompositePass>,
    pub output: PassHandle<OutputPass>,
}

/// Assembles and freezes viewport → geometry → bloom → composite → output.
///
/// Fill the scene through `pipeline.pass_mut(passes.geometry)`.
pub fn standard_pipeline(
    gc: &mut GraphicContext,
    clear: Color,
    bloom: BloomSettings,
) -> Result<(Pipeline, StandardPasses), PipelineError> {
    let mut pipeline = Pipeline::new();
    let passes = StandardPasses {
        viewport: pipeline.add_pass(ViewportPass::new())?,
        geometry: pipeline.add_pass(GeometryPass::new(gc, clear)?)?,
        bloom: pipeline.add_pass(BloomPass::new(gc, bloom)?)?,
        composite: pipeline.add_pass(CompositePass::new(gc, bloom.strength)?)?,
        output: pipeline.add_pass(OutputPass::new())?,
    };

    let viewport = passes.viewport.output(ViewportPass::VIEWPORT);
    pipeline.connect(viewport, passes.geometry.input(GeometryPass::VIEWPORT))?;
    pipeline.connect(viewport, passes.bloom.input(BloomPass::VIEWPORT))?;
    pipeline.connect(viewport, passes.output.input(OutputPass::VIEWPORT))?;

    let scene = passes.geometry.output(GeometryPass::SCENE_COLOR);
    pipeline.connect(scene, passes.bloom.input(BloomPass::FINAL_COLOR))?;
    pipeline.connect(scene, passes.composite.input(CompositePass::SCENE_COLOR))?;
    pipeline.connect(
        passes.bloom.output(BloomPass::BLOOM_CONTRIBUTION),
        passes.composite.input(CompositePass::BLOOM),
    )?;
    pipeline.connect(
        passes.composite.output(CompositePass::COMPOSITED),
        passes.output.input(OutputPass::SOURCE),
    )?;

    pipeline.freeze()?;
    Ok((pipeline, passes))
}
