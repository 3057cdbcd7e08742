//! Layered scene rendering built from composable GPU passes.
//!
//! # Overview
//!
//! - [`GraphicContext`] wraps one [`ContextProvider`] (GL3, GL1 or software)
//!   together with the framebuffer pool and the program cache.
//! - [`RenderPass`] is the trait passes implement. Passes declare typed
//!   [`InData`]/[`OutData`] ports as associated constants.
//! - [`Pipeline`] owns the passes and their wiring, orders them once at
//!   [`Pipeline::freeze`] and runs them each frame.
//! - [`FrameDriver`] presents finished frames through a [`WindowSurface`].
//! - [`passes`] holds the built-in passes and [`passes::standard_pipeline`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut gc = GraphicContext::headless(Size::new(640, 480));
//! let (mut pipeline, passes) =
//!     standard_pipeline(&mut gc, Color::BLACK, BloomSettings::default())?;
//! pipeline
//!     .pass_mut(passes.geometry)
//!     .unwrap()
//!     .push(Rectf::new(0.4, 0.4, 0.6, 0.6), Color::rgb(4.0, 4.0, 4.0));
//!
//! let mut driver = FrameDriver::new(gc.description(), &mut window)?;
//! driver.render_frame(&mut gc, &mut pipeline, &mut window, events, SwapInterval::Refreshes(1))?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod pass;
pub mod passes;
pub mod pipeline;
pub mod pool;
pub mod port;
pub mod present;
pub mod provider;
pub mod share;

pub use config::{CompositionMode, ContextDescription, SwapInterval};
pub use context::GraphicContext;
pub use error::PipelineError;
pub use pass::RenderPass;
pub use passes::{
    standard_pipeline, BloomPass, BloomSettings, BlurSettings, CompositePass, GaussianBlur,
    GaussianBlurPass, GeometryPass, OutputPass, StandardPasses, ViewportPass,
};
pub use pipeline::{FrameEvent, FrameStats, InPort, OutPort, PassHandle, Pipeline};
pub use pool::{PoolStats, PooledFramebuffer, ResourcePool};
pub use port::{InData, OutData, PassIo, PortDescriptor, PortDirection, PortValue};
pub use present::{FrameDriver, PresentStats, WindowSurface};
pub use provider::{ContextProvider, ProviderKind};
pub use share::{ShareHandle, ShareHandoff, SharedContextLease, SharedContextRegistry};
