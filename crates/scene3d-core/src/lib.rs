//! Value types shared by every scene3d crate: geometry, colors, formats,
//! provider handles, program descriptions and the graphics error taxonomy.

pub mod caps;
pub mod color;
pub mod effect;
pub mod error;
pub mod format;
pub mod geometry;
pub mod handles;
pub mod kernel;
pub mod logging;
pub mod pixel_buffer;

pub use caps::{Api, Capabilities, Feature, GlVersion, GlslVersion};
pub use color::Color;
pub use effect::{
    BlendFactor, BlendState, BlurAxis, DrawCommand, Effect, Primitive, ReadBuffer, RenderTarget,
    Uniforms,
};
pub use error::{GraphicsError, ShaderStage};
pub use format::{PixelFormat, TextureFormat};
pub use geometry::{Rect, Rectf, Size};
pub use handles::{HandleMap, ProgramId, Texture, TextureId};
pub use kernel::{BlurKernel, MAX_BLUR_RADIUS};
pub use logging::{init_logging, LoggingConfig};
pub use pixel_buffer::PixelBuffer;
