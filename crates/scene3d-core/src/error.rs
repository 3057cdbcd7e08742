use std::fmt;

use thiserror::Error;

use crate::caps::Feature;

/// Shader stage a compile error originates from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures reported by context providers.
///
/// Only [`GraphicsError::UnsupportedFeature`] is recoverable; callers with a
/// defined fallback catch it and take the lower-capability path.
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link: {log}")]
    ShaderLink { log: String },

    #[error("{0} is not supported by this context")]
    UnsupportedFeature(Feature),

    #[error("failed to create {what}: {reason}")]
    ResourceCreation { what: &'static str, reason: String },

    #[error("unknown {kind} handle {id}")]
    UnknownResource { kind: &'static str, id: u32 },

    #[error("uniform `{0}` was not supplied")]
    MissingUniform(&'static str),

    #[error("texture {0} is both sampled and rendered to")]
    FeedbackLoop(u32),

    #[error("pixel data has {actual} bytes, expected {expected}")]
    InvalidPixelData { expected: usize, actual: usize },

    #[error("context creation failed: {0}")]
    ContextCreation(String),

    #[error("graphics context was lost")]
    ContextLost,

    #[error("cannot switch the current context while a pass is executing")]
    ContextSwitchDuringPass,

    #[error("buffer swap failed: {0}")]
    SwapFailed(String),

    #[error("invalid swap interval {0}, expected -1 or a non-negative refresh count")]
    InvalidSwapInterval(i32),

    #[error("pixel read-back failed: {0}")]
    Readback(String),
}

impl GraphicsError {
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GraphicsError::UnsupportedFeature(_))
    }
}
