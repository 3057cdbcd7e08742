use scene3d_core::GraphicsError;
use thiserror::Error;

/// Failures of pipeline assembly and frame execution.
///
/// Wiring errors are raised while the pipeline is built and leave it
/// unchanged. Errors during [`crate::Pipeline::execute`] abandon the frame.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input `{pass}.{port}` is not connected")]
    UnboundPort { pass: String, port: &'static str },

    #[error("input `{pass}.{port}` was read before its producer ran this frame")]
    StaleData { pass: String, port: &'static str },

    #[error("cannot connect `{from}` ({found}) to `{to}` ({expected})")]
    TypeMismatch {
        from: String,
        to: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("pass wiring contains a cycle through {passes:?}")]
    CycleDetected { passes: Vec<String> },

    #[error("pipeline is frozen")]
    PipelineFrozen,

    #[error("pipeline must be frozen before it executes")]
    NotFrozen,

    #[error("no pass with index {0}")]
    UnknownPass(usize),

    #[error("pass `{pass}` has no port `{port}`")]
    UnknownPort { pass: String, port: String },

    #[error("input `{pass}.{port}` is already connected")]
    AlreadyBound { pass: String, port: &'static str },

    #[error("pass `{pass}` declares port `{port}` twice")]
    DuplicatePort { pass: String, port: &'static str },

    #[error("pass `{pass}` did not write output `{port}`")]
    OutputNotProduced { pass: String, port: &'static str },

    #[error("pass `{pass}` wrote output `{port}` twice in one frame")]
    OutputAlreadyWritten { pass: String, port: &'static str },

    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error("pass `{pass}` failed")]
    Pass {
        pass: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Wraps a failure from a user-defined pass.
    pub fn pass(pass: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        PipelineError::Pass {
            pass: pass.into(),
            source: source.into(),
        }
    }
}
