//! Tracing subscriber bootstrap for applications and tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives such as `scene3d=debug`. Falls back to `RUST_LOG`,
    /// then `info`.
    pub env_filter: Option<String>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.env_filter = Some(directives.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new("info")),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

/// Installs a global fmt subscriber. Later calls are no-ops, as is the first
/// call when another subscriber is already installed.
pub fn init_logging(config: LoggingConfig) {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(config.filter())
            .with_ansi(config.ansi)
            .with_target(true)
            .try_init();
    });
}
