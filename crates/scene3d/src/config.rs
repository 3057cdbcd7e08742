//! Context and presentation settings supplied by the window layer.

use scene3d_core::GraphicsError;

/// How many display refreshes a buffer swap waits for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum SwapInterval {
    /// Leave whatever the driver or window currently uses (`-1`).
    #[default]
    DriverDefault,
    /// Swap immediately (`0`).
    Immediate,
    /// Wait for the n-th refresh, `n >= 1`.
    Refreshes(u32),
}

impl SwapInterval {
    /// Parses the integer convention: `-1` driver default, `0` no wait,
    /// `n` wait n refreshes.
    pub fn from_raw(raw: i32) -> Result<Self, GraphicsError> {
        match raw {
            -1 => Ok(SwapInterval::DriverDefault),
            0 => Ok(SwapInterval::Immediate),
            n if n > 0 => Ok(SwapInterval::Refreshes(n as u32)),
            n => Err(GraphicsError::InvalidSwapInterval(n)),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            SwapInterval::DriverDefault => -1,
            SwapInterval::Immediate => 0,
            SwapInterval::Refreshes(n) => n.min(i32::MAX as u32) as i32,
        }
    }

    /// Folds `Refreshes(0)` into `Immediate`, the one spelling of "no wait".
    pub fn normalized(self) -> Self {
        match self {
            SwapInterval::Refreshes(0) => SwapInterval::Immediate,
            other => other,
        }
    }

    #[inline]
    pub fn is_driver_default(self) -> bool {
        self == SwapInterval::DriverDefault
    }

    /// Refreshes to wait, `None` for the driver default.
    pub fn refreshes(self) -> Option<u32> {
        match self {
            SwapInterval::DriverDefault => None,
            SwapInterval::Immediate => Some(0),
            SwapInterval::Refreshes(n) => Some(n),
        }
    }
}

/// How a finished frame reaches the screen.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompositionMode {
    /// Plain buffer swap.
    #[default]
    Standard,
    /// Swap, then hand the frame's alpha channel to the OS compositor.
    LayeredAlpha,
    /// No swap: the rendered buffer is read back and drawn by the window
    /// layer.
    LayeredReadback,
}

impl CompositionMode {
    #[inline]
    pub fn needs_readback(self) -> bool {
        self != CompositionMode::Standard
    }
}

/// Requested context properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDescription {
    pub version_major: u32,
    pub version_minor: u32,
    /// Accept a lower GL version than requested, falling back to GL1.
    pub allow_lower_versions: bool,
    pub swap_interval: SwapInterval,
    pub composition: CompositionMode,
    /// Reset GL bindings after each frame for hosts that share the context.
    pub restore_host_state: bool,
    /// Display refresh rate in Hz, used to emulate vsync when the window
    /// cannot.
    pub refresh_rate: f64,
}

impl Default for ContextDescription {
    fn default() -> Self {
        Self {
            version_major: 3,
            version_minor: 2,
            allow_lower_versions: true,
            swap_interval: SwapInterval::DriverDefault,
            composition: CompositionMode::Standard,
            restore_host_state: false,
            refresh_rate: 60.0,
        }
    }
}

impl ContextDescription {
    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self
    }

    pub fn with_allow_lower_versions(mut self, allow: bool) -> Self {
        self.allow_lower_versions = allow;
        self
    }

    pub fn with_swap_interval(mut self, interval: SwapInterval) -> Self {
        self.swap_interval = interval;
        self
    }

    pub fn with_composition(mut self, mode: CompositionMode) -> Self {
        self.composition = mode;
        self
    }

    pub fn with_restore_host_state(mut self, restore: bool) -> Self {
        self.restore_host_state = restore;
        self
    }

    pub fn with_refresh_rate(mut self, hz: f64) -> Self {
        self.refresh_rate = hz;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_intervals_follow_the_integer_convention() {
        assert_eq!(SwapInterval::from_raw(-1).unwrap(), SwapInterval::DriverDefault);
        assert_eq!(SwapInterval::from_raw(0).unwrap(), SwapInterval::Immediate);
        assert_eq!(SwapInterval::from_raw(3).unwrap(), SwapInterval::Refreshes(3));
        assert!(matches!(
            SwapInterval::from_raw(-2),
            Err(GraphicsError::InvalidSwapInterval(-2))
        ));
        assert_eq!(SwapInterval::Refreshes(3).raw(), 3);
    }

    #[test]
    fn zero_refreshes_means_immediate() {
        assert_eq!(SwapInterval::Refreshes(0).normalized(), SwapInterval::Immediate);
        assert_eq!(SwapInterval::Refreshes(2).normalized(), SwapInterval::Refreshes(2));
        assert_eq!(SwapInterval::DriverDefault.normalized(), SwapInterval::DriverDefault);
    }

    #[test]
    fn default_requests_a_gl32_context() {
        let desc = ContextDescription::default();
        assert_eq!((desc.version_major, desc.version_minor), (3, 2));
        assert!(desc.allow_lower_versions);
        assert!(!desc.composition.needs_readback());
    }
}
