//! Frame presentation: buffer swaps at a controlled cadence and the
//! read-back paths used by layered windows.

use std::thread;
use std::time::Duration;

use scene3d_core::{Feature, GraphicsError, PixelBuffer, ReadBuffer, Rect};
use tracing::{debug, trace, warn};

use crate::config::{CompositionMode, ContextDescription, SwapInterval};
use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pipeline::{FrameEvent, FrameStats, Pipeline};

/// The window layer's side of presentation.
pub trait WindowSurface {
    /// Whether the window can change its swap interval. Without it the
    /// driver emulates vsync by sleeping.
    fn supports_swap_control(&self) -> bool;

    fn set_swap_interval(&mut self, interval: SwapInterval) -> Result<(), GraphicsError>;

    fn swap_buffers(&mut self) -> Result<(), GraphicsError>;

    /// Receives a full-window read-back, RGBA8 or alpha-only.
    fn update_layered(&mut self, pixels: &PixelBuffer) -> Result<(), GraphicsError>;

    /// Receives the pixels of `rect` when the region could not be blitted.
    fn update_region(&mut self, rect: Rect, pixels: &PixelBuffer) -> Result<(), GraphicsError>;
}

/// Presentation counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub presents: u64,
    pub swaps: u64,
    pub readbacks: u64,
    pub read_bytes: u64,
    pub interval_changes: u64,
    /// Refreshes slept through when vsync is emulated.
    pub emulated_waits: u64,
}

/// Drives [`Pipeline::execute`] and presentation for one window.
#[derive(Debug)]
pub struct FrameDriver {
    composition: CompositionMode,
    refresh_rate: f64,
    /// Interval the description asked for, used by vsync emulation when a
    /// present requests the driver default.
    default_interval: SwapInterval,
    /// Interval last applied to the window, `None` while the driver default
    /// is in effect.
    current_interval: Option<SwapInterval>,
    stats: PresentStats,
}

impl FrameDriver {
    /// Applies the description's swap interval, unless it is the driver
    /// default or the window has no swap control.
    pub fn new(
        description: &ContextDescription,
        window: &mut dyn WindowSurface,
    ) -> Result<Self, GraphicsError> {
        let mut driver = Self {
            composition: description.composition,
            refresh_rate: description.refresh_rate,
            default_interval: description.swap_interval.normalized(),
            current_interval: None,
            stats: PresentStats::default(),
        };
        let interval = driver.default_interval;
        if !interval.is_driver_default() && window.supports_swap_control() {
            window.set_swap_interval(interval)?;
            driver.current_interval = Some(interval);
            driver.stats.interval_changes += 1;
        }
        debug!(composition = ?driver.composition, ?interval, "frame driver created");
        Ok(driver)
    }

    pub fn composition(&self) -> CompositionMode {
        self.composition
    }

    pub fn current_interval(&self) -> Option<SwapInterval> {
        self.current_interval
    }

    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    /// Flushes, then shows the frame according to the composition mode.
    ///
    /// Swap failures are returned as is; the frame is lost and nothing is
    /// retried.
    pub fn present(
        &mut self,
        gc: &mut GraphicContext,
        window: &mut dyn WindowSurface,
        interval: SwapInterval,
    ) -> Result<(), GraphicsError> {
        let interval = interval.normalized();
        gc.flush();
        self.stats.presents += 1;

        if self.composition == CompositionMode::LayeredReadback {
            let full = gc.viewport_rect();
            let pixels = self.read_back(gc, ReadBuffer::Back, full)?;
            return window.update_layered(&pixels);
        }

        self.apply_interval(window, interval)?;
        window.swap_buffers()?;
        gc.buffers_swapped();
        self.stats.swaps += 1;
        trace!(swaps = self.stats.swaps, "buffers swapped");

        if self.composition == CompositionMode::LayeredAlpha {
            let full = gc.viewport_rect();
            let pixels = self.read_back(gc, ReadBuffer::Front, full)?;
            window.update_layered(&pixels.to_alpha())?;
        }

        self.emulate_vsync(window, interval);
        Ok(())
    }

    /// Shows only `rect` of the back buffer.
    pub fn update(
        &mut self,
        gc: &mut GraphicContext,
        window: &mut dyn WindowSurface,
        rect: Rect,
    ) -> Result<(), GraphicsError> {
        let rect = rect.clamped_to(gc.viewport());
        if rect.is_empty() {
            return Ok(());
        }
        gc.flush();

        let full = gc.viewport_rect();
        match self.composition {
            CompositionMode::LayeredReadback => {
                let pixels = self.read_back(gc, ReadBuffer::Back, full)?;
                window.update_layered(&pixels)
            }
            CompositionMode::LayeredAlpha => {
                // The region reaches the front buffer first; alpha is then
                // taken from what is visible.
                let buffer = match gc.blit_back_to_front(rect) {
                    Ok(()) => ReadBuffer::Front,
                    Err(GraphicsError::UnsupportedFeature(Feature::FramebufferBlit)) => {
                        debug!(?rect, "region blit unsupported, reading alpha from the back buffer");
                        ReadBuffer::Back
                    }
                    Err(err) => return Err(err),
                };
                let pixels = self.read_back(gc, buffer, full)?;
                window.update_layered(&pixels.to_alpha())
            }
            CompositionMode::Standard => match gc.blit_back_to_front(rect) {
                Err(GraphicsError::UnsupportedFeature(Feature::FramebufferBlit)) => {
                    debug!(?rect, "region blit unsupported, reading pixels back");
                    let pixels = self.read_back(gc, ReadBuffer::Back, rect)?;
                    window.update_region(rect, &pixels)
                }
                other => other,
            },
        }
    }

    /// Drains `events`, executes one frame and presents it.
    pub fn render_frame(
        &mut self,
        gc: &mut GraphicContext,
        pipeline: &mut Pipeline,
        window: &mut dyn WindowSurface,
        events: impl IntoIterator<Item = FrameEvent>,
        interval: SwapInterval,
    ) -> Result<FrameStats, PipelineError> {
        let stats = pipeline.execute(gc, events)?;
        self.present(gc, window, interval)?;
        Ok(stats)
    }

    fn apply_interval(
        &mut self,
        window: &mut dyn WindowSurface,
        interval: SwapInterval,
    ) -> Result<(), GraphicsError> {
        if interval.is_driver_default()
            || self.current_interval == Some(interval)
            || !window.supports_swap_control()
        {
            return Ok(());
        }
        window.set_swap_interval(interval)?;
        self.current_interval = Some(interval);
        self.stats.interval_changes += 1;
        Ok(())
    }

    fn emulate_vsync(&mut self, window: &dyn WindowSurface, interval: SwapInterval) {
        if window.supports_swap_control() {
            return;
        }
        let interval = if interval.is_driver_default() {
            self.default_interval
        } else {
            interval
        };
        let SwapInterval::Refreshes(n) = interval else {
            return;
        };
        if self.refresh_rate <= 0.0 || !self.refresh_rate.is_finite() {
            warn!(rate = self.refresh_rate, "invalid refresh rate, vsync not emulated");
            return;
        }
        self.stats.emulated_waits += u64::from(n);
        thread::sleep(Duration::from_secs_f64(f64::from(n) / self.refresh_rate));
    }

    fn read_back(
        &mut self,
        gc: &mut GraphicContext,
        buffer: ReadBuffer,
        rect: Rect,
    ) -> Result<PixelBuffer, GraphicsError> {
        let pixels = gc.read_pixels(buffer, rect)?;
        self.stats.readbacks += 1;
        self.stats.read_bytes += pixels.data().len() as u64;
        Ok(pixels)
    }
}
