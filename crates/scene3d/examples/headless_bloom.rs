//! Renders a few frames of the standard bloom pipeline on the software
//! provider and prints a coarse preview of the result.
//!
//! ```text
//! RUST_LOG=debug cargo run -p scene3d --example headless_bloom
//! ```

use anyhow::Context as _;
use scene3d::{
    standard_pipeline, BloomSettings, BlurSettings, CompositionMode, ContextDescription,
    ContextProvider, FrameDriver, FrameEvent, GraphicContext, SwapInterval, WindowSurface,
};
use scene3d_core::{init_logging, Color, GraphicsError, LoggingConfig, PixelBuffer, Rect, Rectf, Size};
use scene3d_sw::SoftwareProvider;
use tracing::info;

/// Keeps the last layered update, standing in for an OS window.
#[derive(Default)]
struct OffscreenWindow {
    last_frame: Option<PixelBuffer>,
}

impl WindowSurface for OffscreenWindow {
    fn supports_swap_control(&self) -> bool {
        false
    }

    fn set_swap_interval(&mut self, _interval: SwapInterval) -> Result<(), GraphicsError> {
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), GraphicsError> {
        Ok(())
    }

    fn update_layered(&mut self, pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        self.last_frame = Some(pixels.clone());
        Ok(())
    }

    fn update_region(&mut self, _rect: Rect, _pixels: &PixelBuffer) -> Result<(), GraphicsError> {
        Ok(())
    }
}

fn preview(pixels: &PixelBuffer) -> String {
    const RAMP: &[u8] = b" .:-=+*#%@";
    let mut out = String::new();
    for y in (0..pixels.height()).step_by(2) {
        for x in 0..pixels.width() {
            let px = pixels.pixel(x, y);
            let luma = (px[0] as u32 * 2 + px[1] as u32 * 7 + px[2] as u32) / 10;
            out.push(RAMP[luma as usize * (RAMP.len() - 1) / 255] as char);
        }
        out.push('\n');
    }
    out
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let description = ContextDescription::default()
        .with_composition(CompositionMode::LayeredReadback)
        .with_refresh_rate(60.0);
    let mut gc = GraphicContext::new(
        ContextProvider::Software(SoftwareProvider::new(Size::new(48, 24))),
        description,
        None,
    );

    let bloom = BloomSettings::default()
        .with_threshold(0.9)
        .with_blur(BlurSettings::default().with_radius(3))
        .with_strength(0.8);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, bloom)?;
    let geometry = pipeline
        .pass_mut(passes.geometry)
        .context("geometry pass missing from the standard pipeline")?;
    geometry.push(Rectf::new(0.2, 0.35, 0.3, 0.65), Color::rgb(3.0, 2.0, 0.5));
    geometry.push(Rectf::new(0.6, 0.3, 0.8, 0.7), Color::rgb(0.4, 0.4, 0.8));

    let mut window = OffscreenWindow::default();
    let mut driver = FrameDriver::new(gc.description(), &mut window)?;

    let mut events = vec![FrameEvent::Resized(Size::new(64, 24))];
    for _ in 0..3 {
        let stats = driver.render_frame(
            &mut gc,
            &mut pipeline,
            &mut window,
            events.drain(..),
            SwapInterval::Refreshes(1),
        )?;
        info!(frame = stats.frame, elapsed = ?stats.elapsed, "frame rendered");
    }
    info!(pool = ?gc.pool_stats(), present = ?driver.stats(), "done");

    if let Some(frame) = &window.last_frame {
        println!("{}", preview(frame));
    }
    pipeline.destroy(&mut gc);
    Ok(())
}
