mod support;

use std::time::Instant;

use scene3d::{
    standard_pipeline, BloomSettings, CompositionMode, ContextDescription, FrameDriver,
    SwapInterval,
};
use scene3d_core::{Color, GraphicsError, PixelFormat, Rect, RenderTarget, Size};

use support::{
    context_with_description, limited_context, limited_context_with_description, software_context,
    MockWindow,
};

#[test]
fn swap_intervals_select_the_wait_behavior() {
    let mut gc = software_context(4, 4);
    let mut window = MockWindow::new();
    window.driver_default = 2;
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    assert!(window.interval_calls.is_empty());

    let intervals = [
        SwapInterval::DriverDefault,
        SwapInterval::Immediate,
        SwapInterval::Refreshes(1),
        SwapInterval::Refreshes(3),
        SwapInterval::Refreshes(3),
        SwapInterval::DriverDefault,
    ];
    for interval in intervals {
        driver.present(&mut gc, &mut window, interval).unwrap();
    }

    // -1 waits whatever the driver uses and never touches the setting.
    assert_eq!(window.wait_ticks, vec![2, 0, 1, 3, 3, 3]);
    assert_eq!(
        window.interval_calls,
        vec![
            SwapInterval::Immediate,
            SwapInterval::Refreshes(1),
            SwapInterval::Refreshes(3),
        ]
    );
    assert_eq!(driver.current_interval(), Some(SwapInterval::Refreshes(3)));
}

#[test]
fn zero_refreshes_reuse_the_immediate_setting() {
    let mut gc = software_context(4, 4);
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Immediate)
        .unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(0))
        .unwrap();

    assert_eq!(window.interval_calls, vec![SwapInterval::Immediate]);
    assert_eq!(window.wait_ticks, vec![0, 0]);
    assert_eq!(driver.current_interval(), Some(SwapInterval::Immediate));
}

#[test]
fn description_interval_is_applied_once() {
    let desc = ContextDescription::default().with_swap_interval(SwapInterval::Refreshes(2));
    let mut gc = context_with_description(Size::new(4, 4), desc);
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(2))
        .unwrap();
    assert_eq!(window.interval_calls, vec![SwapInterval::Refreshes(2)]);
    assert_eq!(window.wait_ticks, vec![2]);
}

#[test]
fn standard_mode_never_reads_back() {
    let mut gc = software_context(8, 8);
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(1))
        .unwrap();

    let stats = gc.software().unwrap().stats();
    assert_eq!(stats.readbacks, 0);
    assert_eq!(stats.swaps, 1);
    assert_eq!(stats.flushes, 1);
    assert_eq!(driver.stats().read_bytes, 0);
    assert!(window.layered.is_empty());
}

#[test]
fn layered_alpha_hands_over_one_byte_per_pixel() {
    let desc = ContextDescription::default().with_composition(CompositionMode::LayeredAlpha);
    let mut gc = context_with_description(Size::new(5, 3), desc);
    gc.clear(RenderTarget::Default, Color::rgba(1.0, 0.0, 0.0, 0.5))
        .unwrap();

    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Immediate)
        .unwrap();

    assert_eq!(window.swaps(), 1);
    let alpha = &window.layered[0];
    assert_eq!(alpha.format(), PixelFormat::Alpha8);
    assert_eq!(alpha.data().len(), 15);
    assert!(alpha.data().iter().all(|&a| a == 128));
}

#[test]
fn layered_readback_skips_the_swap() {
    let desc = ContextDescription::default().with_composition(CompositionMode::LayeredReadback);
    let mut gc = context_with_description(Size::new(4, 2), desc);
    gc.clear(RenderTarget::Default, Color::WHITE).unwrap();

    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(1))
        .unwrap();

    assert_eq!(window.swaps(), 0);
    assert!(window.interval_calls.is_empty());
    let pixels = &window.layered[0];
    assert_eq!(pixels.format(), PixelFormat::Rgba8);
    assert_eq!(pixels.pitch(), 16);
    assert!(pixels.data().iter().all(|&b| b == 255));
    assert_eq!(driver.stats().read_bytes, 32);
}

#[test]
fn partial_update_blits_the_clamped_region() {
    let mut gc = software_context(4, 4);
    gc.clear(RenderTarget::Default, Color::WHITE).unwrap();
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    driver
        .update(&mut gc, &mut window, Rect::new(-3, 1, 2, 3))
        .unwrap();
    assert!(window.regions.is_empty());

    let front = gc.software().unwrap().front_buffer();
    for y in 0..4 {
        for x in 0..4 {
            let inside = Rect::new(0, 1, 2, 3).contains(x, y);
            let expected = if inside { [1.0; 4] } else { [0.0; 4] };
            assert_eq!(front.get(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn partial_update_without_blit_reads_the_region_back() {
    let mut gc = limited_context(Size::new(4, 4), false, true);
    gc.clear(RenderTarget::Default, Color::WHITE).unwrap();
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    driver
        .update(&mut gc, &mut window, Rect::new(2, 2, 100, 100))
        .unwrap();
    let (rect, pixels) = &window.regions[0];
    assert_eq!(*rect, Rect::new(2, 2, 4, 4));
    assert_eq!((pixels.width(), pixels.height()), (2, 2));

    // Entirely outside the viewport: nothing to do.
    driver
        .update(&mut gc, &mut window, Rect::new(10, 10, 20, 20))
        .unwrap();
    assert_eq!(window.regions.len(), 1);
    assert_eq!(driver.stats().readbacks, 1);
}

#[test]
fn layered_alpha_update_reaches_the_front_buffer() {
    let desc = ContextDescription::default().with_composition(CompositionMode::LayeredAlpha);
    let mut gc = context_with_description(Size::new(4, 4), desc);
    gc.clear(RenderTarget::Default, Color::rgba(1.0, 0.0, 0.0, 1.0))
        .unwrap();
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    driver
        .update(&mut gc, &mut window, Rect::new(0, 0, 2, 4))
        .unwrap();

    let sw = gc.software().unwrap();
    assert_eq!(sw.stats().blits, 1);
    assert_eq!(sw.front_buffer().get(1, 1), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(sw.front_buffer().get(3, 1), [0.0; 4]);

    // Alpha comes from the front buffer: opaque where the region landed.
    let alpha = &window.layered[0];
    assert_eq!(alpha.format(), PixelFormat::Alpha8);
    assert_eq!(alpha.data().len(), 16);
    assert_eq!(alpha.pixel(1, 1)[0], 255);
    assert_eq!(alpha.pixel(3, 1)[0], 0);
    assert_eq!(window.swaps(), 0);
}

#[test]
fn layered_alpha_update_without_blit_reads_the_back_buffer() {
    let desc = ContextDescription::default().with_composition(CompositionMode::LayeredAlpha);
    let mut gc = limited_context_with_description(Size::new(4, 4), desc, false, true);
    gc.clear(RenderTarget::Default, Color::rgba(1.0, 0.0, 0.0, 1.0))
        .unwrap();
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    driver
        .update(&mut gc, &mut window, Rect::new(0, 0, 2, 4))
        .unwrap();
    assert!(window.layered[0].data().iter().all(|&a| a == 255));
}

#[test]
fn swap_failures_reach_the_caller() {
    let mut gc = software_context(4, 4);
    let mut window = MockWindow::new();
    window.fail_swaps = true;
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    let err = driver
        .present(&mut gc, &mut window, SwapInterval::Immediate)
        .unwrap_err();
    assert!(matches!(err, GraphicsError::SwapFailed(_)));
    assert_eq!(gc.software().unwrap().stats().swaps, 0);
    assert_eq!(driver.stats().swaps, 0);
}

#[test]
fn vsync_is_emulated_without_swap_control() {
    let desc = ContextDescription::default().with_refresh_rate(1000.0);
    let mut gc = context_with_description(Size::new(2, 2), desc);
    let mut window = MockWindow::without_swap_control();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    let start = Instant::now();
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(2))
        .unwrap();
    assert!(start.elapsed().as_secs_f64() >= 0.002);
    driver
        .present(&mut gc, &mut window, SwapInterval::Immediate)
        .unwrap();
    driver
        .present(&mut gc, &mut window, SwapInterval::DriverDefault)
        .unwrap();

    assert_eq!(driver.stats().emulated_waits, 2);
    assert!(window.interval_calls.is_empty());
    assert_eq!(window.swaps(), 3);
}

#[test]
fn emulated_vsync_uses_the_description_interval_for_driver_default() {
    let desc = ContextDescription::default()
        .with_refresh_rate(1000.0)
        .with_swap_interval(SwapInterval::Refreshes(3));
    let mut gc = context_with_description(Size::new(2, 2), desc);
    let mut window = MockWindow::without_swap_control();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    driver
        .present(&mut gc, &mut window, SwapInterval::DriverDefault)
        .unwrap();
    assert_eq!(driver.stats().emulated_waits, 3);
    driver
        .present(&mut gc, &mut window, SwapInterval::Refreshes(1))
        .unwrap();
    assert_eq!(driver.stats().emulated_waits, 4);
}

#[test]
fn render_frame_executes_then_presents() {
    let mut gc = software_context(8, 8);
    let (mut pipeline, _) =
        standard_pipeline(&mut gc, Color::BLACK, BloomSettings::default()).unwrap();
    let mut window = MockWindow::new();
    let mut driver = FrameDriver::new(gc.description(), &mut window).unwrap();

    let stats = driver
        .render_frame(&mut gc, &mut pipeline, &mut window, [], SwapInterval::Refreshes(1))
        .unwrap();
    assert_eq!(stats.frame, 1);
    assert_eq!(stats.passes_run, 5);
    assert_eq!(window.swaps(), 1);
    pipeline.destroy(&mut gc);
}
