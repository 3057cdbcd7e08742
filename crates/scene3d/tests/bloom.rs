mod support;

use scene3d::{
    standard_pipeline, BloomPass, BloomSettings, BlurSettings, CompositePass, GeometryPass,
    Pipeline, StandardPasses,
};
use scene3d_core::{Color, Rectf, Size, TextureFormat};

use support::{limited_context, software_context, texels};

const SIZE: u32 = 16;

fn settings() -> BloomSettings {
    BloomSettings::default()
        .with_threshold(1.0)
        .with_downscale(2)
        .with_blur(BlurSettings::default().with_radius(2))
}

fn scene(pipeline: &mut Pipeline, passes: &StandardPasses, color: Color) {
    let geometry: &mut GeometryPass = pipeline.pass_mut(passes.geometry).unwrap();
    geometry.push(Rectf::new(0.4, 0.4, 0.6, 0.6), color);
}

fn at(texels: &[[f32; 4]], x: u32, y: u32) -> [f32; 4] {
    texels[(y * SIZE + x) as usize]
}

#[test]
fn bright_geometry_glows_past_its_edges() {
    let mut gc = software_context(SIZE, SIZE);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, settings()).unwrap();
    scene(&mut pipeline, &passes, Color::rgb(4.0, 4.0, 4.0));
    pipeline.execute(&mut gc, []).unwrap();

    let scene_color = pipeline
        .read_output(passes.geometry.output(GeometryPass::SCENE_COLOR))
        .unwrap();
    let composited = pipeline
        .read_output(passes.composite.output(CompositePass::COMPOSITED))
        .unwrap();
    let scene = texels(&gc, scene_color);
    let out = texels(&gc, composited);

    // The square covers pixels 6..10; pixel 5 is just outside it.
    assert_eq!(at(&scene, 5, 8)[0], 0.0);
    assert!(at(&out, 5, 8)[0] > 0.0);
    // Inside, bloom adds to the scene color.
    assert!(at(&out, 8, 8)[0] > at(&scene, 8, 8)[0]);
    // Far corners stay dark.
    assert_eq!(at(&out, 0, 0)[0], 0.0);
    assert_eq!(at(&out, 15, 15)[0], 0.0);

    // The finished image reached the default framebuffer.
    let back = gc.software().unwrap().back_buffer();
    assert_eq!(back.get(8, 8), [1.0; 4]);
    assert!(back.get(5, 8)[0] > 0.0);
    pipeline.destroy(&mut gc);
}

#[test]
fn geometry_below_threshold_adds_nothing() {
    let mut gc = software_context(SIZE, SIZE);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, settings()).unwrap();
    scene(&mut pipeline, &passes, Color::rgb(0.5, 0.5, 0.5));
    pipeline.execute(&mut gc, []).unwrap();

    let bloom = pipeline
        .read_output(passes.bloom.output(BloomPass::BLOOM_CONTRIBUTION))
        .unwrap();
    assert_eq!(bloom.size, Size::new(SIZE / 2, SIZE / 2));
    assert!(texels(&gc, bloom)
        .iter()
        .all(|t| t[0] == 0.0 && t[1] == 0.0 && t[2] == 0.0));

    let scene = texels(
        &gc,
        pipeline
            .read_output(passes.geometry.output(GeometryPass::SCENE_COLOR))
            .unwrap(),
    );
    let out = texels(
        &gc,
        pipeline
            .read_output(passes.composite.output(CompositePass::COMPOSITED))
            .unwrap(),
    );
    assert_eq!(scene, out);
    pipeline.destroy(&mut gc);
}

#[test]
fn raising_the_threshold_takes_effect_next_frame() {
    let mut gc = software_context(SIZE, SIZE);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, settings()).unwrap();
    scene(&mut pipeline, &passes, Color::rgb(4.0, 4.0, 4.0));
    pipeline.execute(&mut gc, []).unwrap();

    pipeline.pass_mut(passes.bloom).unwrap().set_threshold(8.0);
    pipeline.execute(&mut gc, []).unwrap();
    let bloom = pipeline
        .read_output(passes.bloom.output(BloomPass::BLOOM_CONTRIBUTION))
        .unwrap();
    assert!(texels(&gc, bloom).iter().all(|t| t[0] == 0.0));
    assert_eq!(pipeline.frame(), 2);
    pipeline.destroy(&mut gc);
}

#[test]
fn output_copies_with_a_draw_when_blit_is_missing() {
    let mut gc = limited_context(Size::new(SIZE, SIZE), false, true);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, settings()).unwrap();
    scene(&mut pipeline, &passes, Color::rgb(4.0, 4.0, 4.0));
    pipeline.execute(&mut gc, []).unwrap();

    let sw = gc.software().unwrap();
    assert_eq!(sw.stats().blits, 0);
    assert_eq!(sw.back_buffer().get(8, 8), [1.0; 4]);
    assert!(sw.back_buffer().get(5, 8)[0] > 0.0);
    pipeline.destroy(&mut gc);
}

#[test]
fn eight_bit_targets_are_used_without_float_support() {
    let mut gc = limited_context(Size::new(SIZE, SIZE), true, false);
    let (mut pipeline, passes) = standard_pipeline(&mut gc, Color::BLACK, settings()).unwrap();
    scene(&mut pipeline, &passes, Color::rgb(4.0, 4.0, 4.0));
    pipeline.execute(&mut gc, []).unwrap();

    let scene_color = pipeline
        .read_output(passes.geometry.output(GeometryPass::SCENE_COLOR))
        .unwrap();
    let bloom = pipeline
        .read_output(passes.bloom.output(BloomPass::BLOOM_CONTRIBUTION))
        .unwrap();
    assert_eq!(scene_color.format, TextureFormat::Rgba8);
    assert_eq!(bloom.format, TextureFormat::Rgba8);
    // Clamped to 1.0, the square no longer exceeds the threshold.
    assert!(texels(&gc, bloom).iter().all(|t| t[0] == 0.0));
    pipeline.destroy(&mut gc);
}
