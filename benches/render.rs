use camera_view::capture::{Frame, BYTES_PER_PIXEL};
use camera_view::render::{DisplayRenderer, Insets, Viewport};
use camera_view::reticle::ReticleConfig;
use camera_view::units::{LengthUnit, UnitsPerPixel};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn make_frame() -> Arc<Frame> {
    let (width, height) = (1920u32, 1080u32);
    let pixels = vec![0u8; (width * height) as usize * BYTES_PER_PIXEL];
    Arc::new(Frame::new(pixels, width, height, 1))
}

fn bench_render(c: &mut Criterion) {
    let frame = make_frame();
    let renderer = DisplayRenderer::default();
    let reticle = ReticleConfig::default().build();
    let viewport = Viewport::new(1280, 960).with_insets(Insets::uniform(4));
    let units_per_pixel = UnitsPerPixel::new(0.02, 0.02, LengthUnit::Millimeters);

    c.bench_function("render_unit_tick", |b| {
        b.iter(|| {
            renderer.render(
                black_box(&viewport),
                Some(&frame),
                &units_per_pixel,
                reticle.as_deref(),
            )
        });
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
