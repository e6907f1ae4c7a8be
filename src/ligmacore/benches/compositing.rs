// SPDX-License-Identifier: GPL-3.0-or-later

use criterion::{criterion_group, criterion_main, Criterion};
use ligmacore::canvas::{ApplicationContext, Image};
use ligmacore::paint::convert::SourceKind;
use ligmacore::paint::rasterop::{combine_row, CompositeParams};
use ligmacore::paint::{BaseType, ImageType, Layer, LayerMode, PixelBuffer};

fn combine(over: &[u8], mode: LayerMode) {
    let mut base = [128u8, 128, 128, 128].repeat(64 * 64);
    let params = CompositeParams::new(200, mode);
    combine_row(
        &mut base,
        over,
        None,
        SourceKind::IntensityAlpha,
        &params,
        4,
        0,
        0,
    );
}

fn combine_benchmark(c: &mut Criterion) {
    let over = [255u8, 200, 100, 180].repeat(64 * 64);

    c.bench_function("combine normal", |b| {
        b.iter(|| combine(&over, LayerMode::Normal))
    });
    c.bench_function("combine multiply", |b| {
        b.iter(|| combine(&over, LayerMode::Multiply))
    });
    c.bench_function("combine hue", |b| {
        b.iter(|| combine(&over, LayerMode::Hue))
    });
    c.bench_function("combine dissolve", |b| {
        b.iter(|| combine(&over, LayerMode::Dissolve))
    });
}

fn stack_benchmark(c: &mut Criterion) {
    let mut ctx = ApplicationContext::default();
    let mut image = Image::new(&ctx, 512, 512, BaseType::Rgb);
    let modes = [LayerMode::Normal, LayerMode::Multiply, LayerMode::Screen, LayerMode::Overlay];
    for (i, mode) in modes.into_iter().enumerate() {
        let color = [40 * i as u8, 255 - 40 * i as u8, 128, 200];
        let buffer = PixelBuffer::filled(400, 400, ImageType::Rgba, &color);
        let mut layer = Layer::from_buffer(ctx.next_layer_id().unwrap(), "layer", buffer)
            .at(30 * i as i32, 20 * i as i32);
        layer.metadata.mode = mode;
        image.add_layer(layer).unwrap();
    }

    c.bench_function("recomposite 512x512 stack", |b| {
        b.iter(|| image.request_recomposite(0, 0, 512, 512).unwrap())
    });
}

criterion_group!(benches, combine_benchmark, stack_benchmark);
criterion_main!(benches);
