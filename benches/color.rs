use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};
use image_insight::analysis::{color::ColorAnalyzer, palette::PaletteExtractor};

fn gradient(width: u32, height: u32) -> DynamicImage {
    let mut image = RgbaImage::new(width, height);
    for (x, y, px) in image.enumerate_pixels_mut() {
        *px = Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255]);
    }
    DynamicImage::ImageRgba8(image)
}

fn bench_color_distribution(c: &mut Criterion) {
    let image = gradient(1024, 768);

    let mut group = c.benchmark_group("color_distribution");
    group.bench_function("parallel", |b| {
        let analyzer = ColorAnalyzer::new();
        b.iter(|| analyzer.analyze(black_box(&image)))
    });
    group.bench_function("sequential", |b| {
        let analyzer = ColorAnalyzer::new().with_parallel(false);
        b.iter(|| analyzer.analyze(black_box(&image)))
    });
    group.finish();
}

fn bench_palette(c: &mut Criterion) {
    let image = gradient(1024, 768);
    let extractor = PaletteExtractor::new(5);

    c.bench_function("palette", |b| b.iter(|| extractor.extract(black_box(&image))));
}

criterion_group!(benches, bench_color_distribution, bench_palette);
criterion_main!(benches);
