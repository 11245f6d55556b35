//! Art generation and grid frame benchmarks.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tiny_skia::Pixmap;
use txgrid::art::ArtEngine;
use txgrid::config::GridConfig;
use txgrid::session::{GridSession, ManualClock};
use txgrid::source::SyntheticSource;
use txgrid::viewport::ScreenSize;

fn bench_generate(c: &mut Criterion) {
    let engine = ArtEngine::new();
    let mut group = c.benchmark_group("generate_art");
    group.sample_size(20);

    // Tier, and so particle count, varies by hash.
    for hash in ["abc123", "common-sample", "legendary-sample"] {
        group.bench_function(format!("{hash}_400"), |b| {
            b.iter(|| black_box(engine.generate(black_box(hash), 400).expect("generate")))
        });
    }

    group.finish();
}

fn bench_grid_frame(c: &mut Criterion) {
    let clock = ManualClock::new(0.0);
    let config = GridConfig {
        art_size: 64,
        ..GridConfig::default()
    };
    let mut session = GridSession::new(config, ScreenSize::new(1280.0, 720.0), Box::new(clock.clone()));
    session
        .extend_pool(SyntheticSource::new(50, 1).signatures(), |_| {})
        .expect("pool");
    session.frame();
    clock.set(2000.0);
    session.frame();

    let mut pixmap = Pixmap::new(1280, 720).expect("pixmap");
    c.bench_function("grid_frame_720p_default_zoom", |b| {
        b.iter(|| black_box(session.draw(&mut pixmap)))
    });
}

criterion_group!(benches, bench_generate, bench_grid_frame);
criterion_main!(benches);
