use criterion::{black_box, criterion_group, criterion_main, Criterion};

use citadel_core::{perft, Position};

fn perft_benchmark(c: &mut Criterion) {
    c.bench_function("perft_initial_d2", |b| {
        let mut pos = Position::initial();
        b.iter(|| black_box(perft(&mut pos, 2)));
    });

    c.bench_function("perft_initial_d3", |b| {
        let mut pos = Position::initial();
        b.iter(|| black_box(perft(&mut pos, 3)));
    });
}

criterion_group!(benches, perft_benchmark);
criterion_main!(benches);
