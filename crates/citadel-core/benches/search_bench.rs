use criterion::{black_box, criterion_group, criterion_main, Criterion};

use citadel_core::{Position, SearchOptions, Searcher};

fn search_benchmark(c: &mut Criterion) {
    c.bench_function("search_initial_d4_hce", |b| {
        b.iter(|| {
            let mut pos = Position::initial();
            let mut searcher = Searcher::with_tt_size_mb(16);
            black_box(searcher.search(&mut pos, SearchOptions::depth(4)))
        });
    });

    c.bench_function("search_midgame_d3_hce", |b| {
        let fen = "clpisiplc/mm1mmm1mm/2m3m2/9/4W4/2M6/MM1MMMMMM/2C6/1LPISIPLC w Bb - 4 7";
        b.iter(|| {
            let mut pos = Position::from_fen(fen).unwrap();
            let mut searcher = Searcher::with_tt_size_mb(16);
            black_box(searcher.search(&mut pos, SearchOptions::depth(3)))
        });
    });
}

criterion_group!(benches, search_benchmark);
criterion_main!(benches);
