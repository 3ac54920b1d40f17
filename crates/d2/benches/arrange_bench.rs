//! Benchmarks for bed arrangement.
//!
//! Measures full `arrange` runs at a few item counts, serial and parallel,
//! and the cost of a single objective evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use platepack_d2::{
    arrange, Alignment, ArrangeParams, ArrangePolygon, Bin, Item, ItemId, PackContext, Scorer,
    AABB2D,
};

fn parts(n: usize) -> Vec<ArrangePolygon> {
    (0..n)
        .map(|i| {
            let w = 20.0 + (i as f64 * 3.0) % 30.0;
            let h = 15.0 + (i as f64 * 7.0) % 25.0;
            ArrangePolygon::rectangle(w, h).with_name(format!("R{}", i))
        })
        .collect()
}

fn bench_arrange(c: &mut Criterion) {
    let mut group = c.benchmark_group("arrange");
    group.sample_size(10);

    let bed = vec![(0.0, 0.0), (256.0, 0.0), (256.0, 256.0), (0.0, 256.0)];
    for &n in &[5, 10, 20] {
        for parallel in [false, true] {
            let params = ArrangeParams::new()
                .with_min_obj_distance(4.0)
                .with_parallel(parallel);
            let label = if parallel { "parallel" } else { "serial" };
            group.bench_with_input(BenchmarkId::new(label, n), &parts(n), |b, template| {
                b.iter(|| {
                    let mut items = template.clone();
                    let summary = arrange(black_box(&mut items), &[], &bed, &params);
                    black_box(summary)
                })
            });
        }
    }
    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let bin = Bin::Box(AABB2D::new(0.0, 0.0, 256.0, 256.0));
    let params = ArrangeParams::new();
    let scorer = Scorer::new(&bin, &params, Alignment::TopRight, 11);

    let mut items: Vec<Item> = (0..10)
        .filter_map(|i| {
            Item::rectangle(20.0, 20.0)
                .ok()
                .map(|item| item.with_translation(25.0 * (i % 5) as f64, 25.0 * (i / 5) as f64))
        })
        .collect();
    let candidate = match Item::rectangle(20.0, 20.0) {
        Ok(item) => item.with_translation(130.0, 0.0),
        Err(_) => return,
    };
    items.push(candidate.clone());
    let placed: Vec<ItemId> = (0..10).map(ItemId).collect();
    let ctx = PackContext {
        items: &items,
        bin_index: 0,
        placed: &placed,
        remaining: &[],
        current: ItemId(10),
    };
    let pile = scorer.snapshot(&ctx);

    c.bench_function("scorer_score", |b| {
        b.iter(|| scorer.score(black_box(&candidate), black_box(&pile)))
    });
    c.bench_function("scorer_snapshot", |b| b.iter(|| scorer.snapshot(black_box(&ctx))));
}

criterion_group!(benches, bench_arrange, bench_score);
criterion_main!(benches);
