//! # Sparsification Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::eqpt::plan::Plan;
use flt_lib::path_ingest::{sparsify, to_ctrl_frame};

fn sparsify_benchmark(c: &mut Criterion) {
    // ---- Build a dense planner output ----

    // A 50 m spiral sampled every centimetre, as a grid planner on a fine map would emit
    let points: Vec<(f64, f64)> = (0..5000)
        .map(|i| {
            let t = i as f64 * 0.01;
            (t * (t * 0.5).cos(), t * (t * 0.5).sin())
        })
        .collect();
    let plan = Plan::from_xy(&points);

    c.bench_function("to_ctrl_frame", |b| {
        b.iter(|| to_ctrl_frame(black_box(&plan.poses), -1.0))
    });

    let ctrl_points = to_ctrl_frame(&plan.poses, -1.0);
    c.bench_function("sparsify", |b| {
        b.iter(|| sparsify(black_box(&ctrl_points), 0.3))
    });
}

criterion_group!(benches, sparsify_benchmark);
criterion_main!(benches);
