// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fast_sweep::core::{Hypocenter, PatchGrid};
use fast_sweep::sweep::{BatchSolver, FastSweepSolver};

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Layered slowness so the solve needs more than one iteration.
fn layered_slowness(rows: usize, cols: usize) -> Vec<f64> {
    (0..rows * cols)
        .map(|i| 1.0 / (2500.0 + 50.0 * (i % cols) as f64))
        .collect()
}

/// Grid size scaling: single solves on square grids, source at the centre.
fn bench_grid_size_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_size_scaling");
    for &n in &[32, 64, 128, 256] {
        let slowness = layered_slowness(n, n);
        let grid = PatchGrid::new(n, n, 1000.0, &slowness).unwrap();
        let solver = FastSweepSolver::new(grid);
        let hypo = Hypocenter::new(n / 2, n / 2);
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter(|| black_box(solver.solve(hypo, None).unwrap()));
        });
    }
    group.finish();
}

/// Batch scaling: 32 independent 64x64 solves on 1 thread and all cores.
fn bench_batch_threads(c: &mut Criterion) {
    let cpus = num_cpus();
    let n = 64;
    let slowness = layered_slowness(n, n);
    let jobs: Vec<(PatchGrid, Hypocenter)> = (0..32)
        .map(|k| {
            let grid = PatchGrid::new(n, n, 1000.0, &slowness).unwrap();
            (grid, Hypocenter::new(k % n, (7 * k) % n))
        })
        .collect();

    let mut group = c.benchmark_group("batch_32x64x64");
    let single = BatchSolver::new().with_threads(1);
    group.bench_function("1thread", |b| {
        b.iter(|| black_box(single.solve(&jobs).unwrap()));
    });
    let all = BatchSolver::new().with_threads(cpus);
    group.bench_function(format!("{}threads_all", cpus), |b| {
        b.iter(|| black_box(all.solve(&jobs).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_grid_size_scaling, bench_batch_threads);
criterion_main!(benches);
