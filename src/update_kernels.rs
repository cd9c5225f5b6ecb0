// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::GridData;

/// Solve the local eikonal update equation for a single patch.
///
/// Given the smaller neighbor time `a` along strike, `b` along dip, the
/// patch slowness `f` and the patch size `h`, solves the first-order upwind
/// discretization of |∇T| = f:
///
/// - if `|a - b| >= f*h` the wavefront crosses the patch along one axis and
///   the result is `min(a, b) + f*h`;
/// - otherwise it is the larger root of `(T-a)^2 + (T-b)^2 = (f*h)^2`.
///
/// Degenerate `f` or `h` are not guarded and propagate into the result.
pub fn solve_quadratic(a: f64, b: f64, f: f64, h: f64) -> f64 {
    // No upwind information yet
    if a == f64::INFINITY && b == f64::INFINITY {
        return f64::INFINITY;
    }

    let fh = f * h;
    let diff = a - b;
    if diff.abs() >= fh {
        return a.min(b) + fh;
    }

    (a + b + (2.0 * fh * fh - diff * diff).sqrt()) / 2.0
}

/// Compute the updated onset time for a single patch.
///
/// Reads the 4 axis neighbors, clamped into the grid so that an edge patch
/// stands in for its own missing neighbor. Picks the smaller time per axis,
/// calls [`solve_quadratic`], and never returns more than the current time.
/// The caller writes the result back.
pub fn update_patch<G: GridData>(grid: &G, times: &[f64], row: usize, col: usize) -> f64 {
    let [rows, cols] = grid.shape();

    let up = row.saturating_sub(1);
    let down = (row + 1).min(rows - 1);
    let left = col.saturating_sub(1);
    let right = (col + 1).min(cols - 1);

    let u_xmin = times[grid.index(up, col)].min(times[grid.index(down, col)]);
    let u_ymin = times[grid.index(row, left)].min(times[grid.index(row, right)]);

    let current = times[grid.index(row, col)];
    let candidate = solve_quadratic(u_xmin, u_ymin, grid.get_f(row, col), grid.patch_size());
    candidate.min(current)
}
