// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::core::{GridData, Hypocenter, PatchGrid, TimeField};
use crate::error::{Result, SweepError};
use crate::update_kernels::update_patch;

/// Default residual threshold for convergence.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Progress information passed to the optional callback after each iteration.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Number of completed iterations (four passes each).
    pub iteration: usize,
    /// Sum of squared changes over the last iteration.
    pub residual: f64,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

/// Traversal order of one Gauss-Seidel pass over the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Increasing row, increasing column.
    RowsUpColsUp,
    /// Decreasing row, increasing column.
    RowsDownColsUp,
    /// Decreasing row, decreasing column.
    RowsDownColsDown,
    /// Increasing row, decreasing column.
    RowsUpColsDown,
}

impl SweepDirection {
    /// The four passes of one iteration, in the order they are applied.
    pub const ORDER: [SweepDirection; 4] = [
        SweepDirection::RowsUpColsUp,
        SweepDirection::RowsDownColsUp,
        SweepDirection::RowsDownColsDown,
        SweepDirection::RowsUpColsDown,
    ];

    fn reverse_rows(self) -> bool {
        matches!(
            self,
            SweepDirection::RowsDownColsUp | SweepDirection::RowsDownColsDown
        )
    }

    fn reverse_cols(self) -> bool {
        matches!(
            self,
            SweepDirection::RowsDownColsDown | SweepDirection::RowsUpColsDown
        )
    }
}

/// Phase of a solve, reported in the debug log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// Field is being reset to infinity with a zero hypocenter.
    Initializing,
    /// Iterations are running.
    Sweeping,
    /// The residual dropped below the tolerance.
    Converged,
}

/// Convergence settings shared by single and batch solves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSettings {
    /// Residual threshold; the solve stops once the residual is at or below it.
    pub tolerance: f64,
    /// Optional iteration cap. `None` iterates until convergence.
    pub max_iterations: Option<usize>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: None,
        }
    }
}

impl SweepSettings {
    /// Check that the tolerance is positive and finite and that an
    /// iteration cap, if set, allows at least one iteration.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(SweepError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == Some(0) {
            return Err(SweepError::InvalidMaxIterations(0));
        }
        Ok(())
    }
}

/// Apply one in-place pass over every patch in the given traversal order.
///
/// Later patches in the pass see values already written earlier in the same
/// pass, so the visiting order matters.
pub fn sweep_pass<G: GridData>(grid: &G, times: &mut [f64], direction: SweepDirection) {
    let [rows, cols] = grid.shape();
    let reverse_rows = direction.reverse_rows();
    let reverse_cols = direction.reverse_cols();

    for r in 0..rows {
        let i = if reverse_rows { rows - 1 - r } else { r };
        for c in 0..cols {
            let j = if reverse_cols { cols - 1 - c } else { c };
            let new_val = update_patch(grid, times, i, j);
            times[grid.index(i, j)] = new_val;
        }
    }
}

/// Sum of squared differences between two fields.
///
/// Patches that hold the same value in both (including `+inf` patches not yet
/// reached) contribute nothing.
pub fn residual(current: &[f64], previous: &[f64]) -> f64 {
    current
        .iter()
        .zip(previous)
        .map(|(&c, &p)| if c == p { 0.0 } else { (c - p) * (c - p) })
        .sum()
}

/// A Fast Sweeping Method solver for rupture onset times on one patch grid.
///
/// Each iteration applies four Gauss-Seidel passes in alternating directions
/// and stops when the squared change of the whole field drops to the
/// tolerance. A solve is single-threaded and deterministic.
pub struct FastSweepSolver<'a> {
    grid: PatchGrid<'a>,
    settings: SweepSettings,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
}

impl<'a> FastSweepSolver<'a> {
    /// Create a solver over the given grid with the default tolerance of 0.1.
    pub fn new(grid: PatchGrid<'a>) -> Self {
        FastSweepSolver {
            grid,
            settings: SweepSettings::default(),
            progress_callback: None,
        }
    }

    /// Set the convergence tolerance (builder method).
    ///
    /// # Errors
    /// Returns an error if the tolerance is not positive and finite.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        let settings = SweepSettings {
            tolerance,
            ..self.settings
        };
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Set the maximum number of iterations before aborting (builder method).
    /// By default there is no limit.
    ///
    /// # Errors
    /// Returns an error if `max_iterations` is zero.
    pub fn with_max_iterations(self, max_iterations: usize) -> Result<Self> {
        let settings = SweepSettings {
            max_iterations: Some(max_iterations),
            ..self.settings
        };
        self.with_settings(settings)
    }

    /// Replace all convergence settings at once (builder method).
    ///
    /// # Errors
    /// Returns an error if the tolerance is invalid.
    pub fn with_settings(mut self, settings: SweepSettings) -> Result<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Set a progress callback invoked after every iteration (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &PatchGrid<'a> {
        &self.grid
    }

    /// Get the convergence settings.
    pub fn settings(&self) -> SweepSettings {
        self.settings
    }

    /// Run one full iteration (four passes) on `field` and return the residual.
    ///
    /// # Errors
    /// Returns an error if the field shape differs from the grid shape.
    pub fn iterate(&self, field: &mut TimeField) -> Result<f64> {
        if field.shape() != self.grid.shape() {
            return Err(SweepError::ShapeMismatch {
                expected: self.grid.shape().to_vec(),
                got: field.shape().to_vec(),
            });
        }
        let mut previous = Vec::with_capacity(field.as_slice().len());
        Ok(self.iterate_with(field, &mut previous))
    }

    fn iterate_with(&self, field: &mut TimeField, previous: &mut Vec<f64>) -> f64 {
        previous.clear();
        previous.extend_from_slice(field.as_slice());

        let times = field.as_mut_slice();
        for direction in SweepDirection::ORDER {
            sweep_pass(&self.grid, times, direction);
        }

        residual(field.as_slice(), &previous[..])
    }

    /// Compute onset times from the given hypocenter.
    ///
    /// # Parameters
    /// - `hypocenter`: Source patch, fixed at time 0
    /// - `progress_cb`: Optional callback for progress updates (overrides builder-set callback)
    ///
    /// # Errors
    /// Returns an error if the hypocenter lies outside the grid or the
    /// iteration cap is reached first.
    pub fn solve(
        &self,
        hypocenter: Hypocenter,
        progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>,
    ) -> Result<TimeField> {
        self.grid.check_hypocenter(hypocenter)?;
        let [rows, cols] = self.grid.shape();

        let mut state = SweepState::Initializing;
        log::trace!("{:?}: {}x{} patches, hypocenter {:?}", state, rows, cols, hypocenter);
        let mut field = TimeField::initialized(rows, cols, hypocenter);

        state = SweepState::Sweeping;
        log::trace!("{:?}", state);

        let start_time = Instant::now();
        let mut previous = Vec::with_capacity(field.as_slice().len());
        let mut iteration = 0;

        loop {
            let residual = self.iterate_with(&mut field, &mut previous);
            iteration += 1;
            log::debug!("iteration {}: residual {:.6e}", iteration, residual);

            let info = ProgressInfo {
                iteration,
                residual,
                elapsed: start_time.elapsed(),
            };
            if let Some(cb) = progress_cb {
                cb(info);
            } else if let Some(cb) = &self.progress_callback {
                cb(info);
            }

            if residual <= self.settings.tolerance {
                break;
            }

            if let Some(limit) = self.settings.max_iterations {
                if iteration >= limit {
                    log::warn!(
                        "no convergence after {} iterations (residual {:.6e})",
                        limit,
                        residual
                    );
                    return Err(SweepError::MaxIterationsExceeded { limit, residual });
                }
            }
        }

        state = SweepState::Converged;
        log::info!(
            "{:?} after {} iterations in {:.3?}",
            state,
            iteration,
            start_time.elapsed()
        );
        Ok(field)
    }
}

/// Solves many independent grids on a rayon thread pool.
///
/// Each solve is still sequential; only separate solves run in parallel,
/// so results equal those of [`FastSweepSolver::solve`].
#[derive(Debug, Clone, Default)]
pub struct BatchSolver {
    settings: SweepSettings,
    num_threads: Option<usize>,
}

impl BatchSolver {
    /// Create a batch solver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence settings applied to every solve (builder method).
    ///
    /// # Errors
    /// Returns an error if the tolerance is invalid.
    pub fn with_settings(mut self, settings: SweepSettings) -> Result<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Solve every `(grid, hypocenter)` job and return the fields in input order.
    ///
    /// # Errors
    /// Returns the first error from any job, or an error if the pool cannot be built.
    pub fn solve(&self, jobs: &[(PatchGrid<'_>, Hypocenter)]) -> Result<Vec<TimeField>> {
        let num_threads = self.get_num_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| SweepError::Other(e.to_string()))?;

        log::debug!("solving {} grids on {} threads", jobs.len(), num_threads);

        pool.install(|| {
            jobs.par_iter()
                .map(|&(grid, hypocenter)| {
                    FastSweepSolver::new(grid)
                        .with_settings(self.settings)?
                        .solve(hypocenter, None)
                })
                .collect()
        })
    }
}

/// Compute onset times from a flat row-major slowness array.
///
/// Parameters are, in order: the row-major slowness array, the patch size,
/// the hypocenter row and column, and the number of rows (along strike) and
/// columns (along dip). Uses the default tolerance.
///
/// # Errors
/// Returns an error if the grid, slowness or hypocenter is invalid.
pub fn fast_sweep(
    slowness: &[f64],
    patch_size: f64,
    hypo_row: usize,
    hypo_col: usize,
    rows: usize,
    cols: usize,
) -> Result<Vec<f64>> {
    let grid = PatchGrid::new(rows, cols, patch_size, slowness)?;
    let field = FastSweepSolver::new(grid).solve(Hypocenter::new(hypo_row, hypo_col), None)?;
    Ok(field.into_vec())
}

/// Compute onset times for a 2D slowness array (rows along strike).
///
/// # Errors
/// Returns [`SweepError::InvalidLayout`] for views that are not contiguous
/// row-major, plus any validation error from [`PatchGrid::new`].
pub fn solve_array(
    slowness: ArrayView2<'_, f64>,
    patch_size: f64,
    hypocenter: Hypocenter,
) -> Result<Array2<f64>> {
    let (rows, cols) = slowness.dim();
    let data = slowness.as_slice().ok_or(SweepError::InvalidLayout)?;
    let grid = PatchGrid::new(rows, cols, patch_size, data)?;
    FastSweepSolver::new(grid)
        .solve(hypocenter, None)?
        .into_array()
}
