// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Rupture onset times on a fault patch grid using the Fast Sweeping Method.
//!
//! Given a per-patch slowness (inverse rupture velocity) field on a
//! rectangular grid of square fault patches and a hypocenter patch, this
//! library solves the discretized eikonal equation |∇T| = f for the onset
//! time T of every patch. Each solve runs Gauss-Seidel passes in four
//! alternating directions until the sum of squared changes over one
//! iteration falls to a tolerance. Independent solves, such as the
//! subfaults of a multi-segment fault, can run in parallel.
//!
//! ```
//! use fast_sweep::fast_sweep;
//!
//! // 1 x 3 grid, unit slowness and patch size, source at the first patch
//! let times = fast_sweep(&[1.0, 1.0, 1.0], 1.0, 0, 0, 1, 3).unwrap();
//! assert_eq!(times, vec![0.0, 1.0, 2.0]);
//! ```

#![warn(missing_docs)]

/// TOML run configuration.
pub mod config;
/// Patch grid, hypocenter and onset-time field.
pub mod core;
/// Error types for the library.
pub mod error;
/// Subfault helpers: nucleation from positions and multi-subfault ordering.
pub mod fault;
/// File I/O for loading slowness fields and saving onset times.
pub mod io;
/// Sweep controller, batch solver and entry points.
pub mod sweep;
/// Local upwind update and quadratic solve.
pub mod update_kernels;

pub use crate::core::{Hypocenter, PatchGrid, TimeField};
pub use crate::error::{Result, SweepError};
pub use crate::fault::{FaultOrdering, Subfault};
pub use crate::sweep::{
    fast_sweep, solve_array, BatchSolver, FastSweepSolver, ProgressInfo, SweepSettings,
    DEFAULT_TOLERANCE,
};
