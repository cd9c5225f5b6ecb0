// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while validating inputs, solving, or doing file I/O.
#[derive(Debug)]
pub enum SweepError {
    /// Grid shape is invalid (an axis has no patches).
    InvalidGridShape {
        /// The axis index (0 = strike, 1 = dip).
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Patch count `rows * cols` does not fit in `usize`.
    GridTooLarge {
        /// Number of rows requested.
        rows: usize,
        /// Number of columns requested.
        cols: usize,
    },
    /// Array shape or length does not match the grid.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Input array is not a contiguous row-major buffer.
    InvalidLayout,
    /// Patch size is not positive and finite.
    InvalidPatchSize(f64),
    /// Slowness value is negative or not finite.
    InvalidSlowness {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Velocity value is not positive and finite.
    InvalidVelocity {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Hypocenter lies outside the grid.
    InvalidHypocenter {
        /// Hypocenter row (strike index).
        row: usize,
        /// Hypocenter column (dip index).
        col: usize,
        /// Number of rows in the grid.
        rows: usize,
        /// Number of columns in the grid.
        cols: usize,
    },
    /// A physical position along the fault falls outside the patch grid.
    PositionOutsideFault {
        /// The axis (0 = strike, 1 = dip).
        axis: usize,
        /// The position provided.
        position: f64,
        /// Fault extent along that axis.
        length: f64,
    },
    /// Subfault index out of range.
    InvalidSubfault {
        /// The index requested.
        index: usize,
        /// Number of subfaults available.
        count: usize,
    },
    /// Convergence tolerance is not positive and finite.
    InvalidTolerance(f64),
    /// Iteration cap of zero.
    InvalidMaxIterations(usize),
    /// Iteration cap reached before the residual dropped below tolerance.
    MaxIterationsExceeded {
        /// The limit that was set.
        limit: usize,
        /// Residual after the last iteration.
        residual: f64,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has size {} (must be >= 1)",
                    axis, size
                )
            }
            SweepError::GridTooLarge { rows, cols } => {
                write!(f, "grid of {}x{} patches is too large", rows, cols)
            }
            SweepError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            SweepError::InvalidLayout => {
                write!(f, "array is not contiguous or not in row-major order")
            }
            SweepError::InvalidPatchSize(h) => {
                write!(f, "invalid patch size: {} (must be positive and finite)", h)
            }
            SweepError::InvalidSlowness { index, value } => {
                write!(
                    f,
                    "invalid slowness at index {}: {} (must be non-negative and finite)",
                    index, value
                )
            }
            SweepError::InvalidVelocity { index, value } => {
                write!(
                    f,
                    "invalid velocity at index {}: {} (must be positive and finite)",
                    index, value
                )
            }
            SweepError::InvalidHypocenter {
                row,
                col,
                rows,
                cols,
            } => {
                write!(
                    f,
                    "invalid hypocenter ({}, {}): outside grid of {}x{} patches",
                    row, col, rows, cols
                )
            }
            SweepError::PositionOutsideFault {
                axis,
                position,
                length,
            } => {
                write!(
                    f,
                    "position {} on axis {} is outside the fault [0, {}]",
                    position, axis, length
                )
            }
            SweepError::InvalidSubfault { index, count } => {
                write!(f, "subfault {} out of range ({} subfaults)", index, count)
            }
            SweepError::InvalidTolerance(tol) => {
                write!(
                    f,
                    "invalid tolerance: {} (must be positive and finite)",
                    tol
                )
            }
            SweepError::InvalidMaxIterations(limit) => {
                write!(f, "invalid max iterations: {} (must be >= 1)", limit)
            }
            SweepError::MaxIterationsExceeded { limit, residual } => {
                write!(
                    f,
                    "max iterations exceeded: limit was {}, last residual {}",
                    limit, residual
                )
            }
            SweepError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            SweepError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            SweepError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            SweepError::IoError(e) => write!(f, "I/O error: {}", e),
            SweepError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SweepError {
    fn from(e: std::io::Error) -> Self {
        SweepError::IoError(e)
    }
}

/// Convenience type alias for Results with SweepError.
pub type Result<T> = std::result::Result<T, SweepError>;
