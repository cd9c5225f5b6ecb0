// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::Array2;

use crate::error::{Result, SweepError};

/// Read access to patch geometry and the slowness field.
pub trait GridData {
    /// Get the slowness value at the given (row, column).
    fn get_f(&self, row: usize, col: usize) -> f64;

    /// Get the grid shape as `[rows, cols]` (strike, dip).
    fn shape(&self) -> [usize; 2];

    /// Get the uniform patch size.
    fn patch_size(&self) -> f64;

    /// Get the total number of patches in the grid.
    fn num_patches(&self) -> usize;

    /// Convert a (row, column) coordinate to a flat row-major offset.
    fn index(&self, row: usize, col: usize) -> usize;

    /// Convert a flat offset back to (row, column).
    fn coords(&self, flat: usize) -> (usize, usize);
}

/// A rectangular grid of square fault patches over a borrowed slowness field.
///
/// Rows run along strike and columns along dip. The slowness slice is stored
/// row-major and is never mutated by the solver.
#[derive(Debug, Clone, Copy)]
pub struct PatchGrid<'a> {
    rows: usize,
    cols: usize,
    patch_size: f64,
    slowness: &'a [f64],
}

impl<'a> PatchGrid<'a> {
    /// Create a new patch grid.
    ///
    /// # Parameters
    /// - `rows`: Number of patches along strike (must be >= 1)
    /// - `cols`: Number of patches along dip (must be >= 1)
    /// - `patch_size`: Edge length of a square patch (must be positive and finite)
    /// - `slowness`: Slowness values in row-major order (non-negative and finite)
    ///
    /// # Errors
    /// Returns an error if any parameter is invalid or if the slowness length
    /// does not equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, patch_size: f64, slowness: &'a [f64]) -> Result<Self> {
        if !patch_size.is_finite() || patch_size <= 0.0 {
            return Err(SweepError::InvalidPatchSize(patch_size));
        }

        for (axis, &size) in [rows, cols].iter().enumerate() {
            if size == 0 {
                return Err(SweepError::InvalidGridShape { axis, size });
            }
        }

        let num_patches = rows
            .checked_mul(cols)
            .ok_or(SweepError::GridTooLarge { rows, cols })?;
        if slowness.len() != num_patches {
            return Err(SweepError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![slowness.len()],
            });
        }

        for (index, &value) in slowness.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(SweepError::InvalidSlowness { index, value });
            }
        }

        Ok(Self::new_unchecked(rows, cols, patch_size, slowness))
    }

    /// Create a grid without validating the slowness values or patch size.
    ///
    /// Only the slice length is checked (with a debug assertion). Degenerate
    /// values propagate into the solution instead of failing.
    pub fn new_unchecked(rows: usize, cols: usize, patch_size: f64, slowness: &'a [f64]) -> Self {
        debug_assert_eq!(slowness.len(), rows * cols, "slowness length mismatch");
        PatchGrid {
            rows,
            cols,
            patch_size,
            slowness,
        }
    }

    /// Number of patches along strike.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of patches along dip.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get a reference to the slowness field.
    pub fn slowness(&self) -> &'a [f64] {
        self.slowness
    }

    /// Check that a hypocenter lies inside the grid.
    pub fn check_hypocenter(&self, hypocenter: Hypocenter) -> Result<()> {
        if hypocenter.row >= self.rows || hypocenter.col >= self.cols {
            return Err(SweepError::InvalidHypocenter {
                row: hypocenter.row,
                col: hypocenter.col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl GridData for PatchGrid<'_> {
    fn get_f(&self, row: usize, col: usize) -> f64 {
        self.slowness[self.index(row, col)]
    }

    fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    fn patch_size(&self) -> f64 {
        self.patch_size
    }

    fn num_patches(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            row < self.rows && col < self.cols,
            "patch ({}, {}) outside {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    fn coords(&self, flat: usize) -> (usize, usize) {
        (flat / self.cols, flat % self.cols)
    }
}

/// The source patch, given as (row, column) = (strike index, dip index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hypocenter {
    /// Patch index along strike.
    pub row: usize,
    /// Patch index along dip.
    pub col: usize,
}

impl Hypocenter {
    /// Create a hypocenter at the given patch.
    pub fn new(row: usize, col: usize) -> Self {
        Hypocenter { row, col }
    }
}

impl From<(usize, usize)> for Hypocenter {
    fn from((row, col): (usize, usize)) -> Self {
        Hypocenter { row, col }
    }
}

/// Rupture onset times, one per patch, row-major.
///
/// Owned by a solve while it runs and handed to the caller afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeField {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl TimeField {
    /// Create a field that is `+inf` everywhere except the hypocenter, which is 0.
    ///
    /// # Panics
    /// Panics if the hypocenter is outside `rows x cols`. Grids built with
    /// [`PatchGrid::new`] check this through [`PatchGrid::check_hypocenter`].
    pub fn initialized(rows: usize, cols: usize, hypocenter: Hypocenter) -> Self {
        let mut values = vec![f64::INFINITY; rows * cols];
        values[hypocenter.row * cols + hypocenter.col] = 0.0;
        TimeField { rows, cols, values }
    }

    /// Wrap existing row-major values.
    ///
    /// # Errors
    /// Returns an error if `values.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(values.len()) {
            return Err(SweepError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![values.len()],
            });
        }
        Ok(TimeField { rows, cols, values })
    }

    /// Get the onset time at (row, column).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// Get the field shape as `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Flat row-major view of the onset times.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Largest onset time in the field.
    pub fn max_time(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Consume the field and return the flat row-major buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Consume the field and return it as a `rows x cols` array.
    pub fn into_array(self) -> Result<Array2<f64>> {
        Array2::from_shape_vec((self.rows, self.cols), self.values)
            .map_err(|e| SweepError::Other(format!("shape error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_coords_roundtrip() {
        let slowness = vec![1.0; 12 * 8];
        let grid = PatchGrid::new(12, 8, 1.0, &slowness).unwrap();
        for flat in 0..96 {
            let (row, col) = grid.coords(flat);
            assert_eq!(grid.index(row, col), flat, "flat={} ({}, {})", flat, row, col);
        }
    }

    #[test]
    fn index_is_row_major() {
        let slowness = vec![1.0; 3 * 5];
        let grid = PatchGrid::new(3, 5, 1.0, &slowness).unwrap();
        assert_eq!(grid.index(0, 0), 0);
        assert_eq!(grid.index(0, 4), 4);
        assert_eq!(grid.index(1, 0), 5);
        assert_eq!(grid.index(2, 3), 13);
    }

    #[test]
    fn get_f_reads_row_major() {
        let slowness: Vec<f64> = (0..6).map(|v| v as f64).collect();
        let grid = PatchGrid::new(2, 3, 1.0, &slowness).unwrap();
        assert_eq!(grid.get_f(1, 2), 5.0);
        assert_eq!(grid.get_f(0, 1), 1.0);
    }

    #[test]
    fn single_patch_grid_is_valid() {
        let slowness = [2.0];
        let grid = PatchGrid::new(1, 1, 0.5, &slowness).unwrap();
        assert_eq!(grid.shape(), [1, 1]);
        assert_eq!(grid.num_patches(), 1);
    }

    #[test]
    fn oversized_grid_is_an_error() {
        let result = PatchGrid::new(1usize << 63, 2, 1.0, &[]);
        assert!(matches!(
            result,
            Err(SweepError::GridTooLarge { cols: 2, .. })
        ));
        assert!(matches!(
            TimeField::from_vec(usize::MAX, 3, vec![]),
            Err(SweepError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn invalid_grid_shape() {
        let result = PatchGrid::new(4, 0, 1.0, &[]);
        assert!(matches!(
            result,
            Err(SweepError::InvalidGridShape { axis: 1, size: 0 })
        ));
    }

    #[test]
    fn invalid_patch_size() {
        let slowness = vec![1.0; 16];
        let result = PatchGrid::new(4, 4, 0.0, &slowness);
        assert!(matches!(result, Err(SweepError::InvalidPatchSize(_))));
        let result = PatchGrid::new(4, 4, f64::NAN, &slowness);
        assert!(matches!(result, Err(SweepError::InvalidPatchSize(_))));
    }

    #[test]
    fn invalid_slowness_value() {
        let mut slowness = vec![1.0; 16];
        slowness[5] = -1.0;
        let result = PatchGrid::new(4, 4, 1.0, &slowness);
        assert!(matches!(
            result,
            Err(SweepError::InvalidSlowness { index: 5, .. })
        ));

        slowness[5] = f64::NAN;
        let result = PatchGrid::new(4, 4, 1.0, &slowness);
        assert!(matches!(
            result,
            Err(SweepError::InvalidSlowness { index: 5, .. })
        ));
    }

    #[test]
    fn zero_slowness_is_accepted() {
        let slowness = vec![0.0; 4];
        assert!(PatchGrid::new(2, 2, 1.0, &slowness).is_ok());
    }

    #[test]
    fn shape_mismatch() {
        let slowness = vec![1.0; 10];
        let result = PatchGrid::new(4, 4, 1.0, &slowness);
        assert!(matches!(result, Err(SweepError::ShapeMismatch { .. })));
    }

    #[test]
    fn hypocenter_bounds() {
        let slowness = vec![1.0; 6];
        let grid = PatchGrid::new(2, 3, 1.0, &slowness).unwrap();
        assert!(grid.check_hypocenter(Hypocenter::new(1, 2)).is_ok());
        assert!(matches!(
            grid.check_hypocenter(Hypocenter::new(2, 0)),
            Err(SweepError::InvalidHypocenter { row: 2, .. })
        ));
        assert!(grid.check_hypocenter((0, 3).into()).is_err());
    }

    #[test]
    fn time_field_initialization() {
        let field = TimeField::initialized(3, 4, Hypocenter::new(1, 2));
        for row in 0..3 {
            for col in 0..4 {
                if (row, col) == (1, 2) {
                    assert_eq!(field.get(row, col), 0.0);
                } else {
                    assert!(field.get(row, col).is_infinite());
                }
            }
        }
    }

    #[test]
    fn time_field_into_array() {
        let field = TimeField::from_vec(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(field.max_time(), 5.0);
        let arr = field.into_array().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[1, 0]], 3.0);
    }

    #[test]
    fn time_field_from_vec_mismatch() {
        let result = TimeField::from_vec(2, 2, vec![0.0; 3]);
        assert!(matches!(result, Err(SweepError::ShapeMismatch { .. })));
    }
}
