// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Fault-level helpers on top of the solver: locating the nucleation patch
//! from a physical position, computing onset times from rupture velocities,
//! and laying several subfaults out in one flat patch vector.

use std::ops::Range;

use crate::core::{Hypocenter, PatchGrid, TimeField};
use crate::error::{Result, SweepError};
use crate::io::velocity_to_slowness;
use crate::sweep::{BatchSolver, FastSweepSolver, SweepSettings};

/// Convert a position along one fault axis to a patch index.
///
/// Patch `k` covers `[k*h, (k+1)*h)`, so the index is
/// `round((position - h/2) / h)`, with ties rounded to even. The result may
/// be negative or past the last patch; callers check the range.
pub fn position_to_index(position: f64, cell_size: f64) -> i64 {
    ((position - cell_size / 2.0) / cell_size).round_ties_even() as i64
}

/// One planar subfault discretized into `n_strike x n_dip` square patches.
///
/// Per-patch vectors are dip-major: patch (`strike_idx`, `dip_idx`) sits at
/// `dip_idx * n_strike + strike_idx`. The solver grid therefore has one row
/// per dip step and one column per strike step, and nucleation patches are
/// `Hypocenter { row: dip_idx, col: strike_idx }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subfault {
    n_strike: usize,
    n_dip: usize,
    patch_size: f64,
}

impl Subfault {
    /// Create a subfault.
    ///
    /// # Errors
    /// Returns an error if either patch count is zero or the patch size is
    /// not positive and finite.
    pub fn new(n_strike: usize, n_dip: usize, patch_size: f64) -> Result<Self> {
        if !patch_size.is_finite() || patch_size <= 0.0 {
            return Err(SweepError::InvalidPatchSize(patch_size));
        }
        for (axis, &size) in [n_strike, n_dip].iter().enumerate() {
            if size == 0 {
                return Err(SweepError::InvalidGridShape { axis, size });
            }
        }
        if n_dip.checked_mul(n_strike).is_none() {
            return Err(SweepError::GridTooLarge {
                rows: n_dip,
                cols: n_strike,
            });
        }
        Ok(Subfault {
            n_strike,
            n_dip,
            patch_size,
        })
    }

    /// Number of patches along strike.
    pub fn n_strike(&self) -> usize {
        self.n_strike
    }

    /// Number of patches along dip.
    pub fn n_dip(&self) -> usize {
        self.n_dip
    }

    /// Patch edge length.
    pub fn patch_size(&self) -> f64 {
        self.patch_size
    }

    /// Total number of patches.
    pub fn num_patches(&self) -> usize {
        self.n_strike * self.n_dip
    }

    /// Fault extent along strike.
    pub fn length(&self) -> f64 {
        self.n_strike as f64 * self.patch_size
    }

    /// Fault extent along dip.
    pub fn width(&self) -> f64 {
        self.n_dip as f64 * self.patch_size
    }

    /// Flat offset of patch (`strike_idx`, `dip_idx`) in a dip-major vector.
    ///
    /// # Errors
    /// Returns an error if the patch is outside the subfault.
    pub fn patch_offset(&self, strike_idx: usize, dip_idx: usize) -> Result<usize> {
        if strike_idx >= self.n_strike || dip_idx >= self.n_dip {
            return Err(SweepError::InvalidHypocenter {
                row: dip_idx,
                col: strike_idx,
                rows: self.n_dip,
                cols: self.n_strike,
            });
        }
        Ok(dip_idx * self.n_strike + strike_idx)
    }

    /// Patch indices `(strike_idx, dip_idx)` of the point at `strike_pos`,
    /// `dip_pos` (distances from the fault origin).
    ///
    /// # Errors
    /// Returns an error if the point is outside the fault.
    pub fn locate(&self, strike_pos: f64, dip_pos: f64) -> Result<(usize, usize)> {
        let strike_idx = self.axis_index(0, strike_pos, self.length(), self.n_strike)?;
        let dip_idx = self.axis_index(1, dip_pos, self.width(), self.n_dip)?;
        Ok((strike_idx, dip_idx))
    }

    /// Nucleation patch on the dip-major solver grid for a point on the fault.
    ///
    /// # Errors
    /// Returns an error if the point is outside the fault.
    pub fn nucleation_patch(&self, strike_pos: f64, dip_pos: f64) -> Result<Hypocenter> {
        let (strike_idx, dip_idx) = self.locate(strike_pos, dip_pos)?;
        Ok(Hypocenter::new(dip_idx, strike_idx))
    }

    fn grid<'a>(&self, slowness: &'a [f64]) -> Result<PatchGrid<'a>> {
        PatchGrid::new(self.n_dip, self.n_strike, self.patch_size, slowness)
    }

    fn axis_index(&self, axis: usize, position: f64, length: f64, count: usize) -> Result<usize> {
        if !position.is_finite() || position < 0.0 || position > length {
            return Err(SweepError::PositionOutsideFault {
                axis,
                position,
                length,
            });
        }
        // The far edge rounds onto the patch past the end
        let idx = position_to_index(position, self.patch_size).max(0) as usize;
        Ok(idx.min(count - 1))
    }

    /// Onset times from dip-major per-patch rupture velocities.
    ///
    /// The returned field has shape `[n_dip, n_strike]`, so its flat values
    /// use the same dip-major layout as the input.
    ///
    /// # Errors
    /// Returns an error for invalid velocities, a wrong velocity count, or a
    /// nucleation patch outside the subfault.
    pub fn onset_times(
        &self,
        rupture_velocities: &[f64],
        nucleation: Hypocenter,
        settings: SweepSettings,
    ) -> Result<TimeField> {
        let slowness = self.slowness(rupture_velocities)?;
        let grid = self.grid(&slowness)?;
        FastSweepSolver::new(grid)
            .with_settings(settings)?
            .solve(nucleation, None)
    }

    /// Like [`Subfault::onset_times`], with the nucleation point given as a
    /// physical position.
    ///
    /// # Errors
    /// See [`Subfault::onset_times`] and [`Subfault::nucleation_patch`].
    pub fn onset_times_at(
        &self,
        rupture_velocities: &[f64],
        strike_pos: f64,
        dip_pos: f64,
        settings: SweepSettings,
    ) -> Result<TimeField> {
        let nucleation = self.nucleation_patch(strike_pos, dip_pos)?;
        self.onset_times(rupture_velocities, nucleation, settings)
    }

    fn slowness(&self, rupture_velocities: &[f64]) -> Result<Vec<f64>> {
        if rupture_velocities.len() != self.num_patches() {
            return Err(SweepError::ShapeMismatch {
                expected: vec![self.n_dip, self.n_strike],
                got: vec![rupture_velocities.len()],
            });
        }
        velocity_to_slowness(rupture_velocities)
    }
}

/// Maps several subfaults onto consecutive ranges of one flat patch vector.
#[derive(Debug, Clone)]
pub struct FaultOrdering {
    subfaults: Vec<Subfault>,
    offsets: Vec<usize>,
    npatches: usize,
}

impl FaultOrdering {
    /// Lay out the subfaults in the given order.
    ///
    /// # Errors
    /// Returns an error if the total patch count overflows.
    pub fn new(subfaults: Vec<Subfault>) -> Result<Self> {
        let mut offsets = Vec::with_capacity(subfaults.len());
        let mut npatches: usize = 0;
        for sf in &subfaults {
            offsets.push(npatches);
            npatches = npatches
                .checked_add(sf.num_patches())
                .ok_or_else(|| SweepError::Other("total patch count overflows".to_string()))?;
        }
        Ok(FaultOrdering {
            subfaults,
            offsets,
            npatches,
        })
    }

    /// Number of subfaults.
    pub fn nsubfaults(&self) -> usize {
        self.subfaults.len()
    }

    /// Total number of patches over all subfaults.
    pub fn npatches(&self) -> usize {
        self.npatches
    }

    /// Get a subfault by index.
    ///
    /// # Errors
    /// Returns an error if the index is out of range.
    pub fn subfault(&self, index: usize) -> Result<&Subfault> {
        self.subfaults.get(index).ok_or(SweepError::InvalidSubfault {
            index,
            count: self.subfaults.len(),
        })
    }

    /// Range of the flat patch vector owned by a subfault.
    ///
    /// # Errors
    /// Returns an error if the index is out of range.
    pub fn patch_range(&self, index: usize) -> Result<Range<usize>> {
        let sf = self.subfault(index)?;
        let start = self.offsets[index];
        Ok(start..start + sf.num_patches())
    }

    /// Flat patch index of patch (`strike_idx`, `dip_idx`) of a subfault.
    ///
    /// # Errors
    /// Returns an error if the subfault or the patch is out of range.
    pub fn patch_index(&self, index: usize, strike_idx: usize, dip_idx: usize) -> Result<usize> {
        let offset = self.subfault(index)?.patch_offset(strike_idx, dip_idx)?;
        Ok(self.offsets[index] + offset)
    }

    /// Onset times of every subfault, solved in parallel, in the flat layout.
    ///
    /// `rupture_velocities` covers all patches in layout order and
    /// `nucleations` holds one dip-major patch per subfault (see
    /// [`Subfault::nucleation_patch`]).
    ///
    /// # Errors
    /// Returns an error on a length mismatch or any failed solve.
    pub fn onset_times(
        &self,
        rupture_velocities: &[f64],
        nucleations: &[Hypocenter],
        batch: &BatchSolver,
    ) -> Result<Vec<f64>> {
        if rupture_velocities.len() != self.npatches {
            return Err(SweepError::ShapeMismatch {
                expected: vec![self.npatches],
                got: vec![rupture_velocities.len()],
            });
        }
        if nucleations.len() != self.subfaults.len() {
            return Err(SweepError::ShapeMismatch {
                expected: vec![self.subfaults.len()],
                got: vec![nucleations.len()],
            });
        }

        let slowness = velocity_to_slowness(rupture_velocities)?;
        let jobs = self
            .subfaults
            .iter()
            .zip(&self.offsets)
            .zip(nucleations)
            .map(|((sf, &offset), &nucleation)| {
                let part = &slowness[offset..offset + sf.num_patches()];
                sf.grid(part).map(|g| (g, nucleation))
            })
            .collect::<Result<Vec<_>>>()?;

        let fields = batch.solve(&jobs)?;
        let mut out = Vec::with_capacity(self.npatches);
        for field in fields {
            out.extend_from_slice(field.as_slice());
        }
        Ok(out)
    }
}
