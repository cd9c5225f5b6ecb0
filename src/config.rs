// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! TOML run configuration for the command-line tool.
//!
//! ```toml
//! [grid]
//! rows = 20          # patches along strike
//! cols = 10          # patches along dip
//! patch_size = 1000.0
//!
//! [hypocenter]       # either patch indices ...
//! row = 3
//! col = 4
//! # strike = 3500.0  # ... or a position along strike/dip
//! # dip = 4500.0
//!
//! [slowness]
//! kind = "velocity"  # uniform | velocity | slowness-file | velocity-file
//! value = 2800.0
//!
//! [solver]
//! tolerance = 0.1
//! max_iterations = 10000
//!
//! [output]
//! path = "onset_time.npy"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::core::Hypocenter;
use crate::fault::Subfault;
use crate::io;
use crate::sweep::{SweepSettings, DEFAULT_TOLERANCE};

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Patches along strike.
    pub rows: usize,
    /// Patches along dip.
    pub cols: usize,
    /// Edge length of one square patch.
    #[serde(default = "default_patch_size")]
    pub patch_size: f64,
}

fn default_patch_size() -> f64 {
    1.0
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(anyhow!(
                "grid dimensions must be positive (rows={}, cols={})",
                self.rows,
                self.cols
            ));
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(anyhow!(
                "grid of {}x{} patches is too large",
                self.rows,
                self.cols
            ));
        }
        if !self.patch_size.is_finite() || self.patch_size <= 0.0 {
            return Err(anyhow!(
                "patch_size must be positive and finite, got {}",
                self.patch_size
            ));
        }
        Ok(())
    }

    fn subfault(&self) -> Result<Subfault> {
        Subfault::new(self.rows, self.cols, self.patch_size).map_err(|e| anyhow!("{}", e))
    }
}

/// Where the rupture starts. A table mixing both forms is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum HypocenterConfig {
    /// Patch indices.
    Patch {
        /// Strike index.
        row: usize,
        /// Dip index.
        col: usize,
    },
    /// Physical distance from the fault origin along strike and dip.
    Position {
        /// Distance along strike.
        strike: f64,
        /// Distance along dip.
        dip: f64,
    },
}

impl HypocenterConfig {
    /// Resolve to a patch on the given grid.
    pub fn resolve(&self, grid: &GridConfig) -> Result<Hypocenter> {
        match *self {
            HypocenterConfig::Patch { row, col } => {
                if row >= grid.rows || col >= grid.cols {
                    return Err(anyhow!(
                        "hypocenter ({}, {}) is outside grid bounds ({}, {})",
                        row,
                        col,
                        grid.rows,
                        grid.cols
                    ));
                }
                Ok(Hypocenter::new(row, col))
            }
            HypocenterConfig::Position { strike, dip } => {
                let (row, col) = grid
                    .subfault()?
                    .locate(strike, dip)
                    .map_err(|e| anyhow!("{}", e))?;
                Ok(Hypocenter::new(row, col))
            }
        }
    }
}

/// Source of the per-patch slowness field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SlownessSource {
    /// Same slowness on every patch.
    Uniform {
        /// Slowness value.
        value: f64,
    },
    /// Same rupture velocity on every patch.
    Velocity {
        /// Velocity value.
        value: f64,
    },
    /// Slowness read from a .npy or .mat file.
    SlownessFile {
        /// File path.
        path: PathBuf,
    },
    /// Rupture velocity read from a .npy or .mat file.
    VelocityFile {
        /// File path.
        path: PathBuf,
    },
}

impl SlownessSource {
    fn validate(&self) -> Result<()> {
        match self {
            SlownessSource::Uniform { value } if !value.is_finite() || *value < 0.0 => Err(
                anyhow!("uniform slowness must be non-negative and finite, got {}", value),
            ),
            SlownessSource::Velocity { value } if !value.is_finite() || *value <= 0.0 => Err(
                anyhow!("uniform velocity must be positive and finite, got {}", value),
            ),
            _ => Ok(()),
        }
    }

    /// Build the row-major slowness field for a `rows x cols` grid.
    pub fn build(&self, rows: usize, cols: usize) -> Result<Vec<f64>> {
        let shape = [rows, cols];
        let num_patches = rows
            .checked_mul(cols)
            .ok_or_else(|| anyhow!("grid of {}x{} patches is too large", rows, cols))?;
        let field = match self {
            SlownessSource::Uniform { value } => vec![*value; num_patches],
            SlownessSource::Velocity { value } => {
                io::velocity_to_slowness(&vec![*value; num_patches])
                    .map_err(|e| anyhow!("{}", e))?
            }
            SlownessSource::SlownessFile { path } => io::load_slowness(path, shape)
                .map_err(|e| anyhow!("{}: {}", path.display(), e))?,
            SlownessSource::VelocityFile { path } => io::load_velocity_as_slowness(path, shape)
                .map_err(|e| anyhow!("{}: {}", path.display(), e))?,
        };
        Ok(field)
    }
}

impl FromStr for SlownessSource {
    type Err = anyhow::Error;

    /// Parse `uniform:<val>`, `velocity:<val>`, `slowness-file:<path>` or
    /// `velocity-file:<path>`.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected '<kind>:<value>', got '{}'", s))?;
        let parse_value = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| anyhow!("invalid {} value '{}': {}", kind, v, e))
        };
        let source = match kind {
            "uniform" => SlownessSource::Uniform {
                value: parse_value(arg)?,
            },
            "velocity" => SlownessSource::Velocity {
                value: parse_value(arg)?,
            },
            "slowness-file" => SlownessSource::SlownessFile { path: arg.into() },
            "velocity-file" => SlownessSource::VelocityFile { path: arg.into() },
            _ => {
                return Err(anyhow!(
                    "unknown slowness kind '{}'. Expected 'uniform', 'velocity', \
                     'slowness-file' or 'velocity-file'",
                    kind
                ))
            }
        };
        source.validate()?;
        Ok(source)
    }
}

/// Solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Residual threshold.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Optional iteration cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: None,
        }
    }
}

impl SolverConfig {
    /// Settings passed to the solver.
    pub fn settings(&self) -> SweepSettings {
        SweepSettings {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }

    fn validate(&self) -> Result<()> {
        self.settings().validate().map_err(|e| anyhow!("{}", e))
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination file (.npy or .mat).
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("onset_time.npy")
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: default_output_path(),
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        io::infer_format(&self.path).map_err(|e| anyhow!("output {}: {}", self.path.display(), e))?;
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Grid layout.
    pub grid: GridConfig,
    /// Nucleation patch or position.
    pub hypocenter: HypocenterConfig,
    /// Slowness field source.
    pub slowness: SlownessSource,
    /// Convergence settings.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Where to write onset times.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.hypocenter.resolve(&self.grid)?;
        self.slowness.validate()?;
        self.solver.validate()?;
        self.output.validate()?;
        Ok(())
    }

    /// Nucleation patch on the configured grid.
    pub fn hypocenter(&self) -> Result<Hypocenter> {
        self.hypocenter.resolve(&self.grid)
    }

    /// Log a one-line-per-section summary at info level.
    pub fn log_summary(&self) {
        log::info!(
            "grid: {}x{} patches of size {} ({} x {})",
            self.grid.rows,
            self.grid.cols,
            self.grid.patch_size,
            self.grid.rows as f64 * self.grid.patch_size,
            self.grid.cols as f64 * self.grid.patch_size
        );
        log::info!("hypocenter: {:?}", self.hypocenter);
        log::info!("slowness: {:?}", self.slowness);
        log::info!(
            "solver: tolerance={}, max_iterations={:?}",
            self.solver.tolerance,
            self.solver.max_iterations
        );
        log::info!("output: {}", self.output.path.display());
    }
}
