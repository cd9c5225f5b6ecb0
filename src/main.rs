// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use fast_sweep::config::{
    Config, GridConfig, HypocenterConfig, OutputConfig, SlownessSource, SolverConfig,
};
use fast_sweep::core::PatchGrid;
use fast_sweep::io;
use fast_sweep::sweep::{FastSweepSolver, ProgressInfo};

#[derive(Parser)]
#[command(
    name = "fast-sweep",
    about = "Rupture onset times on a fault patch grid by the Fast Sweeping Method"
)]
struct Cli {
    /// TOML run configuration (replaces the grid/solver flags below)
    #[arg(
        short = 'c',
        long,
        conflicts_with_all = [
            "size",
            "patch_size",
            "hypocenter",
            "nucleation",
            "slowness",
            "tolerance",
            "max_iterations",
        ]
    )]
    config: Option<PathBuf>,

    /// Grid size as rows,cols (patches along strike, along dip)
    #[arg(short = 's', long)]
    size: Option<String>,

    /// Patch edge length
    #[arg(long, default_value = "1.0")]
    patch_size: f64,

    /// Hypocenter patch as row,col
    #[arg(long, conflicts_with = "nucleation")]
    hypocenter: Option<String>,

    /// Hypocenter as a physical position strike,dip from the fault origin
    #[arg(long)]
    nucleation: Option<String>,

    /// Slowness field: "uniform:<val>", "velocity:<val>",
    /// "slowness-file:<path>", or "velocity-file:<path>"
    #[arg(long, default_value = "uniform:1.0")]
    slowness: String,

    /// Convergence tolerance on the per-iteration sum of squared changes
    #[arg(short = 't', long, default_value = "0.1")]
    tolerance: f64,

    /// Abort if not converged after this many iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print per-iteration residuals to stderr
    #[arg(long)]
    progress: bool,
}

fn parse_pair<T: std::str::FromStr>(s: &str, flag: &str) -> Result<(T, T)>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parts: Vec<T> = s
        .split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --{}: expected two comma-separated values", flag))?;
    match <[T; 2]>::try_from(parts) {
        Ok([a, b]) => Ok((a, b)),
        Err(parts) => bail!("--{} has {} components, expected 2", flag, parts.len()),
    }
}

fn config_from_flags(cli: &Cli) -> Result<Config> {
    let Some(size) = &cli.size else {
        bail!("either --config or --size must be specified");
    };
    let (rows, cols) = parse_pair::<usize>(size, "size")?;

    let hypocenter = match (&cli.hypocenter, &cli.nucleation) {
        (Some(h), _) => {
            let (row, col) = parse_pair::<usize>(h, "hypocenter")?;
            HypocenterConfig::Patch { row, col }
        }
        (None, Some(n)) => {
            let (strike, dip) = parse_pair::<f64>(n, "nucleation")?;
            HypocenterConfig::Position { strike, dip }
        }
        (None, None) => bail!("one of --hypocenter or --nucleation must be specified"),
    };

    let slowness: SlownessSource = cli.slowness.parse().context("invalid --slowness")?;

    let config = Config {
        grid: GridConfig {
            rows,
            cols,
            patch_size: cli.patch_size,
        },
        hypocenter,
        slowness,
        solver: SolverConfig {
            tolerance: cli.tolerance,
            max_iterations: cli.max_iterations,
        },
        output: OutputConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(config: &Config, progress: bool) -> Result<()> {
    let slowness = config
        .slowness
        .build(config.grid.rows, config.grid.cols)
        .context("failed to build slowness field")?;
    let grid = PatchGrid::new(
        config.grid.rows,
        config.grid.cols,
        config.grid.patch_size,
        &slowness,
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;
    let hypocenter = config.hypocenter()?;

    let solver = FastSweepSolver::new(grid)
        .with_settings(config.solver.settings())
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let progress_cb: Option<Box<dyn Fn(ProgressInfo) + Sync>> = if progress {
        Some(Box::new(|info: ProgressInfo| {
            eprintln!(
                "[{:.3}s] iteration={} residual={:.6e}",
                info.elapsed.as_secs_f64(),
                info.iteration,
                info.residual,
            );
        }))
    } else {
        None
    };

    let field = solver
        .solve(hypocenter, progress_cb.as_deref())
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    log::info!("latest onset time: {}", field.max_time());

    io::save_time_field(&field, &config.output.path)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("failed to write {}", config.output.path.display()))?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => config_from_flags(&cli)?,
    };
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
        config.validate()?;
    }

    config.log_summary();
    run(&config, cli.progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_conflicts_with_run_flags() {
        for flag in [
            "--slowness=uniform:2.0",
            "--patch-size=5.0",
            "--tolerance=0.5",
            "--max-iterations=10",
            "--size=3,3",
        ] {
            let result = Cli::try_parse_from(["fast-sweep", "--config", "run.toml", flag]);
            assert!(result.is_err(), "{} accepted alongside --config", flag);
        }
    }

    #[test]
    fn config_allows_output_and_progress() {
        let cli = Cli::try_parse_from([
            "fast-sweep",
            "--config",
            "run.toml",
            "--output",
            "out.mat",
            "--progress",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("run.toml")));
        assert!(cli.progress);
    }

    #[test]
    fn flags_build_validated_config() {
        let cli = Cli::try_parse_from([
            "fast-sweep",
            "--size",
            "4,3",
            "--hypocenter",
            "1,2",
            "--slowness",
            "velocity:2.0",
        ])
        .unwrap();
        let config = config_from_flags(&cli).unwrap();
        assert_eq!(config.grid.rows, 4);
        assert_eq!(config.hypocenter, HypocenterConfig::Patch { row: 1, col: 2 });
        assert_eq!(config.slowness.build(4, 3).unwrap(), vec![0.5; 12]);

        let cli = Cli::try_parse_from(["fast-sweep", "--size", "4,3,2", "--hypocenter", "0,0"])
            .unwrap();
        assert!(config_from_flags(&cli).is_err());
    }
}
