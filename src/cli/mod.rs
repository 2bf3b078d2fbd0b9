//! Command-line parsing for the plate standard-curve tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/prediction code. Every path option can also come
//! from the environment (or a `.env` file loaded before parsing).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "plate",
    version,
    about = "96-well plate OD → concentration via 4-parameter sigmoid standard curves"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every data file: fit standard curves, predict concentrations, write outputs.
    Run(RunArgs),
    /// Load and validate the template, then print the group layout.
    Classify(LayoutArgs),
    /// Write a synthetic template, concentration grid and data files.
    Simulate(SimulateArgs),
    /// Print a saved `results.json` report.
    Show(ShowArgs),
}

/// Template + concentration grid locations.
#[derive(Debug, Args, Clone)]
pub struct LayoutArgs {
    /// Plate template (C/E or C<n>/E<n> labels).
    #[arg(long, env = "PLATE_TEMPLATE", default_value = "./template.csv")]
    pub template: PathBuf,

    /// Reference concentrations of the control wells (ug/ml).
    #[arg(long, env = "PLATE_CONCENTRATIONS", default_value = "./concentrations.csv")]
    pub concentrations: PathBuf,
}

/// Options for a batch run.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Directory holding the plate-reader CSV exports.
    #[arg(long, env = "PLATE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Output directory (results/, flags/, pictures/, plates/, results.json).
    #[arg(long = "out", env = "PLATE_OUTPUT_DIR", default_value = "./results")]
    pub output_dir: PathBuf,

    /// Text identifying the first cell of a plate block.
    #[arg(long, default_value = "Plate")]
    pub plate_marker: String,

    /// Residual-evaluation budget of the curve fit.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: usize,

    /// Skip SVG charts and plate maps.
    #[arg(long)]
    pub no_charts: bool,

    /// Print an ASCII standard-curve plot per group.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,

    /// Compute and print, but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Directory to write template.csv, concentrations.csv and data/ into.
    #[arg(long = "out", default_value = ".")]
    pub output_dir: PathBuf,

    /// Number of data files.
    #[arg(long, default_value_t = 2)]
    pub files: usize,

    /// Plates per data file.
    #[arg(long, default_value_t = 2)]
    pub plates: usize,

    /// Number of groups (1 writes an ungrouped C/E template).
    #[arg(long, default_value_t = 1)]
    pub groups: u32,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of additive OD noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Probability that an experimental well is left blank.
    #[arg(long, default_value_t = 0.0)]
    pub missing: f64,
}

/// Options for printing a saved report.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Report JSON produced by `plate run`.
    #[arg(value_name = "JSON", default_value = "./results/results.json")]
    pub report: PathBuf,

    /// Print an ASCII standard-curve plot per group.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}
