use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "dopescan developers",
    version,
    about = "dopescan CLI - Enumerate symmetry-distinct dopant configurations on a crystal sublattice and rank them by energy.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of scoring workers.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate, score and rank the symmetry-distinct configurations described by a job file.
    Screen(ScreenArgs),
}

/// Arguments for the `screen` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScreenArgs {
    // --- Core Arguments ---
    /// Path to the job file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory that receives ranking.csv, failures.csv and summary.toml.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    // --- Screening Overrides ---
    /// Override the number of top-ranked configurations to keep.
    #[arg(short = 'k', long, value_name = "INT")]
    pub topk: Option<usize>,

    /// Override the ceiling on raw labelings.
    #[arg(long, value_name = "INT")]
    pub max_enum: Option<u64>,

    /// Override the ceiling on symmetry-distinct configurations.
    #[arg(long, value_name = "INT")]
    pub max_unique: Option<usize>,

    /// Override the number of candidates handed to a worker at a time.
    #[arg(long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S screening.topk=5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
