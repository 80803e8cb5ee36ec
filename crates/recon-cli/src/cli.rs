//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "lsoa-recon",
    version,
    about = "Reconcile small-area datasets with their variable metadata",
    long_about = "Merge a primary small-area dataset with its lookup tables, resolve every\n\
                  declared metadata variable onto a merged column, report gaps, and write\n\
                  size-bounded partitions with a checksummed manifest."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the reconciliation pipeline described by a config file.
    Run(RunArgs),

    /// Measure the match threshold against labelled name pairs.
    Calibrate(CalibrateArgs),

    /// Print the canonical form of column names.
    Normalize(NormalizeArgs),

    /// Recompute the checksums listed in an output manifest.
    Verify(VerifyArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the TOML run configuration.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output directory (default: from the config file).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Reconcile and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write outputs even though reconciliation gaps remain.
    ///
    /// Gaps are still listed in the gap report and the manifest. Oversized
    /// partitions block writing regardless of this flag.
    #[arg(long = "accept-gaps")]
    pub accept_gaps: bool,

    /// Override the maximum number of rows per partition.
    #[arg(long = "max-rows", value_name = "N")]
    pub max_rows: Option<usize>,

    /// Override the partition size ceiling in bytes.
    #[arg(long = "size-ceiling", value_name = "BYTES")]
    pub size_ceiling: Option<u64>,

    /// Override the fuzzy match acceptance threshold.
    #[arg(long = "threshold", value_name = "SCORE")]
    pub threshold: Option<f64>,
}

#[derive(Parser)]
pub struct CalibrateArgs {
    /// CSV of labelled pairs with columns declared,candidate,expected
    /// (default: built-in hold-out set).
    #[arg(value_name = "PAIRS_CSV")]
    pub pairs: Option<PathBuf>,

    /// Threshold whose misclassified pairs are listed.
    #[arg(long = "threshold", value_name = "SCORE")]
    pub threshold: Option<f64>,

    /// Additional thresholds to compare.
    #[arg(long = "sweep", value_name = "SCORE", value_delimiter = ',')]
    pub sweep: Vec<f64>,
}

#[derive(Parser)]
pub struct NormalizeArgs {
    /// Raw column or variable names.
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Output directory containing manifest.json.
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
