use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, warn};

use recon_core::matcher::{calibrate, default_holdout, sweep};
use recon_core::{NoRepair, ReconcileConfig, normalize, run_pipeline};
use recon_ingest::load_inputs;
use recon_output::{Manifest, OutputOptions, write_outputs_with_progress};

use recon_cli::pairs::read_labelled_pairs;

use crate::cli::{CalibrateArgs, NormalizeArgs, RunArgs, VerifyArgs};
use crate::summary::apply_table_style;
use crate::types::{CalibrationResult, RunResult, VerifyResult};

/// Applies command-line overrides and re-validates.
fn apply_overrides(config: &mut ReconcileConfig, args: &RunArgs) -> Result<()> {
    if let Some(max_rows) = args.max_rows {
        config.max_rows_per_chunk = max_rows;
    }
    if let Some(ceiling) = args.size_ceiling {
        config.size_ceiling_bytes = ceiling;
    }
    if let Some(threshold) = args.threshold {
        config.match_threshold = threshold;
    }
    if let Some(dir) = &args.output_dir {
        config.output.directory = dir.clone();
    }
    config.validate().context("command-line overrides")?;
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

pub fn run_reconcile(args: &RunArgs) -> Result<RunResult> {
    let run_span = info_span!("run", config = %args.config.display());
    let _run_guard = run_span.enter();
    let start = Instant::now();

    // =========================================================================
    // Stage 0: Configuration
    // =========================================================================
    let mut config = ReconcileConfig::load(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    apply_overrides(&mut config, args)?;

    // =========================================================================
    // Stage 1: Ingest
    // =========================================================================
    let inputs = load_inputs(&config).context("load sources")?;

    // =========================================================================
    // Stage 2: Reconcile
    // =========================================================================
    let run = run_pipeline(&config, &inputs, &NoRepair).context("reconcile")?;
    for gap in run.gaps.gaps() {
        warn!(
            kind = %gap.kind,
            variable = gap.declared_name.as_deref().unwrap_or("-"),
            column = gap.column.as_deref().unwrap_or("-"),
            "{}",
            gap.detail
        );
    }

    // =========================================================================
    // Stage 3: Load gate and output
    // =========================================================================
    let output_dir = config.output.directory.clone();
    let blocked = run
        .ensure_loadable(args.accept_gaps)
        .err()
        .map(|e| e.to_string());
    let manifest = if args.dry_run || blocked.is_some() {
        None
    } else {
        let options = OutputOptions::from_config(&config, args.accept_gaps);
        let pb = progress_bar(run.partitions.len() as u64 + 3);
        let manifest = write_outputs_with_progress(&run, &options, |entry| {
            pb.set_message(entry.file.clone());
            pb.inc(1);
        })
        .with_context(|| format!("write outputs to {}", output_dir.display()));
        pb.finish_and_clear();
        Some(manifest?)
    };

    info!(
        rows = run.merged.height(),
        gaps = run.gaps.len(),
        written = manifest.is_some(),
        duration_ms = start.elapsed().as_millis(),
        "run finished"
    );

    Ok(RunResult {
        output_dir,
        run,
        manifest,
        blocked,
        dry_run: args.dry_run,
    })
}

pub fn run_calibrate(args: &CalibrateArgs) -> Result<CalibrationResult> {
    let (source, pairs) = match &args.pairs {
        Some(path) => (path.display().to_string(), read_labelled_pairs(path)?),
        None => ("built-in hold-out".to_string(), default_holdout()),
    };
    let threshold = args
        .threshold
        .unwrap_or(recon_core::DEFAULT_THRESHOLD);

    let mut thresholds = args.sweep.clone();
    thresholds.push(threshold);
    thresholds.sort_by(f64::total_cmp);
    thresholds.dedup();

    Ok(CalibrationResult {
        source,
        pair_count: pairs.len(),
        selected: calibrate(&pairs, threshold),
        sweep: sweep(&pairs, &thresholds),
    })
}

pub fn run_normalize(args: &NormalizeArgs) {
    let mut table = Table::new();
    table.set_header(vec!["Raw", "Normalized"]);
    apply_table_style(&mut table);
    for name in &args.names {
        table.add_row(vec![name.clone(), normalize(name)]);
    }
    println!("{table}");
}

pub fn run_verify(args: &VerifyArgs) -> Result<VerifyResult> {
    let manifest = Manifest::load(&args.directory)
        .with_context(|| format!("load manifest from {}", args.directory.display()))?;
    let mismatches = manifest.verify(&args.directory).context("verify checksums")?;
    Ok(VerifyResult {
        directory: args.directory.clone(),
        manifest,
        mismatches,
    })
}
