use std::path::PathBuf;

use recon_core::PipelineRun;
use recon_core::matcher::CalibrationReport;
use recon_output::{ChecksumMismatch, Manifest};

#[derive(Debug)]
pub struct RunResult {
    pub output_dir: PathBuf,
    pub run: PipelineRun,
    /// Set when outputs were written.
    pub manifest: Option<Manifest>,
    /// Why outputs were not written, when the load gate refused.
    pub blocked: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct CalibrationResult {
    pub source: String,
    pub pair_count: usize,
    pub selected: CalibrationReport,
    pub sweep: Vec<CalibrationReport>,
}

#[derive(Debug)]
pub struct VerifyResult {
    pub directory: PathBuf,
    pub manifest: Manifest,
    pub mismatches: Vec<ChecksumMismatch>,
}
