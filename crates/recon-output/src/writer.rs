//! Writing a finished run to disk.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use polars::prelude::*;
use recon_core::{PipelineRun, ReconcileConfig};
use tracing::{debug, info, info_span};

use crate::checksum::compute_file_sha256;
use crate::error::{OutputError, Result};
use crate::frame::{catalogue_to_frame, rows_to_frame};
use crate::manifest::{MANIFEST_FILE, Manifest, ManifestEntry, OutputKind};

/// Where outputs go and what the load gate accepts.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub stem: String,
    /// Acknowledge reconciliation gaps. Oversized partitions still block.
    pub accept_gaps: bool,
    pub size_ceiling_bytes: u64,
}

impl OutputOptions {
    pub fn from_config(config: &ReconcileConfig, accept_gaps: bool) -> Self {
        Self {
            directory: config.output.directory.clone(),
            stem: config.output.stem.clone(),
            accept_gaps,
            size_ceiling_bytes: config.size_ceiling_bytes,
        }
    }
}

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut writer = BufWriter::new(file);
    CsvWriter::new(&mut writer).include_header(true).finish(df)?;
    writer.flush().map_err(write_error(path))?;
    Ok(())
}

fn write_parquet(path: &Path, df: &mut DataFrame) -> Result<()> {
    let file = File::create(path).map_err(write_error(path))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(df)?;
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(write_error(path))?;
    Ok(())
}

fn entry(
    directory: &Path,
    file: String,
    kind: OutputKind,
) -> Result<ManifestEntry> {
    let path = directory.join(&file);
    let bytes = fs::metadata(&path)
        .map_err(|source| OutputError::Read {
            path: path.clone(),
            source,
        })?
        .len();
    Ok(ManifestEntry {
        sha256: compute_file_sha256(&path)?,
        file,
        kind,
        label: None,
        rows: None,
        bytes,
    })
}

/// Writes every output of `run`. See [`write_outputs_with_progress`].
pub fn write_outputs(run: &PipelineRun, options: &OutputOptions) -> Result<Manifest> {
    write_outputs_with_progress(run, options, |_| {})
}

/// Writes partitions, the catalogue, the gap report and the manifest.
///
/// Nothing is written while [`PipelineRun::ensure_loadable`] fails. A
/// partition whose written size exceeds the ceiling stops the run; files
/// already written stay on disk but no manifest is produced for them.
/// `on_file` is called after each file lands.
pub fn write_outputs_with_progress(
    run: &PipelineRun,
    options: &OutputOptions,
    mut on_file: impl FnMut(&ManifestEntry),
) -> Result<Manifest> {
    run.ensure_loadable(options.accept_gaps)?;

    info_span!("write").in_scope(|| -> Result<Manifest> {
        let start = Instant::now();
        let dir = options.directory.as_path();
        fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();

        // Partitions
        for part in run.partition_slices()? {
            let name = part.file_name(&options.stem, "csv");
            let mut df = rows_to_frame(&run.merged.columns, part.rows)?;
            write_csv(&dir.join(&name), &mut df)?;

            let mut written = entry(dir, name, OutputKind::Partition)?;
            if written.bytes > options.size_ceiling_bytes {
                return Err(recon_core::PartitionError::PartitionSizeExceeded {
                    number: part.number,
                    label: part.label.clone(),
                    size_bytes: written.bytes,
                    ceiling_bytes: options.size_ceiling_bytes,
                }
                .into());
            }
            written.label = Some(part.label.clone());
            written.rows = Some(part.range.clone());
            debug!(file = %written.file, rows = part.len(), bytes = written.bytes, "partition written");
            on_file(&written);
            files.push(written);
        }

        // Catalogue
        let mut catalogue = catalogue_to_frame(&run.catalogue)?;
        for extension in ["parquet", "csv"] {
            let name = format!("{}_catalogue.{extension}", options.stem);
            let path = dir.join(&name);
            if extension == "parquet" {
                write_parquet(&path, &mut catalogue)?;
            } else {
                write_csv(&path, &mut catalogue)?;
            }
            let written = entry(dir, name, OutputKind::Catalogue)?;
            on_file(&written);
            files.push(written);
        }

        // Gap report
        let name = format!("{}_gaps.json", options.stem);
        write_json(&dir.join(&name), &run.gaps)?;
        let written = entry(dir, name, OutputKind::GapReport)?;
        on_file(&written);
        files.push(written);

        let manifest = Manifest {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            dataset: run.merged.name.clone(),
            total_rows: run.merged.height(),
            columns: run.merged.columns.clone(),
            acknowledged_gaps: run.gaps.len(),
            files,
        };
        write_json(&dir.join(MANIFEST_FILE), &manifest)?;

        info!(
            directory = %dir.display(),
            files = manifest.files.len(),
            rows = manifest.total_rows,
            duration_ms = start.elapsed().as_millis(),
            "outputs written"
        );
        Ok(manifest)
    })
}
