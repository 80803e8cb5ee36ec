//! Staged reconciliation pipeline.
//!
//! Stages run in this order, each taking the previous stage's output by
//! reference and returning a new value:
//! 1. **Normalize**: canonical headers on every input table
//! 2. **Stack**: concatenate yearly editions of the primary dataset
//! 3. **Assemble**: build the variable catalogue from metadata sheets
//! 4. **Merge**: apply lookup joins in declared order
//! 5. **Sort**: order rows by the configured keys
//! 6. **Repair**: run the row repair hook
//! 7. **Resolve**: match catalogue records onto merged columns
//! 8. **Reconcile**: collect gaps
//! 9. **Partition**: cut the rows into bounded chunks and check the ceiling
//!
//! Structural errors stop the run; reconciliation gaps and oversized
//! partitions are reported on [`PipelineRun`] and block loading through
//! [`PipelineRun::ensure_loadable`].

use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Instant;

use recon_model::{MergedRow, MergedTable, Table, VariableCatalogue};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::config::ReconcileConfig;
use crate::error::{PartitionError, ReconcileError, Result};
use crate::merge::{RowRepair, apply_repair, merge, sort_by_keys, stack_years};
use crate::metadata::{CategoryRule, assemble_catalogue};
use crate::normalize::normalize_table_columns;
use crate::partition::{Partition, check_ceiling, partition, suggest_max_rows};
use crate::reconcile::{Gap, GapReport, find_gaps, resolve_catalogue};

/// One edition of the primary dataset.
#[derive(Debug, Clone)]
pub struct Edition {
    pub year: Option<i64>,
    pub table: Table,
}

/// Tables handed over by the retrieval layer, keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub editions: Vec<Edition>,
    pub lookups: BTreeMap<String, Table>,
    pub metadata: BTreeMap<String, Table>,
}

/// Position and size of one partition, detached from the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub number: usize,
    pub label: String,
    pub range: Range<usize>,
    /// Estimated size including the header line.
    pub estimated_bytes: u64,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub merged: MergedTable,
    pub catalogue: VariableCatalogue,
    pub gaps: GapReport,
    pub partitions: Vec<PartitionSummary>,
    pub size_violations: Vec<PartitionError>,
    /// Retry chunk size when partitions are oversized.
    pub suggested_max_rows: Option<usize>,
    max_rows_per_chunk: usize,
}

impl PipelineRun {
    /// The partitions as row slices of [`PipelineRun::merged`].
    pub fn partition_slices(
        &self,
    ) -> std::result::Result<Vec<Partition<'_, MergedRow>>, PartitionError> {
        partition(&self.merged.rows, self.max_rows_per_chunk)
    }

    /// Fails while gaps are unacknowledged or any partition is over the ceiling.
    ///
    /// `accept_gaps` acknowledges gaps only; size violations always block.
    pub fn ensure_loadable(&self, accept_gaps: bool) -> Result<()> {
        let gaps = if accept_gaps { 0 } else { self.gaps.len() };
        let oversized = self.size_violations.len();
        if gaps > 0 || oversized > 0 {
            return Err(ReconcileError::LoadBlocked { gaps, oversized });
        }
        if accept_gaps && !self.gaps.is_empty() {
            tracing::warn!(gaps = self.gaps.len(), "loading with acknowledged gaps");
        }
        Ok(())
    }
}

/// Runs every stage over `inputs`.
pub fn run_pipeline(
    config: &ReconcileConfig,
    inputs: &PipelineInputs,
    repair: &dyn RowRepair,
) -> Result<PipelineRun> {
    let run_start = Instant::now();
    let matcher = config.matcher()?;

    // ========================================================================
    // Stage 1: Normalize
    // ========================================================================
    let (editions, lookups, metadata) = info_span!("normalize").in_scope(|| -> Result<_> {
        let editions = inputs
            .editions
            .iter()
            .map(|e| -> Result<_> { Ok((e.year, normalize_table_columns(&e.table)?)) })
            .collect::<Result<Vec<_>>>()?;
        let lookups = inputs
            .lookups
            .iter()
            .map(|(name, t)| -> Result<_> { Ok((name.clone(), normalize_table_columns(t)?)) })
            .collect::<Result<BTreeMap<_, _>>>()?;
        // Metadata sheets are normalized by the assembler itself.
        Ok((editions, lookups, &inputs.metadata))
    })?;

    // ========================================================================
    // Stage 2: Stack
    // ========================================================================
    let primary = info_span!("stack").in_scope(|| -> Result<Table> {
        match editions.as_slice() {
            [] => Err(ReconcileError::MissingSource("primary".to_string())),
            [(None, table)] => Ok(table.clone()),
            many => {
                let mut years = Vec::with_capacity(many.len());
                for (year, table) in many {
                    let year = year.ok_or_else(|| {
                        ReconcileError::MissingSource(format!("year of edition '{}'", table.name()))
                    })?;
                    years.push((year, table));
                }
                Ok(stack_years(years, &config.year_column)?)
            }
        }
    })?;

    // ========================================================================
    // Stage 3: Assemble
    // ========================================================================
    let assembly = info_span!("assemble").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let sheets = config
            .categories
            .iter()
            .map(|rule| {
                metadata
                    .get(&rule.sheet)
                    .map(|sheet| (rule, sheet))
                    .ok_or_else(|| ReconcileError::MissingSource(rule.sheet.clone()))
            })
            .collect::<Result<Vec<(&CategoryRule, &Table)>>>()?;
        let assembly = assemble_catalogue(sheets)?;
        info!(
            records = assembly.catalogue.len(),
            duplicates = assembly.duplicates.len(),
            duration_ms = start.elapsed().as_millis(),
            "catalogue assembled"
        );
        Ok(assembly)
    })?;

    // ========================================================================
    // Stage 4-6: Merge, sort, repair
    // ========================================================================
    let merged = info_span!("merge").in_scope(|| -> Result<MergedTable> {
        let start = Instant::now();
        let mut merged = MergedTable::from_primary(&primary);
        for spec in &config.joins {
            let lookup = lookups
                .get(&spec.lookup)
                .ok_or_else(|| ReconcileError::MissingSource(spec.lookup.clone()))?;
            merged = merge(&merged, lookup, spec)?;
        }
        info!(
            rows = merged.height(),
            columns = merged.columns.len(),
            lookups = config.joins.len(),
            duration_ms = start.elapsed().as_millis(),
            "merge complete"
        );
        Ok(merged)
    })?;

    let merged = if config.sort_keys.is_empty() {
        merged
    } else {
        info_span!("sort").in_scope(|| {
            sort_by_keys(&merged, &config.sort_keys, config.require_total_order)
        })?
    };

    let merged = info_span!("repair").in_scope(|| apply_repair(&merged, repair))?;

    // ========================================================================
    // Stage 7-8: Resolve and reconcile
    // ========================================================================
    let (catalogue, gaps) = info_span!("reconcile").in_scope(|| {
        let start = Instant::now();
        let resolved = resolve_catalogue(&assembly.catalogue, &merged.columns, &matcher);
        let mut gaps: Vec<Gap> = assembly.duplicates.iter().map(Gap::from).collect();
        gaps.extend(find_gaps(&resolved, &merged.columns, &config.gap_policy()));
        let report = GapReport::new(gaps);
        info!(
            records = resolved.catalogue.len(),
            gaps = report.len(),
            duration_ms = start.elapsed().as_millis(),
            "reconciliation complete"
        );
        (resolved.catalogue, report)
    });

    // ========================================================================
    // Stage 9: Partition
    // ========================================================================
    let (partitions, size_violations, suggested_max_rows) =
        info_span!("partition").in_scope(|| -> Result<_> {
            let header_bytes = merged.header_bytes();
            let parts = partition(&merged.rows, config.max_rows_per_chunk)?;
            let violations = check_ceiling(&parts, config.size_ceiling_bytes, header_bytes);
            let suggestion = if violations.is_empty() {
                None
            } else {
                suggest_max_rows(
                    &merged.rows,
                    config.max_rows_per_chunk,
                    config.size_ceiling_bytes,
                    header_bytes,
                )
            };
            let summaries = parts
                .iter()
                .map(|p| PartitionSummary {
                    number: p.number,
                    label: p.label.clone(),
                    range: p.range.clone(),
                    estimated_bytes: p.estimated_bytes + header_bytes,
                })
                .collect::<Vec<_>>();
            debug!(partitions = summaries.len(), oversized = violations.len(), "partition plan");
            Ok((summaries, violations, suggestion))
        })?;

    info!(
        rows = merged.height(),
        records = catalogue.len(),
        gaps = gaps.len(),
        partitions = partitions.len(),
        duration_ms = run_start.elapsed().as_millis(),
        "pipeline complete"
    );

    Ok(PipelineRun {
        merged,
        catalogue,
        gaps,
        partitions,
        size_violations,
        suggested_max_rows,
        max_rows_per_chunk: config.max_rows_per_chunk,
    })
}
