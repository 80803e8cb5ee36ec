//! Loading configured sources into pipeline inputs.

use std::collections::BTreeMap;
use std::time::Instant;

use recon_core::{Edition, PipelineInputs, ReconcileConfig, SourceConfig};
use recon_model::Table;
use tracing::{debug, info, info_span};

use crate::csv::{check_file_size, read_csv_table, validate_dataframe_shape, validate_encoding};
use crate::error::{IngestError, Result};
use crate::frame::dataframe_to_table;

/// Reads one source file into a table named after the source.
///
/// Runs the size and encoding checks first so a bad file fails before
/// Polars touches it.
pub fn read_source(source: &SourceConfig, geometry_columns: &[String]) -> Result<Table> {
    let start = Instant::now();
    let path = source.path.as_path();

    check_file_size(path)?;
    validate_encoding(path)?;
    let (df, headers) = read_csv_table(path, source.skip_rows)?;
    validate_dataframe_shape(&df, path)?;
    let table = dataframe_to_table(&source.name, &df, geometry_columns)?;

    debug!(
        source = %source.name,
        path = %path.display(),
        rows = table.height(),
        columns = headers.len(),
        skipped = headers.skip_rows(),
        duration_ms = start.elapsed().as_millis(),
        "source loaded"
    );
    Ok(table)
}

fn read_named(
    role: &'static str,
    sources: &[SourceConfig],
    geometry_columns: &[String],
) -> Result<BTreeMap<String, Table>> {
    let mut tables = BTreeMap::new();
    for source in sources {
        if tables.contains_key(&source.name) {
            return Err(IngestError::DuplicateSource {
                role,
                name: source.name.clone(),
            });
        }
        let table = read_source(source, geometry_columns)?;
        tables.insert(source.name.clone(), table);
    }
    Ok(tables)
}

/// Reads every source the configuration names.
///
/// Primary editions keep their declared order. Metadata sheets never carry
/// geometry.
pub fn load_inputs(config: &ReconcileConfig) -> Result<PipelineInputs> {
    info_span!("ingest").in_scope(|| -> Result<PipelineInputs> {
        let start = Instant::now();
        let sources = &config.sources;

        let editions = sources
            .primary
            .iter()
            .map(|source| -> Result<Edition> {
                Ok(Edition {
                    year: source.year,
                    table: read_source(source, &config.geometry_columns)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let lookups = read_named("lookup", &sources.lookups, &config.geometry_columns)?;
        let metadata = read_named("metadata", &sources.metadata, &[])?;

        info!(
            editions = editions.len(),
            lookups = lookups.len(),
            metadata = metadata.len(),
            duration_ms = start.elapsed().as_millis(),
            "sources loaded"
        );
        Ok(PipelineInputs {
            editions,
            lookups,
            metadata,
        })
    })
}
