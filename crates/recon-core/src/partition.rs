//! Splits the merged dataset into bounded, numbered partitions.

use std::ops::Range;

use recon_model::MergedRow;

use crate::error::PartitionError;

/// Rows per partition unless configured otherwise.
pub const DEFAULT_MAX_ROWS_PER_CHUNK: usize = 6000;
/// 95 MiB, under the 100 MB single-file hosting limit.
pub const DEFAULT_SIZE_CEILING_BYTES: u64 = 95 * 1024 * 1024;

/// A row whose rendered size can be estimated.
pub trait SizedRow {
    fn estimated_bytes(&self) -> u64;
}

impl SizedRow for MergedRow {
    fn estimated_bytes(&self) -> u64 {
        MergedRow::estimated_bytes(self)
    }
}

/// A contiguous slice of the input, numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a, R> {
    pub number: usize,
    /// Zero-padded `number`, shared width across the sequence.
    pub label: String,
    /// Row positions in the input.
    pub range: Range<usize>,
    pub rows: &'a [R],
    /// Rendered size of the rows, header excluded.
    pub estimated_bytes: u64,
}

impl<R> Partition<'_, R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_name(&self, stem: &str, extension: &str) -> String {
        file_name(stem, &self.label, extension)
    }
}

/// Zero-padded label for partition `number` of `total`; width is at least 3.
pub fn label(number: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("{number:0width$}")
}

/// `<stem>_<label>.<extension>`.
pub fn file_name(stem: &str, label: &str, extension: &str) -> String {
    format!("{stem}_{label}.{extension}")
}

/// Cuts `rows` into `ceil(len / max_rows_per_chunk)` contiguous partitions.
///
/// Every partition except possibly the last holds exactly `max_rows_per_chunk`
/// rows. No rows yields no partitions.
pub fn partition<R: SizedRow>(
    rows: &[R],
    max_rows_per_chunk: usize,
) -> Result<Vec<Partition<'_, R>>, PartitionError> {
    if max_rows_per_chunk == 0 {
        return Err(PartitionError::InvalidChunkSize);
    }

    let total = rows.len().div_ceil(max_rows_per_chunk);
    let partitions: Vec<Partition<'_, R>> = rows
        .chunks(max_rows_per_chunk)
        .enumerate()
        .map(|(idx, chunk)| {
            let start = idx * max_rows_per_chunk;
            Partition {
                number: idx + 1,
                label: label(idx + 1, total),
                range: start..start + chunk.len(),
                rows: chunk,
                estimated_bytes: chunk.iter().map(SizedRow::estimated_bytes).sum(),
            }
        })
        .collect();

    tracing::info!(
        rows = rows.len(),
        max_rows_per_chunk,
        partitions = partitions.len(),
        "partitioned rows"
    );
    Ok(partitions)
}

/// Reports every partition whose size plus `header_bytes` exceeds `ceiling`.
///
/// Nothing is re-partitioned; see [`suggest_max_rows`] for a retry size.
pub fn check_ceiling<R>(
    partitions: &[Partition<'_, R>],
    ceiling: u64,
    header_bytes: u64,
) -> Vec<PartitionError> {
    partitions
        .iter()
        .filter_map(|p| {
            let size_bytes = p.estimated_bytes + header_bytes;
            (size_bytes > ceiling).then(|| {
                tracing::warn!(
                    partition = p.number,
                    size_bytes,
                    ceiling_bytes = ceiling,
                    "partition exceeds size ceiling"
                );
                PartitionError::PartitionSizeExceeded {
                    number: p.number,
                    label: p.label.clone(),
                    size_bytes,
                    ceiling_bytes: ceiling,
                }
            })
        })
        .collect()
}

/// A chunk size below `current` under which every partition fits `ceiling`,
/// judged by the largest row. `None` when not even a single row fits.
pub fn suggest_max_rows<R: SizedRow>(
    rows: &[R],
    current: usize,
    ceiling: u64,
    header_bytes: u64,
) -> Option<usize> {
    let budget = ceiling.checked_sub(header_bytes)?;
    let widest = rows.iter().map(SizedRow::estimated_bytes).max()?;
    if widest == 0 {
        return Some(current.max(1));
    }
    let fits = usize::try_from(budget / widest).ok()?;
    if fits == 0 {
        return None;
    }
    Some(fits.min(current.max(1)))
}
