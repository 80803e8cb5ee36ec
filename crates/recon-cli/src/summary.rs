use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use recon_core::GapKind;
use recon_core::matcher::CalibrationReport;
use recon_model::{Category, Resolution};

use crate::types::{CalibrationResult, RunResult, VerifyResult};

const RESOLUTION_COLUMNS: [Resolution; 5] = [
    Resolution::Exact,
    Resolution::Fuzzy,
    Resolution::Override,
    Resolution::Ambiguous,
    Resolution::Unresolved,
];

pub fn print_run_summary(result: &RunResult) {
    let run = &result.run;
    println!("Dataset: {}", run.merged.name);
    println!(
        "Merged: {} rows x {} columns",
        run.merged.height(),
        run.merged.columns.len()
    );
    println!("Output: {}", result.output_dir.display());

    print_catalogue_table(result);
    print_gap_table(result);
    print_partition_table(result);

    if let Some(rows) = run.suggested_max_rows {
        println!("Suggested max_rows_per_chunk: {rows}");
    }
    if result.dry_run {
        println!("Dry run: no files written.");
    } else if let Some(manifest) = &result.manifest {
        println!(
            "Wrote {} files; manifest lists {} acknowledged gap(s).",
            manifest.files.len(),
            manifest.acknowledged_gaps
        );
    }
    if let Some(reason) = &result.blocked {
        eprintln!("Blocked: {reason}");
    }
}

fn print_catalogue_table(result: &RunResult) {
    let catalogue = &result.run.catalogue;
    let mut table = Table::new();
    let mut header = vec![header_cell("Category"), header_cell("Records")];
    header.extend(RESOLUTION_COLUMNS.iter().map(|r| header_cell(r.as_str())));
    table.set_header(header);
    apply_summary_table_style(&mut table);
    for index in 1..=RESOLUTION_COLUMNS.len() + 1 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for category in Category::ALL {
        let records: Vec<_> = catalogue.by_category(category).collect();
        if records.is_empty() {
            continue;
        }
        let mut row = vec![
            Cell::new(category.as_str())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(records.len()),
        ];
        for resolution in RESOLUTION_COLUMNS {
            let count = records.iter().filter(|r| r.resolution == resolution).count();
            let color = match resolution {
                Resolution::Ambiguous | Resolution::Unresolved => Color::Red,
                _ => Color::Green,
            };
            row.push(count_cell(count, color));
        }
        table.add_row(row);
    }

    let counts = catalogue.resolution_counts();
    let mut total = vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(catalogue.len()).add_attribute(Attribute::Bold),
    ];
    for resolution in RESOLUTION_COLUMNS {
        let count = counts.get(&resolution).copied().unwrap_or(0);
        total.push(Cell::new(count).add_attribute(Attribute::Bold));
    }
    table.add_row(total);
    println!("{table}");
}

fn print_gap_table(result: &RunResult) {
    let gaps = &result.run.gaps;
    if gaps.is_empty() {
        println!("No reconciliation gaps.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Category"),
        header_cell("Variable"),
        header_cell("Column"),
        header_cell("Detail"),
    ]);
    apply_summary_table_style(&mut table);
    for gap in gaps.gaps() {
        let kind = Cell::new(gap.kind).fg(gap_color(gap.kind));
        table.add_row(vec![
            kind,
            optional_cell(gap.category.map(|c| c.as_str())),
            optional_cell(gap.declared_name.as_deref()),
            optional_cell(gap.column.as_deref()),
            Cell::new(&gap.detail),
        ]);
    }
    println!();
    println!("Gaps:");
    println!("{table}");
}

fn print_partition_table(result: &RunResult) {
    let run = &result.run;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Partition"),
        header_cell("Rows"),
        header_cell("Range"),
        header_cell("Size"),
        header_cell("Written"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);

    let oversized = |label: &str| {
        run.size_violations.iter().any(|v| {
            matches!(v, recon_core::PartitionError::PartitionSizeExceeded { label: l, .. } if l == label)
        })
    };
    for summary in &run.partitions {
        let written = result
            .manifest
            .as_ref()
            .and_then(|m| m.partitions().find(|f| f.label.as_deref() == Some(summary.label.as_str())));
        let size = match written {
            Some(entry) => entry.bytes,
            None => summary.estimated_bytes,
        };
        let size_cell = if oversized(&summary.label) {
            Cell::new(format_bytes(size))
                .fg(Color::Red)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(format_bytes(size))
        };
        table.add_row(vec![
            Cell::new(&summary.label),
            Cell::new(summary.range.len()),
            dim_cell(format!("{}..{}", summary.range.start, summary.range.end)),
            size_cell,
            match written {
                Some(_) => Cell::new("✓")
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
                None => dim_cell("-"),
            },
        ]);
    }
    println!();
    println!("Partitions:");
    println!("{table}");
}

pub fn print_calibration(result: &CalibrationResult) {
    println!("Pairs: {} ({})", result.pair_count, result.source);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Threshold"),
        header_cell("Accuracy"),
        header_cell("TP"),
        header_cell("TN"),
        header_cell("FP"),
        header_cell("FN"),
    ]);
    apply_table_style(&mut table);
    for index in 0..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for report in &result.sweep {
        let selected = report.threshold == result.selected.threshold;
        let mut threshold = Cell::new(format!("{:.2}", report.threshold));
        if selected {
            threshold = threshold.fg(Color::Cyan).add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            threshold,
            Cell::new(format!("{:.3}", report.accuracy())),
            Cell::new(report.true_positives),
            Cell::new(report.true_negatives),
            count_cell(report.false_positives, Color::Red),
            count_cell(report.false_negatives, Color::Red),
        ]);
    }
    println!("{table}");
    print_misclassified(&result.selected);
}

fn print_misclassified(report: &CalibrationReport) {
    if report.is_clean() {
        println!("No misclassified pairs at {:.2}.", report.threshold);
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Declared"),
        header_cell("Candidate"),
        header_cell("Expected"),
        header_cell("Score"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for miss in &report.misclassified {
        table.add_row(vec![
            Cell::new(&miss.pair.declared),
            Cell::new(&miss.pair.candidate),
            Cell::new(if miss.pair.expected { "match" } else { "no match" }),
            Cell::new(format!("{:.3}", miss.score)).fg(Color::Red),
        ]);
    }
    println!();
    println!("Misclassified at {:.2}:", report.threshold);
    println!("{table}");
}

pub fn print_verify(result: &VerifyResult) {
    println!(
        "Manifest: {} ({} files, generated {})",
        result.directory.display(),
        result.manifest.files.len(),
        result.manifest.generated_at
    );
    if result.mismatches.is_empty() {
        println!("All checksums match.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Expected"),
        header_cell("Actual"),
    ]);
    apply_table_style(&mut table);
    for mismatch in &result.mismatches {
        table.add_row(vec![
            Cell::new(&mismatch.file).fg(Color::Red),
            dim_cell(&mismatch.expected),
            Cell::new(&mismatch.actual),
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn gap_color(kind: GapKind) -> Color {
    match kind {
        GapKind::UnresolvedVariable | GapKind::AmbiguousMatch => Color::Red,
        _ => Color::Yellow,
    }
}

fn format_bytes(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / MIB)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
