//! Builds the variable catalogue from metadata sheets.

use recon_model::{Category, CellValue, Table, VariableCatalogue, VariableRecord};
use serde::Serialize;

use super::fill::{forward_fill, is_blank};
use super::rules::CategoryRule;
use crate::error::AssemblyError;
use crate::normalize::{normalize, normalize_table_columns};

/// A second declaration of an already catalogued `(declared_name, category)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateDeclaration {
    pub category: Category,
    pub declared_name: String,
    pub sheet: String,
    /// Zero-based row of the duplicate, counted after skipped and blank rows.
    pub row: usize,
}

/// Result of assembling every sheet.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub catalogue: VariableCatalogue,
    pub duplicates: Vec<DuplicateDeclaration>,
}

/// Extracts the records one sheet declares, in sheet order.
///
/// Duplicates within the sheet are kept here; [`assemble_catalogue`] decides
/// which declaration wins.
pub fn assemble_sheet(
    rule: &CategoryRule,
    sheet: &Table,
) -> Result<Vec<(usize, VariableRecord)>, AssemblyError> {
    if rule.skip_rows > sheet.height() {
        return Err(AssemblyError::SkipRowsExceedSheet {
            sheet: sheet.name().to_string(),
            rows: sheet.height(),
            skip: rule.skip_rows,
        });
    }

    let normalized = normalize_table_columns(sheet)?;
    let renamed = normalized.rename_columns(|header| rule.target_field(header))?;

    // Fully blank rows are separators and do not take part in forward fill.
    let mut table = Table::from_rows(
        renamed.name().to_string(),
        renamed.columns().iter().cloned(),
        renamed
            .rows()
            .iter()
            .skip(rule.skip_rows)
            .filter(|row| !row.values.iter().all(is_blank))
            .map(|row| row.values.clone()),
    )?;

    let fields = rule.required_fields();
    for field in &fields {
        if !table.has_column(field) {
            return Err(AssemblyError::MissingColumn {
                sheet: sheet.name().to_string(),
                column: field.clone(),
            });
        }
    }

    for field in &rule.forward_fill {
        table = forward_fill(&table, &normalize(field))?;
    }

    let name_idx = table.require_column(&normalize(&rule.name_field))?;
    let type_idx = optional_index(&table, rule.type_field.as_deref())?;
    let source_idx = optional_index(&table, rule.source_field.as_deref())?;
    let keep: Vec<(String, usize)> = rule
        .keep
        .iter()
        .map(|field| {
            let field = normalize(field);
            table.require_column(&field).map(|idx| (field, idx))
        })
        .collect::<Result<_, _>>()?;

    let mut records = Vec::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        let raw_name = &row.values[name_idx];
        if is_blank(raw_name) {
            tracing::trace!(sheet = sheet.name(), row = row_idx, "skipping row without a name");
            continue;
        }

        let mut record = VariableRecord::new(rule.declared_name(&raw_name.render()), rule.category);
        record.data_type = type_idx.and_then(|idx| text_of(&row.values[idx]));
        record.source = source_idx
            .and_then(|idx| text_of(&row.values[idx]))
            .or_else(|| rule.source.clone());
        for (field, idx) in &keep {
            if let Some(value) = text_of(&row.values[*idx]) {
                record.attributes.insert(field.clone(), value);
            }
        }
        records.push((row_idx, record));
    }

    tracing::debug!(
        sheet = sheet.name(),
        category = %rule.category,
        records = records.len(),
        "assembled sheet"
    );
    Ok(records)
}

/// Assembles one catalogue from every `(rule, sheet)` pair, in order.
///
/// The first declaration of a `(declared_name, category)` wins; later ones are
/// reported in [`Assembly::duplicates`].
pub fn assemble_catalogue<'a, I>(sheets: I) -> Result<Assembly, AssemblyError>
where
    I: IntoIterator<Item = (&'a CategoryRule, &'a Table)>,
{
    let mut assembly = Assembly::default();
    for (rule, sheet) in sheets {
        for (row, record) in assemble_sheet(rule, sheet)? {
            if let Err(rejected) = assembly.catalogue.insert(record) {
                tracing::warn!(
                    sheet = sheet.name(),
                    row,
                    declared_name = %rejected.declared_name,
                    category = %rejected.category,
                    "duplicate variable declaration"
                );
                assembly.duplicates.push(DuplicateDeclaration {
                    category: rejected.category,
                    declared_name: rejected.declared_name,
                    sheet: sheet.name().to_string(),
                    row,
                });
            }
        }
    }
    Ok(assembly)
}

fn optional_index(table: &Table, field: Option<&str>) -> Result<Option<usize>, AssemblyError> {
    field
        .map(|f| table.require_column(&normalize(f)))
        .transpose()
        .map_err(AssemblyError::from)
}

fn text_of(value: &CellValue) -> Option<String> {
    if is_blank(value) {
        None
    } else {
        Some(value.render().trim().to_string())
    }
}
