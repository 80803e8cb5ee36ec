use std::collections::BTreeSet;

use recon_model::{CellValue, Table};

use crate::error::MergeError;

/// Concatenates yearly editions of one dataset and appends `year_column`.
///
/// Every edition must carry the same column set as the first one; column order
/// may differ and follows the first edition in the output. Editions are stacked
/// in the order given.
pub fn stack_years<'a, I>(editions: I, year_column: &str) -> Result<Table, MergeError>
where
    I: IntoIterator<Item = (i64, &'a Table)>,
{
    let mut editions = editions.into_iter();
    let Some((first_year, first)) = editions.next() else {
        return Err(MergeError::NoEditions);
    };

    let expected: BTreeSet<&String> = first.columns().iter().collect();
    let mut stacked = first.with_constant_column(year_column, &CellValue::Integer(first_year))?;
    let mut years = vec![first_year];

    for (year, edition) in editions {
        let found: BTreeSet<&String> = edition.columns().iter().collect();
        if found != expected {
            return Err(MergeError::SchemaMismatch {
                table: edition.name().to_string(),
                year,
                missing: expected.difference(&found).map(|c| c.to_string()).collect(),
                extra: found.difference(&expected).map(|c| c.to_string()).collect(),
            });
        }
        let aligned = edition
            .select(first.columns())?
            .with_constant_column(year_column, &CellValue::Integer(year))?;
        stacked.append(aligned)?;
        years.push(year);
    }

    tracing::info!(
        table = stacked.name(),
        editions = ?years,
        rows = stacked.height(),
        "stacked yearly editions"
    );
    Ok(stacked)
}
