use thiserror::Error;

/// Errors raised when constructing or reshaping model types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A column name was empty after trimming.
    #[error("empty column name in table '{table}'")]
    EmptyColumnName { table: String },

    /// Two columns share the same name.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// A row did not have one value per column.
    #[error("row {row} of table '{table}' has {found} values, expected {expected}")]
    RowArity {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A column was referenced that the table does not have.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
