use gridkeep_core::GridError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Range {range} has {expected} data rows but {actual} records were supplied")]
    RowCountMismatch {
        range: String,
        expected: usize,
        actual: usize,
    },

    #[error("Empty column heading in column {column} of sheet '{sheet}', action cancelled")]
    BlankSourceHeader { sheet: String, column: u32 },
}

pub type TableResult<T> = Result<T, TableError>;
