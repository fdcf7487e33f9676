use thiserror::Error;

use crate::range::SheetId;

/// Errors raised by a grid store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(SheetId),

    #[error("Sheet name already exists: {0}")]
    SheetNameExists(String),

    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    #[error("Cannot delete the last sheet")]
    CannotDeleteLastSheet,

    #[error("Range {range} is out of bounds ({max_rows} rows x {max_columns} columns)")]
    OutOfBounds {
        range: String,
        max_rows: u32,
        max_columns: u32,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Data has {actual_rows}x{actual_columns} cells but range {range} is {expected_rows}x{expected_columns}")]
    ShapeMismatch {
        range: String,
        expected_rows: u32,
        expected_columns: u32,
        actual_rows: usize,
        actual_columns: usize,
    },

    #[error("Cannot delete all rows of sheet {0}")]
    CannotDeleteAllRows(SheetId),

    #[error("Cannot delete all columns of sheet {0}")]
    CannotDeleteAllColumns(SheetId),

    #[error("Developer metadata not found: {0}")]
    MetadataNotFound(u32),

    #[error("Invalid named range '{0}'")]
    InvalidNamedRange(String),
}
