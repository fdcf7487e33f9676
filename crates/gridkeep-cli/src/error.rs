use thiserror::Error;

/// Errors raised by the command layer itself; library errors pass through `anyhow`
#[derive(Error, Debug)]
pub enum CliError {
    #[error("No workbook given (use --workbook or GRIDKEEP_WORKBOOK)")]
    MissingWorkbook,

    #[error("No schema configuration given (use --schema or GRIDKEEP_SCHEMA)")]
    MissingSchema,

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("{failed} of {total} item(s) failed")]
    PartialFailure { failed: usize, total: usize },
}
