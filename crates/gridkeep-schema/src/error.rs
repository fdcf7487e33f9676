use gridkeep_core::{GridError, MetadataId};
use gridkeep_table::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Invalid schema configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse schema configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read schema configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Named range '{0}' not found")]
    NamedRangeNotFound(String),

    #[error("Named range '{0}' resolves to no column")]
    UnresolvedColumn(String),

    #[error("Malformed '{key}' tag #{id}: {reason}")]
    MalformedTag {
        id: MetadataId,
        key: String,
        reason: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
