pub mod cell;
pub mod chunk;
pub mod error;
pub mod format;
pub mod metadata;
pub mod range;
pub mod sheet;
pub mod store;
pub mod validation;
pub mod workbook;

pub use cell::{Cell, CellContent, CellValue};
pub use chunk::{ChunkedGrid, CHUNK_SIZE};
pub use error::GridError;
pub use format::{display_text, CellFormat};
pub use metadata::{
    ColumnId, DeveloperMetadata, LocationKind, MetadataEntry, MetadataId, MetadataLocation,
    MetadataQuery, MetadataTarget, MetadataVisibility,
};
pub use range::{column_letters, column_position, GridRange, SheetId};
pub use sheet::{Sheet, DEFAULT_COLUMNS, DEFAULT_ROWS};
pub use store::{GridResult, GridStore, NamedRange};
pub use validation::{DataValidationRule, ValidationCriteria, ValidationOperator};
pub use workbook::Workbook;
