//! Schema tags and named ranges for gridkeep workbooks.

pub mod config;
pub mod error;
pub mod named_ranges;
pub mod registry;
pub mod report;
pub mod rule;

pub use config::{ColumnDescriptor, NamedRangeEntry, SchemaConfig, SheetDescriptor};
pub use error::{SchemaError, SchemaResult};
pub use named_ranges::{build_named_ranges, expected_range, NAMED_RANGE_OVERHANG};
pub use registry::{
    locate_sheet, SchemaRegistry, Scope, SheetAssessment, TaggedHeader, DATA_VALIDATION_KEY,
    HEADER_NAME_KEY, NUMBER_FORMAT_KEY, SHEET_NAME_KEY,
};
pub use report::{BatchReport, ItemReport, ItemStatus};
pub use rule::{CriteriaKind, ValidationSpec};
