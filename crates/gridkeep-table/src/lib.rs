//! Header-keyed tables on top of a [`gridkeep_core::GridStore`].
//!
//! Every operation takes the store and a [`HeaderIndex`] explicitly; the index
//! is the only state shared between calls.

pub mod error;
pub mod header;
pub mod mover;
pub mod record;
pub mod sparse;
pub mod table;

pub use error::{TableError, TableResult};
pub use header::{is_blank_header, labelled_width, normalize_header, HeaderIndex, BLANK_HEADER, DEFAULT_HEADER_ROW};
pub use mover::{
    append_data_row, create_row, insert_column_like, insert_header_column, move_row, move_rows,
    PRIVATE_HEADER_PREFIX,
};
pub use record::{Fields, Record};
pub use sparse::{set_values_by_header_names, WriteOptions, WriteOutcome};
pub use table::{
    append_values_by_header_names, display_value_by_header_name, find_first_row, max_value_in_range,
    range_to_records, value_by_header_name, ReadOptions,
};
