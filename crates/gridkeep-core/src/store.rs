//! The substrate seam: everything the table and schema layers need from a grid.
//!
//! All ranges are 1-based and rectangular. 2-D arrays are row-major and must
//! match the range's shape exactly.

use crate::cell::{CellContent, CellValue};
use crate::error::GridError;
use crate::metadata::{MetadataEntry, MetadataId, MetadataQuery, MetadataTarget, MetadataVisibility};
use crate::range::{GridRange, SheetId};
use crate::validation::DataValidationRule;

pub type GridResult<T> = Result<T, GridError>;

/// A named reference to a rectangular region
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NamedRange {
    pub name: String,
    pub range: GridRange,
}

pub trait GridStore {
    // Sheets

    fn sheet_ids(&self) -> Vec<SheetId>;
    fn sheet_by_name(&self, name: &str) -> Option<SheetId>;
    fn sheet_name(&self, sheet: SheetId) -> GridResult<String>;
    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> GridResult<()>;
    fn max_rows(&self, sheet: SheetId) -> GridResult<u32>;
    fn max_columns(&self, sheet: SheetId) -> GridResult<u32>;
    /// Last row with content, 0 when the sheet holds none
    fn last_row(&self, sheet: SheetId) -> GridResult<u32>;
    /// Last column with content, 0 when the sheet holds none
    fn last_column(&self, sheet: SheetId) -> GridResult<u32>;

    // Cell data

    fn contents(&self, range: &GridRange) -> GridResult<Vec<Vec<CellContent>>>;
    fn set_contents(&mut self, range: &GridRange, contents: &[Vec<CellContent>]) -> GridResult<()>;
    fn display_values(&self, range: &GridRange) -> GridResult<Vec<Vec<String>>>;
    fn number_formats(&self, range: &GridRange) -> GridResult<Vec<Vec<Option<String>>>>;
    fn set_number_format(&mut self, range: &GridRange, pattern: &str) -> GridResult<()>;
    fn data_validations(&self, range: &GridRange) -> GridResult<Vec<Vec<Option<DataValidationRule>>>>;
    /// Set or, with `None`, clear the rule on every cell of the range
    fn set_data_validation(
        &mut self,
        range: &GridRange,
        rule: Option<&DataValidationRule>,
    ) -> GridResult<()>;
    /// Tile the formatting of `source` over `dest`
    fn copy_format_to_range(&mut self, source: &GridRange, dest: &GridRange) -> GridResult<()>;

    /// Computed values (formula cells report their cached value)
    fn values(&self, range: &GridRange) -> GridResult<Vec<Vec<CellValue>>> {
        Ok(self
            .contents(range)?
            .into_iter()
            .map(|row| row.iter().map(|c| c.computed_value().clone()).collect())
            .collect())
    }

    /// Formula text per cell, empty for plain values
    fn formulas(&self, range: &GridRange) -> GridResult<Vec<Vec<String>>> {
        Ok(self
            .contents(range)?
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.formula_expression().unwrap_or_default().to_string())
                    .collect()
            })
            .collect())
    }

    fn set_values(&mut self, range: &GridRange, values: &[Vec<CellValue>]) -> GridResult<()> {
        let contents: Vec<Vec<CellContent>> = values
            .iter()
            .map(|row| row.iter().cloned().map(CellContent::from).collect())
            .collect();
        self.set_contents(range, &contents)
    }

    // Structure

    fn insert_rows(&mut self, sheet: SheetId, before: u32, count: u32) -> GridResult<()>;
    fn delete_rows(&mut self, sheet: SheetId, start: u32, count: u32) -> GridResult<()>;
    fn insert_columns(&mut self, sheet: SheetId, before: u32, count: u32) -> GridResult<()>;
    fn delete_columns(&mut self, sheet: SheetId, start: u32, count: u32) -> GridResult<()>;
    /// Write `values` into the row after the last row with content, growing the
    /// sheet if needed. Returns the row position written.
    fn append_row(&mut self, sheet: SheetId, values: &[CellValue]) -> GridResult<u32>;

    // Developer metadata

    fn add_metadata(
        &mut self,
        target: MetadataTarget,
        key: &str,
        value: &str,
        visibility: MetadataVisibility,
    ) -> GridResult<MetadataId>;
    fn find_metadata(&self, query: &MetadataQuery) -> Vec<MetadataEntry>;
    fn remove_metadata(&mut self, id: MetadataId) -> GridResult<()>;

    // Named ranges

    fn named_ranges(&self) -> Vec<NamedRange>;
    fn set_named_range(&mut self, name: &str, range: GridRange) -> GridResult<()>;

    fn range_by_name(&self, name: &str) -> Option<GridRange> {
        self.named_ranges()
            .into_iter()
            .find(|named| named.name == name)
            .map(|named| named.range)
    }

    /// Rows 1..last row, columns 1..last column (at least one cell)
    fn data_range(&self, sheet: SheetId) -> GridResult<GridRange> {
        let rows = self.last_row(sheet)?.max(1);
        let columns = self.last_column(sheet)?.max(1);
        Ok(GridRange::new(sheet, 1, 1, rows, columns))
    }

    /// Every column of the rows covered by `range`
    fn full_rows(&self, range: &GridRange) -> GridResult<GridRange> {
        let columns = self.max_columns(range.sheet)?;
        Ok(GridRange::new(range.sheet, range.row, 1, range.num_rows, columns))
    }

    /// Every column of the first row of `range`
    fn full_row(&self, range: &GridRange) -> GridResult<GridRange> {
        let columns = self.max_columns(range.sheet)?;
        Ok(GridRange::new(range.sheet, range.row, 1, 1, columns))
    }

    /// Rows 2..max rows of one column, i.e. the column without its header cell
    fn column_data_range(&self, sheet: SheetId, column: u32) -> GridResult<Option<GridRange>> {
        let max_rows = self.max_rows(sheet)?;
        if max_rows < 2 {
            return Ok(None);
        }
        Ok(Some(GridRange::new(sheet, 2, column, max_rows - 1, 1)))
    }
}
