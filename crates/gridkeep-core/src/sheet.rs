use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellContent};
use crate::chunk::ChunkedGrid;
use crate::error::GridError;
use crate::metadata::ColumnId;
use crate::range::{GridRange, SheetId};

/// Rows in a freshly created sheet
pub const DEFAULT_ROWS: u32 = 1000;
/// Columns in a freshly created sheet (A..Z)
pub const DEFAULT_COLUMNS: u32 = 26;

/// A single sheet with sparse cell storage.
///
/// All positions are 1-based. Every column carries a [`ColumnId`] that moves
/// with it on insertion and deletion, which is what column metadata is
/// anchored to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    /// Sheet name (displayed in tab)
    pub name: String,
    /// Only non-empty cells are stored
    #[serde(default, with = "chunked_grid_serde")]
    cells: ChunkedGrid<Cell>,
    max_rows: u32,
    column_ids: Vec<ColumnId>,
    next_column_id: u32,
}

/// Serialize the chunked grid as a map keyed by "row,col"
mod chunked_grid_serde {
    use super::*;
    use serde::ser::SerializeMap;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(grid: &ChunkedGrid<Cell>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(grid.len()))?;
        for ((row, col), cell) in grid.iter() {
            let key = format!("{},{}", row + 1, col + 1);
            map.serialize_entry(&key, cell)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ChunkedGrid<Cell>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GridVisitor;

        impl<'de> de::Visitor<'de> for GridVisitor {
            type Value = ChunkedGrid<Cell>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with \"row,col\" keys")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: de::MapAccess<'de>,
            {
                let mut grid = ChunkedGrid::new();

                while let Some(key) = map.next_key::<String>()? {
                    let cell: Cell = map.next_value()?;
                    let (row, col) = key
                        .split_once(',')
                        .and_then(|(r, c)| Some((r.parse::<usize>().ok()?, c.parse::<usize>().ok()?)))
                        .filter(|(r, c)| *r > 0 && *c > 0)
                        .ok_or_else(|| de::Error::custom(format!("invalid cell key '{key}'")))?;
                    grid.insert(row - 1, col - 1, cell);
                }

                Ok(grid)
            }
        }

        deserializer.deserialize_map(GridVisitor)
    }
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<String>) -> Self {
        Self::with_size(id, name, DEFAULT_ROWS, DEFAULT_COLUMNS)
    }

    pub fn with_size(id: SheetId, name: impl Into<String>, rows: u32, columns: u32) -> Self {
        let mut sheet = Self {
            id,
            name: name.into(),
            cells: ChunkedGrid::new(),
            max_rows: rows.max(1),
            column_ids: Vec::new(),
            next_column_id: 0,
        };
        sheet.ensure_columns(columns.max(1));
        sheet
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    pub fn max_columns(&self) -> u32 {
        self.column_ids.len() as u32
    }

    /// Stable identity of the column currently at `position`
    pub fn column_id(&self, position: u32) -> Option<ColumnId> {
        let index = position.checked_sub(1)? as usize;
        self.column_ids.get(index).copied()
    }

    /// Current 1-based position of a column identity
    pub fn column_position(&self, id: ColumnId) -> Option<u32> {
        self.column_ids
            .iter()
            .position(|c| *c == id)
            .map(|i| i as u32 + 1)
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        let (r, c) = to_index(row, column)?;
        self.cells.get(r, c)
    }

    /// Content at a position (empty for cells that are not stored)
    pub fn content(&self, row: u32, column: u32) -> CellContent {
        self.cell(row, column)
            .map(|cell| cell.content.clone())
            .unwrap_or_default()
    }

    /// Apply `f` to the cell at a position, dropping it again if it ends up empty
    pub fn update_cell<F>(&mut self, row: u32, column: u32, f: F)
    where
        F: FnOnce(&mut Cell),
    {
        let Some((r, c)) = to_index(row, column) else {
            return;
        };
        let mut cell = self.cells.remove(r, c).unwrap_or_default();
        f(&mut cell);
        if !cell.is_empty() {
            self.cells.insert(r, c, cell);
        }
    }

    pub fn set_content(&mut self, row: u32, column: u32, content: CellContent) {
        self.update_cell(row, column, |cell| cell.content = content);
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Last row holding content, 0 for a sheet without content
    pub fn last_row(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.content.is_empty())
            .map(|((row, _), _)| row as u32 + 1)
            .max()
            .unwrap_or(0)
    }

    /// Last column holding content, 0 for a sheet without content
    pub fn last_column(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.content.is_empty())
            .map(|((_, col), _)| col as u32 + 1)
            .max()
            .unwrap_or(0)
    }

    /// Fail unless `range` is non-empty and inside the sheet
    pub fn check_range(&self, range: &GridRange) -> Result<(), GridError> {
        if range.row == 0 || range.column == 0 || range.num_rows == 0 || range.num_columns == 0 {
            return Err(GridError::InvalidRange(format!(
                "{}x{} at row {}, column {}",
                range.num_rows, range.num_columns, range.row, range.column
            )));
        }
        if range.last_row() > self.max_rows || range.last_column() > self.max_columns() {
            return Err(GridError::OutOfBounds {
                range: range.a1_notation(),
                max_rows: self.max_rows,
                max_columns: self.max_columns(),
            });
        }
        Ok(())
    }

    /// Grow the sheet to at least `rows` rows
    pub fn ensure_rows(&mut self, rows: u32) {
        self.max_rows = self.max_rows.max(rows);
    }

    /// Grow the sheet to at least `columns` columns
    pub fn ensure_columns(&mut self, columns: u32) {
        while self.max_columns() < columns {
            let id = self.allocate_column_id();
            self.column_ids.push(id);
        }
    }

    /// Insert `count` blank rows so that the first new row is `before`
    pub fn insert_rows(&mut self, before: u32, count: u32) -> Result<(), GridError> {
        if before == 0 || before > self.max_rows + 1 {
            return Err(GridError::InvalidRange(format!("cannot insert rows before row {before}")));
        }
        let first = before as usize - 1;
        let count_usize = count as usize;
        self.cells.remap(|row, col| {
            if row >= first {
                Some((row + count_usize, col))
            } else {
                Some((row, col))
            }
        });
        self.max_rows += count;
        Ok(())
    }

    /// Delete rows `start..start + count`, shifting the rows below up
    pub fn delete_rows(&mut self, start: u32, count: u32) -> Result<(), GridError> {
        if start == 0 || count == 0 || start + count - 1 > self.max_rows {
            return Err(GridError::InvalidRange(format!("cannot delete {count} rows at row {start}")));
        }
        if count >= self.max_rows {
            return Err(GridError::CannotDeleteAllRows(self.id));
        }
        let first = start as usize - 1;
        let end = first + count as usize;
        self.cells.remap(|row, col| {
            if row < first {
                Some((row, col))
            } else if row < end {
                None
            } else {
                Some((row - count as usize, col))
            }
        });
        self.max_rows -= count;
        Ok(())
    }

    /// Insert `count` blank columns so that the first new column is `before`
    pub fn insert_columns(&mut self, before: u32, count: u32) -> Result<(), GridError> {
        if before == 0 || before > self.max_columns() + 1 {
            return Err(GridError::InvalidRange(format!(
                "cannot insert columns before column {before}"
            )));
        }
        let first = before as usize - 1;
        let count_usize = count as usize;
        self.cells.remap(|row, col| {
            if col >= first {
                Some((row, col + count_usize))
            } else {
                Some((row, col))
            }
        });
        for offset in 0..count_usize {
            let id = self.allocate_column_id();
            self.column_ids.insert(first + offset, id);
        }
        Ok(())
    }

    /// Delete columns `start..start + count`; returns the identities that were removed
    pub fn delete_columns(&mut self, start: u32, count: u32) -> Result<Vec<ColumnId>, GridError> {
        if start == 0 || count == 0 || start + count - 1 > self.max_columns() {
            return Err(GridError::InvalidRange(format!(
                "cannot delete {count} columns at column {start}"
            )));
        }
        if count >= self.max_columns() {
            return Err(GridError::CannotDeleteAllColumns(self.id));
        }
        let first = start as usize - 1;
        let end = first + count as usize;
        self.cells.remap(|row, col| {
            if col < first {
                Some((row, col))
            } else if col < end {
                None
            } else {
                Some((row, col - count as usize))
            }
        });
        Ok(self.column_ids.drain(first..end).collect())
    }

    /// Fresh column identities, used when a sheet is duplicated
    pub(crate) fn reassign_column_ids(&mut self) {
        let columns = self.column_ids.len();
        self.column_ids.clear();
        for _ in 0..columns {
            let id = self.allocate_column_id();
            self.column_ids.push(id);
        }
    }

    fn allocate_column_id(&mut self) -> ColumnId {
        let id = ColumnId(self.next_column_id);
        self.next_column_id += 1;
        id
    }
}

fn to_index(row: u32, column: u32) -> Option<(usize, usize)> {
    Some((row.checked_sub(1)? as usize, column.checked_sub(1)? as usize))
}
