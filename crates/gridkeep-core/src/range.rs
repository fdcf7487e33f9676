use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a sheet; survives renames, not duplication
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Convert a 1-based column position to letters (1 -> A, 27 -> AA, 703 -> AAA)
pub fn column_letters(position: u32) -> String {
    let mut label = String::new();
    let mut n = position;

    while n > 0 {
        n -= 1;
        label.insert(0, char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }

    label
}

/// Convert column letters to a 1-based position (A -> 1, AA -> 27)
pub fn column_position(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }

    Some(col)
}

/// A rectangular block of cells on one sheet. Positions are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRange {
    pub sheet: SheetId,
    pub row: u32,
    pub column: u32,
    pub num_rows: u32,
    pub num_columns: u32,
}

impl GridRange {
    pub const fn new(sheet: SheetId, row: u32, column: u32, num_rows: u32, num_columns: u32) -> Self {
        GridRange {
            sheet,
            row,
            column,
            num_rows,
            num_columns,
        }
    }

    /// A single cell
    pub const fn cell(sheet: SheetId, row: u32, column: u32) -> Self {
        GridRange::new(sheet, row, column, 1, 1)
    }

    /// Parse `A1`, `B2:D10` style notation on the given sheet
    pub fn from_a1(sheet: SheetId, notation: &str) -> Option<Self> {
        let parts: Vec<&str> = notation.split(':').collect();
        let (start, end) = match parts.as_slice() {
            [single] => {
                let cell = parse_cell(single)?;
                (cell, cell)
            }
            [first, last] => (parse_cell(first)?, parse_cell(last)?),
            _ => return None,
        };

        let (row, last_row) = (start.0.min(end.0), start.0.max(end.0));
        let (column, last_column) = (start.1.min(end.1), start.1.max(end.1));
        Some(GridRange::new(
            sheet,
            row,
            column,
            last_row - row + 1,
            last_column - column + 1,
        ))
    }

    pub fn last_row(&self) -> u32 {
        (self.row + self.num_rows).saturating_sub(1)
    }

    pub fn last_column(&self) -> u32 {
        (self.column + self.num_columns).saturating_sub(1)
    }

    /// `A1` or `A1:B2` notation, without the sheet name
    pub fn a1_notation(&self) -> String {
        let start = format!("{}{}", column_letters(self.column), self.row);
        if self.num_rows == 1 && self.num_columns == 1 {
            start
        } else {
            format!(
                "{}:{}{}",
                start,
                column_letters(self.last_column()),
                self.last_row()
            )
        }
    }

    /// Check if a 1-based cell position is within this range
    pub fn contains(&self, row: u32, column: u32) -> bool {
        row >= self.row && row <= self.last_row() && column >= self.column && column <= self.last_column()
    }

    /// True when `self` lies fully inside `outer` on the same sheet
    pub fn is_within(&self, outer: &GridRange) -> bool {
        self.sheet == outer.sheet
            && self.row >= outer.row
            && self.last_row() <= outer.last_row()
            && self.column >= outer.column
            && self.last_column() <= outer.last_column()
    }

    /// Check if this range shares at least one cell with another range
    pub fn overlaps(&self, other: &GridRange) -> bool {
        self.sheet == other.sheet
            && self.row <= other.last_row()
            && self.last_row() >= other.row
            && self.column <= other.last_column()
            && self.last_column() >= other.column
    }

    /// True when the column span intersects `[first, last]`
    pub fn spans_columns(&self, first: u32, last: u32) -> bool {
        self.column <= last && self.last_column() >= first
    }

    /// Range after `count` rows were inserted before row `before`
    pub fn with_rows_inserted(&self, before: u32, count: u32) -> GridRange {
        let mut shifted = *self;
        if before <= self.row {
            shifted.row += count;
        } else if before <= self.last_row() {
            shifted.num_rows += count;
        }
        shifted
    }

    /// Range after rows `start..start + count` were deleted, or `None` if nothing is left
    pub fn with_rows_deleted(&self, start: u32, count: u32) -> Option<GridRange> {
        let (row, num_rows) = shrink_span(self.row, self.num_rows, start, count)?;
        Some(GridRange { row, num_rows, ..*self })
    }

    /// Range after `count` columns were inserted before column `before`
    pub fn with_columns_inserted(&self, before: u32, count: u32) -> GridRange {
        let mut shifted = *self;
        if before <= self.column {
            shifted.column += count;
        } else if before <= self.last_column() {
            shifted.num_columns += count;
        }
        shifted
    }

    /// Range after columns `start..start + count` were deleted, or `None` if nothing is left
    pub fn with_columns_deleted(&self, start: u32, count: u32) -> Option<GridRange> {
        let (column, num_columns) = shrink_span(self.column, self.num_columns, start, count)?;
        Some(GridRange {
            column,
            num_columns,
            ..*self
        })
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.a1_notation())
    }
}

fn parse_cell(notation: &str) -> Option<(u32, u32)> {
    let notation = notation.trim();
    let split = notation.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = notation.split_at(split);
    let column = column_position(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, column))
}

fn shrink_span(pos: u32, len: u32, start: u32, count: u32) -> Option<(u32, u32)> {
    let last = pos + len - 1;
    let end = start + count - 1;

    if end < pos {
        return Some((pos - count, len));
    }
    if start > last {
        return Some((pos, len));
    }

    let removed = end.min(last) - start.max(pos) + 1;
    if removed >= len {
        return None;
    }
    Some((pos.min(start), len - removed))
}
