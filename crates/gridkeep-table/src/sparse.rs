//! Sparse header-keyed writes.
//!
//! Only the fields named in the updates are changed. Everything else inside
//! the written block is written back exactly as it was read, formulas included,
//! so the block can be written in a single call.

use gridkeep_core::{CellContent, GridRange, GridStore};

use crate::error::{TableError, TableResult};
use crate::header::{is_blank_header, HeaderIndex, DEFAULT_HEADER_ROW};
use crate::record::Fields;

/// Options for [`set_values_by_header_names`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub header_row: u32,
    /// Rewrite every data row of the range, blanking fields that are not named
    pub overwrite_all: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            overwrite_all: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// One write covering this block
    Written(GridRange),
    /// Every update was empty
    NothingToWrite,
    /// None of these referenced headers are columns of the range
    NoMatchingHeaders(Vec<String>),
}

/// Apply `updates` (one entry per data row of `range`) with the smallest possible write.
///
/// `updates` may also carry one leading entry per header row included in the
/// range; those entries are ignored. Any other length fails with
/// [`TableError::RowCountMismatch`] before anything is written.
pub fn set_values_by_header_names<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    updates: &[Fields],
    range: &GridRange,
    options: WriteOptions,
) -> TableResult<WriteOutcome> {
    let range_headers = index.range_headers(store, range, options.header_row)?;

    let top_data_row = range.row.max(options.header_row + 1);
    let data_rows = (range.last_row() + 1).saturating_sub(top_data_row) as usize;
    let header_rows = (top_data_row - range.row) as usize;

    let updates = if updates.len() == data_rows {
        updates
    } else {
        &updates[header_rows.min(updates.len())..]
    };
    if updates.len() != data_rows {
        return Err(TableError::RowCountMismatch {
            range: range.a1_notation(),
            expected: data_rows,
            actual: updates.len(),
        });
    }

    if options.overwrite_all {
        if data_rows == 0 {
            return Ok(WriteOutcome::NothingToWrite);
        }
        let block = GridRange::new(range.sheet, top_data_row, range.column, data_rows as u32, range.num_columns);
        let blank = vec![vec![CellContent::default(); range.num_columns as usize]; data_rows];
        return write_block(store, block, &range_headers, updates, blank);
    }

    let rows_with_data: Vec<usize> = updates
        .iter()
        .enumerate()
        .filter(|(_, fields)| !fields.is_empty())
        .map(|(i, _)| i)
        .collect();
    let (Some(&first_row), Some(&last_row)) = (rows_with_data.first(), rows_with_data.last()) else {
        return Ok(WriteOutcome::NothingToWrite);
    };

    let mut referenced: Vec<&str> = Vec::new();
    for header in updates.iter().flat_map(Fields::headers) {
        if !is_blank_header(header) && !referenced.contains(&header) {
            referenced.push(header);
        }
    }
    let offsets: Vec<usize> = referenced
        .iter()
        .filter_map(|header| range_headers.iter().position(|h| h == header))
        .collect();
    let (Some(&first_offset), Some(&last_offset)) = (offsets.iter().min(), offsets.iter().max()) else {
        tracing::warn!(
            "None of the headers {:?} are columns of {}, nothing written",
            referenced,
            range
        );
        return Ok(WriteOutcome::NoMatchingHeaders(
            referenced.into_iter().map(str::to_string).collect(),
        ));
    };

    let block = GridRange::new(
        range.sheet,
        top_data_row + first_row as u32,
        range.column + first_offset as u32,
        (last_row - first_row + 1) as u32,
        (last_offset - first_offset + 1) as u32,
    );
    let current = store.contents(&block)?;
    write_block(
        store,
        block,
        &range_headers[first_offset..=last_offset],
        &updates[first_row..=last_row],
        current,
    )
}

fn write_block<S: GridStore + ?Sized>(
    store: &mut S,
    block: GridRange,
    headers: &[String],
    updates: &[Fields],
    mut contents: Vec<Vec<CellContent>>,
) -> TableResult<WriteOutcome> {
    for (row, fields) in contents.iter_mut().zip(updates) {
        for (cell, header) in row.iter_mut().zip(headers) {
            // Blank-headed columns share one key and are never written
            if is_blank_header(header) {
                continue;
            }
            if let Some(value) = fields.get(header) {
                *cell = value.clone().into();
            }
        }
    }

    store.set_contents(&block, &contents)?;
    tracing::debug!("Wrote {} on sheet {}", block, block.sheet);
    Ok(WriteOutcome::Written(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{range_to_records, ReadOptions};
    use gridkeep_core::{CellValue, SheetId, Workbook};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    /// 5 data rows under a 4-column header, every cell filled
    fn table() -> (Workbook, SheetId, GridRange) {
        let mut wb = Workbook::empty("Test");
        let sheet = wb.add_sheet_with_size("Trips", 20, 4).unwrap();
        let mut rows = vec![vec![text("Date"), text("Driver"), text("Fare"), text("Notes")]];
        for r in 0..5 {
            rows.push((0..4).map(|c| text(&format!("r{r}c{c}"))).collect());
        }
        let range = GridRange::new(sheet, 1, 1, 6, 4);
        wb.set_values(&range, &rows).unwrap();
        wb.take_write_log();
        (wb, sheet, range)
    }

    fn data_rows(range: &GridRange) -> GridRange {
        GridRange::new(range.sheet, 2, range.column, range.num_rows - 1, range.num_columns)
    }

    #[test]
    fn test_single_field_touches_only_its_cell() {
        let (mut wb, sheet, range) = table();
        let mut index = HeaderIndex::new();
        let before = wb.values(&range).unwrap();

        let mut updates = vec![Fields::new(); 5];
        updates[2] = Fields::new().with("Fare", 9.5);
        let outcome =
            set_values_by_header_names(&mut wb, &mut index, &updates, &data_rows(&range), WriteOptions::default())
                .unwrap();

        let cell = GridRange::cell(sheet, 4, 3);
        assert_eq!(outcome, WriteOutcome::Written(cell));
        assert_eq!(wb.take_write_log(), vec![cell]);

        let after = wb.values(&range).unwrap();
        for (r, row) in after.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if (r, c) == (3, 2) {
                    assert_eq!(value, &CellValue::Number(9.5));
                } else {
                    assert_eq!(value, &before[r][c]);
                }
            }
        }
    }

    #[test]
    fn test_bounding_box_spans_rows_and_columns() {
        let (mut wb, sheet, range) = table();
        let mut index = HeaderIndex::new();

        let mut updates = vec![Fields::new(); 5];
        updates[1] = Fields::new().with("Driver", "Ann");
        updates[3] = Fields::new().with("Notes", "late");
        let outcome =
            set_values_by_header_names(&mut wb, &mut index, &updates, &data_rows(&range), WriteOptions::default())
                .unwrap();

        assert_eq!(outcome, WriteOutcome::Written(GridRange::new(sheet, 3, 2, 3, 3)));
        // Inside the box but not named: unchanged
        assert_eq!(wb.values(&GridRange::cell(sheet, 3, 3)).unwrap()[0][0], text("r1c2"));
        assert_eq!(wb.values(&GridRange::cell(sheet, 5, 4)).unwrap()[0][0], text("late"));
    }

    #[test]
    fn test_leading_header_entry_is_ignored() {
        let (mut wb, sheet, range) = table();
        let mut index = HeaderIndex::new();

        let mut updates = vec![Fields::new(); 6];
        updates[0] = Fields::new().with("Date", "ignored");
        updates[1] = Fields::new().with("Date", "first");
        set_values_by_header_names(&mut wb, &mut index, &updates, &range, WriteOptions::default()).unwrap();

        assert_eq!(wb.values(&GridRange::cell(sheet, 1, 1)).unwrap()[0][0], text("Date"));
        assert_eq!(wb.values(&GridRange::cell(sheet, 2, 1)).unwrap()[0][0], text("first"));
    }

    #[test]
    fn test_row_count_mismatch_writes_nothing() {
        let (mut wb, _, range) = table();
        let mut index = HeaderIndex::new();

        let updates = vec![Fields::new().with("Fare", 1.0); 3];
        let err = set_values_by_header_names(&mut wb, &mut index, &updates, &data_rows(&range), WriteOptions::default())
            .unwrap_err();

        assert_eq!(
            err,
            TableError::RowCountMismatch {
                range: "A2:D6".to_string(),
                expected: 5,
                actual: 3
            }
        );
        assert!(wb.take_write_log().is_empty());
    }

    #[test]
    fn test_empty_and_unmatched_updates() {
        let (mut wb, _, range) = table();
        let mut index = HeaderIndex::new();
        let rows = data_rows(&range);

        let empty = vec![Fields::new(); 5];
        assert_eq!(
            set_values_by_header_names(&mut wb, &mut index, &empty, &rows, WriteOptions::default()).unwrap(),
            WriteOutcome::NothingToWrite
        );

        let mut unknown = vec![Fields::new(); 5];
        unknown[0] = Fields::new().with("Vehicle", "van");
        assert_eq!(
            set_values_by_header_names(&mut wb, &mut index, &unknown, &rows, WriteOptions::default()).unwrap(),
            WriteOutcome::NoMatchingHeaders(vec!["Vehicle".to_string()])
        );
        assert!(wb.take_write_log().is_empty());
    }

    #[test]
    fn test_headers_outside_range_do_not_match() {
        let (mut wb, sheet, _) = table();
        let mut index = HeaderIndex::new();
        let narrow = GridRange::new(sheet, 2, 1, 1, 2);

        let outcome = set_values_by_header_names(
            &mut wb,
            &mut index,
            &[Fields::new().with("Notes", "x")],
            &narrow,
            WriteOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, WriteOutcome::NoMatchingHeaders(_)));
    }

    #[test]
    fn test_overwrite_all_blanks_unnamed_fields() {
        let (mut wb, sheet, range) = table();
        let mut index = HeaderIndex::new();
        let row = GridRange::new(sheet, 3, 1, 1, 4);

        let outcome = set_values_by_header_names(
            &mut wb,
            &mut index,
            &[Fields::new().with("Driver", "Ann")],
            &row,
            WriteOptions {
                overwrite_all: true,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Written(row));
        assert_eq!(
            wb.values(&row).unwrap(),
            vec![vec![CellValue::Empty, text("Ann"), CellValue::Empty, CellValue::Empty]]
        );
        assert_eq!(wb.values(&range).unwrap()[1][0], text("r0c0"));
    }

    #[test]
    fn test_formulas_inside_block_survive() {
        let (mut wb, sheet, range) = table();
        let mut index = HeaderIndex::new();
        let formula = CellContent::formula("=LEN(B3)", CellValue::Number(4.0));
        wb.set_contents(&GridRange::cell(sheet, 3, 3), &[vec![formula.clone()]]).unwrap();

        let mut updates = vec![Fields::new(); 5];
        updates[1] = Fields::new().with("Driver", "Ann").with("Notes", "n");
        set_values_by_header_names(&mut wb, &mut index, &updates, &data_rows(&range), WriteOptions::default())
            .unwrap();

        assert_eq!(wb.contents(&GridRange::cell(sheet, 3, 3)).unwrap()[0][0], formula);
    }

    #[test]
    fn test_read_write_round_trip() {
        let (mut wb, _, range) = table();
        let mut index = HeaderIndex::new();
        let before = wb.values(&range).unwrap();

        let records = range_to_records(&wb, &mut index, &range, ReadOptions::default()).unwrap();
        let updates: Vec<Fields> = records.into_iter().map(Fields::from).collect();
        set_values_by_header_names(&mut wb, &mut index, &updates, &range, WriteOptions::default()).unwrap();

        assert_eq!(wb.values(&range).unwrap(), before);
    }

    #[test]
    fn test_round_trip_keeps_blank_headed_columns() {
        let mut wb = Workbook::empty("Test");
        let sheet = wb.add_sheet_with_size("Trips", 10, 4).unwrap();
        let range = GridRange::new(sheet, 1, 1, 3, 4);
        wb.set_values(
            &range,
            &[
                vec![CellValue::Empty, text("Driver"), CellValue::Empty, text("Fare")],
                vec![text("x"), text("Ann"), text("y"), CellValue::Number(3.0)],
                vec![text("p"), text("Bob"), text("q"), CellValue::Number(4.0)],
            ],
        )
        .unwrap();
        let before = wb.values(&range).unwrap();
        let mut index = HeaderIndex::new();

        let records = range_to_records(&wb, &mut index, &range, ReadOptions::default()).unwrap();
        let updates: Vec<Fields> = records.into_iter().map(Fields::from).collect();
        let outcome =
            set_values_by_header_names(&mut wb, &mut index, &updates, &range, WriteOptions::default()).unwrap();

        // The written block starts at the first labelled column
        assert_eq!(outcome, WriteOutcome::Written(GridRange::new(sheet, 2, 2, 2, 3)));
        assert_eq!(wb.values(&range).unwrap(), before);
    }

    #[test]
    fn test_placeholder_key_alone_matches_nothing() {
        let mut wb = Workbook::empty("Test");
        let sheet = wb.add_sheet_with_size("Trips", 10, 2).unwrap();
        wb.set_values(&GridRange::new(sheet, 1, 1, 1, 2), &[vec![text("Id"), CellValue::Empty]])
            .unwrap();
        let mut index = HeaderIndex::new();

        let outcome = set_values_by_header_names(
            &mut wb,
            &mut index,
            &[Fields::new().with(" ", "stray")],
            &GridRange::new(sheet, 2, 1, 1, 2),
            WriteOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome, WriteOutcome::NoMatchingHeaders(Vec::new()));
        assert_eq!(wb.values(&GridRange::cell(sheet, 2, 2)).unwrap()[0][0], CellValue::Empty);
    }
}
