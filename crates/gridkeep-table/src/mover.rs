//! Moving records between sheets.
//!
//! Destination columns are created on demand so that every labelled source
//! column has a home. Headers starting with `_` are private to their sheet and
//! are never replicated. Trailing unlabelled columns of the source are not part
//! of its table.

use gridkeep_core::{CellValue, GridRange, GridStore, SheetId};

use crate::error::{TableError, TableResult};
use crate::header::{is_blank_header, labelled_width, HeaderIndex};
use crate::record::Fields;
use crate::table::{range_to_records, ReadOptions};

/// Prefix of headers that stay on their own sheet
pub const PRIVATE_HEADER_PREFIX: char = '_';

/// Append `fields` to `dest`, first creating any labelled `source` column the
/// destination lacks. Returns the row position written.
///
/// A blank source header fails the whole call before the destination is touched.
/// Blank headers after the last labelled source column are deliberately
/// exempt from that check: those columns are outside the table, so their
/// values are dropped rather than moved. Blank-headed destination columns are
/// always left empty.
pub fn append_data_row<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    source: SheetId,
    dest: SheetId,
    fields: &Fields,
) -> TableResult<u32> {
    let mut source_headers = index.headers(store, source)?;
    source_headers.truncate(labelled_width(&source_headers));

    if let Some(blank) = source_headers.iter().position(|h| is_blank_header(h)) {
        let sheet = store.sheet_name(source)?;
        tracing::warn!(
            "Empty column heading in column {} of '{}', move cancelled",
            blank + 1,
            sheet
        );
        return Err(TableError::BlankSourceHeader {
            sheet,
            column: blank as u32 + 1,
        });
    }

    let dest_original = index.headers(store, dest)?;
    let mut dest_current = dest_original.clone();

    for (i, name) in source_headers.iter().enumerate() {
        if dest_original.contains(name) || name.starts_with(PRIVATE_HEADER_PREFIX) {
            continue;
        }

        let position = i
            .checked_sub(1)
            .and_then(|prev| dest_current.iter().position(|h| *h == source_headers[prev]))
            .map_or(1, |after| after as u32 + 2);
        let source_column = i as u32 + 1;
        dest_current = insert_column_like(store, index, (source, source_column), dest, position, name)?;
    }

    let row = store.append_row(dest, &fields.row_for(&dest_current))?;
    tracing::debug!("Appended row {} to sheet {}", row, dest);
    Ok(row)
}

/// Insert a column labelled `name` at `position` of `dest`, carrying over the
/// formatting and data validation of the source column's first data cell.
/// Returns the fresh header row of `dest`.
pub fn insert_column_like<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    (source, source_column): (SheetId, u32),
    dest: SheetId,
    position: u32,
    name: &str,
) -> TableResult<Vec<String>> {
    store.insert_columns(dest, position, 1)?;
    index.invalidate(dest);
    store.set_values(&GridRange::cell(dest, 1, position), &[vec![CellValue::from(name)]])?;

    if let Some(dest_data) = store.column_data_range(dest, position)? {
        if store.max_rows(source)? >= 2 {
            let template = GridRange::cell(source, 2, source_column);
            store.copy_format_to_range(&template, &dest_data)?;
            let rule = store.data_validations(&template)?.into_iter().flatten().next().flatten();
            store.set_data_validation(&dest_data, rule.as_ref())?;
        }
    }

    tracing::info!("Inserted column '{}' at position {} of sheet {}", name, position, dest);
    Ok(index.refresh(store, dest)?)
}

/// Insert a column labelled `name` at `position` of `sheet`. Returns the fresh header row.
pub fn insert_header_column<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    sheet: SheetId,
    position: u32,
    name: &str,
) -> TableResult<Vec<String>> {
    store.insert_columns(sheet, position, 1)?;
    index.invalidate(sheet);
    store.set_values(&GridRange::cell(sheet, 1, position), &[vec![CellValue::from(name)]])?;
    Ok(index.refresh(store, sheet)?)
}

/// Move the first record of `source_range` to `dest`, overlaid with `extra`.
///
/// Formula cells are not carried over. Returns the source row position that
/// was moved, or `None` when the range holds no data row.
pub fn move_row<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    source_range: &GridRange,
    dest: SheetId,
    extra: &Fields,
) -> TableResult<Option<u32>> {
    let source = source_range.sheet;
    let records = range_to_records(store, index, source_range, ReadOptions::without_formulas())?;
    let Some(record) = records.into_iter().next() else {
        return Ok(None);
    };

    let mut fields = record.fields;
    fields.extend_from(extra);
    let last_row = store.last_row(source)?;

    append_data_row(store, index, source, dest, &fields)?;
    keep_spare_row(store, source, last_row)?;
    store.delete_rows(source, record.row_position, 1)?;
    Ok(Some(record.row_position))
}

/// Move every record of `source` accepted by `filter` to `dest`.
///
/// Source rows are deleted only once every append succeeded, bottom row first.
/// Returns the moved source row positions in sheet order.
pub fn move_rows<S, F>(
    store: &mut S,
    index: &mut HeaderIndex,
    source: SheetId,
    dest: SheetId,
    filter: F,
) -> TableResult<Vec<u32>>
where
    S: GridStore + ?Sized,
    F: Fn(&Fields) -> bool,
{
    let data = store.data_range(source)?;
    let records = range_to_records(store, index, &data, ReadOptions::without_formulas())?;
    let to_move: Vec<_> = records.into_iter().filter(|r| filter(&r.fields)).collect();
    let last_row = store.last_row(source)?;

    for record in &to_move {
        append_data_row(store, index, source, dest, &record.fields)?;
    }
    if to_move.is_empty() {
        return Ok(Vec::new());
    }

    keep_spare_row(store, source, last_row)?;
    let mut positions: Vec<u32> = to_move.iter().map(|r| r.row_position).collect();
    positions.sort_unstable_by(|a, b| b.cmp(a));
    for position in &positions {
        store.delete_rows(source, *position, 1)?;
    }
    positions.reverse();

    tracing::info!("Moved {} rows from sheet {} to sheet {}", positions.len(), source, dest);
    Ok(positions)
}

/// Append `fields` to `sheet`, first creating a column after the last labelled
/// one for every field the sheet has no header for. Returns the row position written.
pub fn create_row<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    sheet: SheetId,
    fields: &Fields,
) -> TableResult<u32> {
    let mut headers = index.headers(store, sheet)?;
    for name in fields.headers() {
        if !is_blank_header(name) && !headers.iter().any(|h| h == name) {
            let position = labelled_width(&headers) as u32 + 1;
            headers = insert_header_column(store, index, sheet, position, name)?;
        }
    }

    Ok(store.append_row(sheet, &fields.row_for(&headers))?)
}

/// Insert a blank row after the data when the sheet has none to spare, so
/// deleting data rows never leaves the sheet without a row below its header.
fn keep_spare_row<S: GridStore + ?Sized>(store: &mut S, sheet: SheetId, last_row: u32) -> TableResult<()> {
    if store.max_rows(sheet)? == last_row {
        store.insert_rows(sheet, last_row + 1, 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkeep_core::{DataValidationRule, ValidationCriteria, Workbook};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn sheet_with(wb: &mut Workbook, name: &str, rows: u32, data: Vec<Vec<CellValue>>) -> SheetId {
        let columns = data[0].len() as u32;
        let sheet = wb.add_sheet_with_size(name, rows, columns).unwrap();
        wb.set_values(&GridRange::new(sheet, 1, 1, data.len() as u32, columns), &data)
            .unwrap();
        sheet
    }

    #[test]
    fn test_move_subset_into_wider_sheet() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(
            &mut wb,
            "Trips",
            10,
            vec![
                vec![text("Date"), text("Driver")],
                vec![text("Mon"), text("Ann")],
                vec![text("Tue"), text("Bob")],
            ],
        );
        let dest = sheet_with(
            &mut wb,
            "Review",
            10,
            vec![
                vec![text("Date"), text("Driver"), text("Outcome")],
                vec![text("Sun"), text("Cy"), text("ok")],
            ],
        );
        let mut index = HeaderIndex::new();

        let moved = move_row(&mut wb, &mut index, &GridRange::new(source, 2, 1, 1, 2), dest, &Fields::new())
            .unwrap();

        assert_eq!(moved, Some(2));
        assert_eq!(wb.max_columns(dest).unwrap(), 3);
        assert_eq!(
            wb.values(&GridRange::new(dest, 3, 1, 1, 3)).unwrap(),
            vec![vec![text("Mon"), text("Ann"), CellValue::Empty]]
        );
        assert_eq!(wb.last_row(dest).unwrap(), 3);
        assert_eq!(
            wb.values(&GridRange::new(source, 2, 1, 1, 2)).unwrap(),
            vec![vec![text("Tue"), text("Bob")]]
        );
    }

    #[test]
    fn test_blank_source_header_aborts_before_mutation() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(
            &mut wb,
            "Trips",
            10,
            vec![
                vec![text("Date"), CellValue::Empty, text("Fare")],
                vec![text("Mon"), text("x"), CellValue::Number(3.0)],
            ],
        );
        let dest = sheet_with(&mut wb, "Review", 10, vec![vec![text("Date")]]);
        let mut index = HeaderIndex::new();
        let dest_before = wb.values(&GridRange::new(dest, 1, 1, 10, 1)).unwrap();

        let err = move_row(&mut wb, &mut index, &GridRange::new(source, 2, 1, 1, 3), dest, &Fields::new())
            .unwrap_err();

        assert_eq!(
            err,
            TableError::BlankSourceHeader {
                sheet: "Trips".to_string(),
                column: 2
            }
        );
        assert_eq!(wb.max_columns(dest).unwrap(), 1);
        assert_eq!(wb.values(&GridRange::new(dest, 1, 1, 10, 1)).unwrap(), dest_before);
        assert_eq!(wb.last_row(source).unwrap(), 2);
    }

    #[test]
    fn test_unlabelled_columns_stay_empty_in_destination() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(
            &mut wb,
            "Trips",
            10,
            vec![
                vec![text("Id"), text("Driver"), CellValue::Empty],
                vec![text("a"), text("Ann"), text("scratch")],
            ],
        );
        let dest = wb.add_sheet_with_size("Archive", 10, 5).unwrap();
        wb.set_values(&GridRange::new(dest, 1, 1, 1, 2), &[vec![text("Id"), text("Driver")]])
            .unwrap();
        let mut index = HeaderIndex::new();

        let moved = move_row(&mut wb, &mut index, &GridRange::new(source, 2, 1, 1, 3), dest, &Fields::new())
            .unwrap();

        // The trailing unlabelled source value is dropped, not moved
        assert_eq!(moved, Some(2));
        assert_eq!(wb.max_columns(dest).unwrap(), 5);
        assert_eq!(
            wb.values(&GridRange::new(dest, 2, 1, 1, 5)).unwrap(),
            vec![vec![
                text("a"),
                text("Ann"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty
            ]]
        );
        assert_eq!(wb.last_row(source).unwrap(), 1);
    }

    #[test]
    fn test_missing_columns_inserted_after_previous_source_column() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(
            &mut wb,
            "Trips",
            10,
            vec![
                vec![text("Date"), text("Fare"), text("Driver"), text("_note")],
                vec![text("Mon"), CellValue::Number(12.0), text("Ann"), text("private")],
            ],
        );
        let dest = sheet_with(
            &mut wb,
            "Review",
            10,
            vec![vec![text("Date"), text("Outcome")]],
        );
        let rule = DataValidationRule::new(ValidationCriteria::Checkbox);
        wb.set_number_format(&GridRange::cell(source, 2, 2), "0.00").unwrap();
        wb.set_data_validation(&GridRange::cell(source, 2, 2), Some(&rule)).unwrap();
        wb.sheet_mut(source).unwrap().update_cell(2, 2, |cell| {
            cell.format.style.insert("fontWeight".to_string(), "bold".to_string());
        });
        let mut index = HeaderIndex::new();

        let fields = Fields::new().with("Date", "Mon").with("Fare", 12.0).with("Driver", "Ann");
        let row = append_data_row(&mut wb, &mut index, source, dest, &fields).unwrap();

        // Fare lands after Date, Driver after Fare; _note stays behind
        assert_eq!(
            index.headers(&wb, dest).unwrap(),
            vec!["Date", "Fare", "Driver", "Outcome"]
        );
        assert_eq!(row, 2);
        assert_eq!(
            wb.values(&GridRange::new(dest, 2, 1, 1, 4)).unwrap(),
            vec![vec![text("Mon"), CellValue::Number(12.0), text("Ann"), CellValue::Empty]]
        );
        assert_eq!(
            wb.number_formats(&GridRange::cell(dest, 10, 2)).unwrap()[0][0].as_deref(),
            Some("0.00")
        );
        let copied = &wb.sheet(dest).unwrap().cell(10, 2).unwrap().format;
        assert_eq!(copied.style.get("fontWeight").map(String::as_str), Some("bold"));
        assert_eq!(wb.data_validations(&GridRange::cell(dest, 7, 2)).unwrap()[0][0], Some(rule));
        assert_eq!(wb.data_validations(&GridRange::cell(dest, 7, 3)).unwrap()[0][0], None);
    }

    #[test]
    fn test_move_rows_deletes_bottom_up() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(
            &mut wb,
            "Trips",
            4,
            vec![
                vec![text("Id"), text("Done")],
                vec![text("a"), CellValue::Boolean(true)],
                vec![text("b"), CellValue::Boolean(false)],
                vec![text("c"), CellValue::Boolean(true)],
            ],
        );
        let dest = sheet_with(&mut wb, "Archive", 10, vec![vec![text("Id"), text("Done")]]);
        let mut index = HeaderIndex::new();

        let moved = move_rows(&mut wb, &mut index, source, dest, |f| {
            f.get("Done") == Some(&CellValue::Boolean(true))
        })
        .unwrap();

        assert_eq!(moved, vec![2, 4]);
        assert_eq!(
            wb.values(&GridRange::new(dest, 2, 1, 2, 1)).unwrap(),
            vec![vec![text("a")], vec![text("c")]]
        );
        assert_eq!(wb.values(&GridRange::new(source, 1, 1, 3, 1)).unwrap()[1][0], text("b"));
        // The sheet was full, so a spare row was added before deleting
        assert_eq!(wb.max_rows(source).unwrap(), 3);
        assert_eq!(wb.last_row(source).unwrap(), 2);
    }

    #[test]
    fn test_move_rows_without_matches_is_noop() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(&mut wb, "Trips", 5, vec![vec![text("Id")], vec![text("a")]]);
        let dest = sheet_with(&mut wb, "Archive", 5, vec![vec![text("Id")]]);
        let mut index = HeaderIndex::new();

        assert!(move_rows(&mut wb, &mut index, source, dest, |_| false).unwrap().is_empty());
        assert_eq!(wb.last_row(source).unwrap(), 2);
        assert_eq!(wb.max_rows(source).unwrap(), 5);
    }

    #[test]
    fn test_move_row_with_extra_fields() {
        let mut wb = Workbook::empty("Test");
        let source = sheet_with(&mut wb, "Trips", 5, vec![vec![text("Id")], vec![text("a")]]);
        let dest = sheet_with(&mut wb, "Archive", 5, vec![vec![text("Id"), text("Reason")]]);
        let mut index = HeaderIndex::new();

        move_row(
            &mut wb,
            &mut index,
            &GridRange::new(source, 2, 1, 1, 1),
            dest,
            &Fields::new().with("Reason", "cancelled"),
        )
        .unwrap();

        assert_eq!(
            wb.values(&GridRange::new(dest, 2, 1, 1, 2)).unwrap(),
            vec![vec![text("a"), text("cancelled")]]
        );
        assert_eq!(wb.last_row(source).unwrap(), 1);
    }

    #[test]
    fn test_create_row_adds_unknown_columns() {
        let mut wb = Workbook::empty("Test");
        let sheet = wb.add_sheet_with_size("Trips", 10, 5).unwrap();
        wb.set_values(&GridRange::new(sheet, 1, 1, 1, 2), &[vec![text("Date"), text("Driver")]])
            .unwrap();
        let mut index = HeaderIndex::new();

        let row = create_row(
            &mut wb,
            &mut index,
            sheet,
            &Fields::new().with("Driver", "Ann").with(" ", "stray").with("Vehicle", "van"),
        )
        .unwrap();

        assert_eq!(row, 2);
        assert_eq!(&index.headers(&wb, sheet).unwrap()[..3], &["Date", "Driver", "Vehicle"]);
        assert_eq!(index.headers(&wb, sheet).unwrap()[3], " ");
        assert_eq!(
            wb.values(&GridRange::new(sheet, 2, 1, 1, 5)).unwrap(),
            vec![vec![
                CellValue::Empty,
                text("Ann"),
                text("van"),
                CellValue::Empty,
                CellValue::Empty
            ]]
        );
    }
}
