use gridkeep_core::{column_position, GridRange, GridStore};
use gridkeep_table::HeaderIndex;

use crate::config::{NamedRangeEntry, SchemaConfig};
use crate::error::{SchemaError, SchemaResult};
use crate::registry::locate_sheet;
use crate::report::{BatchReport, ItemStatus};

/// Rows a named range reaches past the end of its sheet, so appended rows stay covered
pub const NAMED_RANGE_OVERHANG: u32 = 1000;

/// The range `entry` should currently cover: its whole column from row 1 to
/// `max_rows + NAMED_RANGE_OVERHANG`
pub fn expected_range<S: GridStore + ?Sized>(
    store: &S,
    index: &mut HeaderIndex,
    name: &str,
    entry: &NamedRangeEntry,
) -> SchemaResult<GridRange> {
    let sheet = locate_sheet(store, &entry.sheet_name)
        .ok_or_else(|| SchemaError::SheetNotFound(entry.sheet_name.clone()))?;

    let by_header = match &entry.header_name {
        Some(header) => index.position(store, sheet, header)?,
        None => None,
    };
    let column = by_header
        .or_else(|| entry.column.as_deref().and_then(column_position))
        .ok_or_else(|| SchemaError::UnresolvedColumn(name.to_string()))?;

    let rows = store.max_rows(sheet)? + NAMED_RANGE_OVERHANG;
    Ok(GridRange::new(sheet, 1, column, rows, 1))
}

fn is_stale<S: GridStore + ?Sized>(store: &S, existing: &GridRange, expected: &GridRange) -> SchemaResult<bool> {
    Ok(existing.sheet != expected.sheet
        || existing.row != 1
        || existing.num_columns != 1
        || existing.last_row() != store.max_rows(existing.sheet)? + NAMED_RANGE_OVERHANG)
}

fn build_one<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    name: &str,
    entry: &NamedRangeEntry,
) -> SchemaResult<ItemStatus> {
    let expected = expected_range(store, index, name, entry)?;

    if let Some(existing) = store.range_by_name(name) {
        if !is_stale(store, &existing, &expected)? {
            return Ok(ItemStatus::Unchanged);
        }
    }

    store.set_named_range(name, expected)?;
    tracing::info!(
        "Named range '{}' set to {}!{}",
        name,
        store.sheet_name(expected.sheet)?,
        expected
    );
    Ok(ItemStatus::Changed)
}

/// Create every configured named range that is missing and rebuild the ones
/// that no longer span their sheet. Ranges absent from `config` are left alone.
pub fn build_named_ranges<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    config: &SchemaConfig,
) -> BatchReport {
    let mut report = BatchReport::new();
    for (name, entry) in &config.named_ranges {
        let result = build_one(store, index, name, entry);
        report.record(name.clone(), result);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkeep_core::{CellValue, SheetId, Workbook};
    use pretty_assertions::assert_eq;

    fn config(entries: &[(&str, NamedRangeEntry)]) -> SchemaConfig {
        SchemaConfig {
            named_ranges: entries
                .iter()
                .map(|(name, entry)| (name.to_string(), entry.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn entry(column: Option<&str>, header: Option<&str>) -> NamedRangeEntry {
        NamedRangeEntry {
            sheet_name: "Drivers".into(),
            column: column.map(String::from),
            header_name: header.map(String::from),
        }
    }

    fn drivers(rows: u32) -> (Workbook, SheetId) {
        let mut wb = Workbook::empty("Fleet");
        let sheet = wb.add_sheet_with_size("Drivers", rows, 3).unwrap();
        let mut values = vec![vec!["Id".into(), "Phone".into(), "Name".into()]];
        for i in 1..rows {
            values.push(vec![CellValue::Number(i as f64), "555".into(), format!("Driver {}", i).into()]);
        }
        wb.set_values(&GridRange::new(sheet, 1, 1, rows, 3), &values).unwrap();
        (wb, sheet)
    }

    #[test]
    fn test_build_grows_with_sheet() {
        let (mut wb, sheet) = drivers(50);
        let config = config(&[("lookupDrivers", entry(None, Some("Name")))]);
        let mut index = HeaderIndex::new();

        let report = build_named_ranges(&mut wb, &mut index, &config);
        assert_eq!(report.changed_count(), 1);
        assert_eq!(wb.range_by_name("lookupDrivers"), Some(GridRange::new(sheet, 1, 3, 1050, 1)));

        let rerun = build_named_ranges(&mut wb, &mut index, &config);
        assert_eq!(rerun.changed_count(), 0);
        assert!(rerun.is_success());

        for i in 50..60 {
            wb.append_row(sheet, &[CellValue::Number(i as f64), "555".into(), "New".into()])
                .unwrap();
        }
        assert_eq!(wb.max_rows(sheet).unwrap(), 60);

        let grown = build_named_ranges(&mut wb, &mut index, &config);
        assert_eq!(grown.changed_count(), 1);
        let range = wb.range_by_name("lookupDrivers").unwrap();
        assert_eq!((range.row, range.last_row(), range.column), (1, 1060, 3));
    }

    #[test]
    fn test_header_wins_over_column_letters() {
        let (mut wb, sheet) = drivers(5);
        let config = config(&[
            ("lookupDrivers", entry(Some("A"), Some("Name"))),
            ("lookupPhones", entry(Some("B"), Some("Mobile"))),
        ]);

        build_named_ranges(&mut wb, &mut HeaderIndex::new(), &config);
        assert_eq!(wb.range_by_name("lookupDrivers").map(|r| r.column), Some(3));
        // Header not found, so the letters are used
        assert_eq!(wb.range_by_name("lookupPhones"), Some(GridRange::new(sheet, 1, 2, 1005, 1)));
    }

    #[test]
    fn test_failures_and_unconfigured_ranges() {
        let (mut wb, sheet) = drivers(5);
        wb.set_named_range("manual", GridRange::new(sheet, 2, 1, 3, 1)).unwrap();
        let mut missing_sheet = entry(Some("A"), None);
        missing_sheet.sheet_name = "Vehicles".into();
        let config = config(&[
            ("lookupDrivers", entry(None, Some("Name"))),
            ("lookupMissing", entry(None, Some("Licence"))),
            ("lookupVehicles", missing_sheet),
        ]);

        let report = build_named_ranges(&mut wb, &mut HeaderIndex::new(), &config);
        assert_eq!(report.changed_count(), 1);
        assert_eq!(report.failure_count(), 2);
        assert!(report
            .failures()
            .any(|(name, e)| name == "lookupMissing" && matches!(e, SchemaError::UnresolvedColumn(_))));
        assert_eq!(wb.range_by_name("manual"), Some(GridRange::new(sheet, 2, 1, 3, 1)));
    }

    #[test]
    fn test_stale_range_is_rebuilt() {
        let (mut wb, sheet) = drivers(5);
        wb.set_named_range("lookupDrivers", GridRange::new(sheet, 2, 3, 4, 1)).unwrap();

        let config = config(&[("lookupDrivers", entry(None, Some("Name")))]);
        let report = build_named_ranges(&mut wb, &mut HeaderIndex::new(), &config);
        assert_eq!(report.changed_count(), 1);
        assert_eq!(wb.range_by_name("lookupDrivers"), Some(GridRange::new(sheet, 1, 3, 1005, 1)));
    }
}
