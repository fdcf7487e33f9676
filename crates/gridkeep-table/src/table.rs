use gridkeep_core::{CellValue, GridRange, GridStore, SheetId};

use crate::error::TableResult;
use crate::header::{normalize_header, HeaderIndex, DEFAULT_HEADER_ROW};
use crate::record::{Fields, Record};

/// Options for [`range_to_records`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub header_row: u32,
    /// When false, cells holding a formula are left out of the record
    pub include_formulas: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            include_formulas: true,
        }
    }
}

impl ReadOptions {
    pub fn without_formulas() -> Self {
        Self {
            include_formulas: false,
            ..Self::default()
        }
    }
}

/// Read a range as header-keyed records.
///
/// If the range starts at or above the header row, the header row is taken from
/// the range itself and is not returned as a record. Otherwise headers come from
/// the index.
pub fn range_to_records<S: GridStore + ?Sized>(
    store: &S,
    index: &mut HeaderIndex,
    range: &GridRange,
    options: ReadOptions,
) -> TableResult<Vec<Record>> {
    let mut values = store.values(range)?;
    let mut formulas = if options.include_formulas {
        Vec::new()
    } else {
        store.formulas(range)?
    };

    let mut top_row = range.row;
    let headers = if range.row <= options.header_row {
        let header_offset = (options.header_row - range.row) as usize;
        if values.len() <= header_offset + 1 {
            return Ok(Vec::new());
        }
        let headers: Vec<String> = values[header_offset].iter().map(normalize_header).collect();
        values.drain(..=header_offset);
        if !formulas.is_empty() {
            formulas.drain(..=header_offset);
        }
        top_row = options.header_row + 1;
        headers
    } else {
        index.range_headers(store, range, options.header_row)?
    };

    let records = values
        .into_iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut fields = Fields::new();
            for (column, (header, value)) in headers.iter().zip(row).enumerate() {
                let is_formula = formulas
                    .get(row_index)
                    .and_then(|r| r.get(column))
                    .is_some_and(|f| !f.is_empty());
                if !is_formula {
                    fields.insert(header.clone(), value);
                }
            }
            Record {
                fields,
                row_position: top_row + row_index as u32,
                row_index,
            }
        })
        .collect();

    Ok(records)
}

/// Value at the intersection of `header`'s column and the first row of `range`.
///
/// `None` means the header is not among the range's columns, which is not the
/// same as an empty cell.
pub fn value_by_header_name<S: GridStore + ?Sized>(
    store: &S,
    index: &mut HeaderIndex,
    header: &str,
    range: &GridRange,
) -> TableResult<Option<CellValue>> {
    let Some(cell) = header_cell(store, index, header, range)? else {
        return Ok(None);
    };
    Ok(store.values(&cell)?.into_iter().flatten().next())
}

/// Display text at the intersection of `header`'s column and the first row of `range`
pub fn display_value_by_header_name<S: GridStore + ?Sized>(
    store: &S,
    index: &mut HeaderIndex,
    header: &str,
    range: &GridRange,
) -> TableResult<Option<String>> {
    let Some(cell) = header_cell(store, index, header, range)? else {
        return Ok(None);
    };
    Ok(store.display_values(&cell)?.into_iter().flatten().next())
}

fn header_cell<S: GridStore + ?Sized>(
    store: &S,
    index: &mut HeaderIndex,
    header: &str,
    range: &GridRange,
) -> TableResult<Option<GridRange>> {
    let headers = index.range_headers(store, range, DEFAULT_HEADER_ROW)?;
    Ok(headers
        .iter()
        .position(|h| h == header)
        .map(|offset| GridRange::cell(range.sheet, range.row, range.column + offset as u32)))
}

/// First record of the sheet's data range accepted by `filter`
pub fn find_first_row<S, F>(
    store: &S,
    index: &mut HeaderIndex,
    sheet: SheetId,
    filter: F,
) -> TableResult<Option<Record>>
where
    S: GridStore + ?Sized,
    F: Fn(&Record) -> bool,
{
    let range = store.data_range(sheet)?;
    let records = range_to_records(store, index, &range, ReadOptions::default())?;
    Ok(records.into_iter().find(|record| filter(record)))
}

/// Append one row per entry, laid out in the sheet's current header order.
/// Returns the row positions written.
pub fn append_values_by_header_names<S: GridStore + ?Sized>(
    store: &mut S,
    index: &mut HeaderIndex,
    sheet: SheetId,
    rows: &[Fields],
) -> TableResult<Vec<u32>> {
    let headers = index.headers(store, sheet)?;
    let mut written = Vec::with_capacity(rows.len());
    for fields in rows {
        written.push(store.append_row(sheet, &fields.row_for(&headers))?);
    }
    Ok(written)
}

/// Largest numeric value in the range, ignoring text and blanks
pub fn max_value_in_range<S: GridStore + ?Sized>(store: &S, range: &GridRange) -> TableResult<Option<f64>> {
    Ok(store
        .values(range)?
        .into_iter()
        .flatten()
        .filter_map(|v| match v {
            CellValue::Number(n) if n.is_finite() => Some(n),
            _ => None,
        })
        .reduce(f64::max))
}
