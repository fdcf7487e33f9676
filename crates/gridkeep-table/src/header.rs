//! Cached header rows.
//!
//! Lookups scan the cached header row positionally and the first match wins.
//! Anything in this crate that inserts or removes columns, or rewrites a header
//! row, invalidates the sheet's entry and hands back a fresh snapshot.

use std::collections::HashMap;

use gridkeep_core::{CellValue, GridRange, GridResult, GridStore, SheetId};

/// Placeholder for blank header cells, so every column stays addressable
pub const BLANK_HEADER: &str = " ";

pub const DEFAULT_HEADER_ROW: u32 = 1;

/// Header text for a raw header cell value
pub fn normalize_header(value: &CellValue) -> String {
    if value.is_empty() {
        BLANK_HEADER.to_string()
    } else {
        value.as_text()
    }
}

/// True for the placeholder and any other whitespace-only header
pub fn is_blank_header(header: &str) -> bool {
    header.trim().is_empty()
}

/// Number of leading columns up to the last non-blank header
pub fn labelled_width(headers: &[String]) -> usize {
    headers
        .iter()
        .rposition(|h| !is_blank_header(h))
        .map_or(0, |i| i + 1)
}

#[derive(Debug, Default)]
pub struct HeaderIndex {
    cache: HashMap<(SheetId, u32), Vec<String>>,
}

impl HeaderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header names of row 1
    pub fn headers<S: GridStore + ?Sized>(&mut self, store: &S, sheet: SheetId) -> GridResult<Vec<String>> {
        self.headers_at(store, sheet, DEFAULT_HEADER_ROW, false)
    }

    /// Re-read row 1 and replace the cached entry
    pub fn refresh<S: GridStore + ?Sized>(&mut self, store: &S, sheet: SheetId) -> GridResult<Vec<String>> {
        self.headers_at(store, sheet, DEFAULT_HEADER_ROW, true)
    }

    /// Header names of `header_row`, spanning every column of the sheet
    pub fn headers_at<S: GridStore + ?Sized>(
        &mut self,
        store: &S,
        sheet: SheetId,
        header_row: u32,
        force_refresh: bool,
    ) -> GridResult<Vec<String>> {
        let key = (sheet, header_row);
        if !force_refresh {
            if let Some(headers) = self.cache.get(&key) {
                return Ok(headers.clone());
            }
        }

        let columns = store.max_columns(sheet)?;
        let row = store.values(&GridRange::new(sheet, header_row, 1, 1, columns))?;
        let headers: Vec<String> = row
            .first()
            .map(|values| values.iter().map(normalize_header).collect())
            .unwrap_or_default();

        self.cache.insert(key, headers.clone());
        Ok(headers)
    }

    /// Headers of the columns covered by `range`, sliced from the cached sheet headers
    pub fn range_headers<S: GridStore + ?Sized>(
        &mut self,
        store: &S,
        range: &GridRange,
        header_row: u32,
    ) -> GridResult<Vec<String>> {
        let headers = self.headers_at(store, range.sheet, header_row, false)?;
        let start = (range.column.saturating_sub(1) as usize).min(headers.len());
        let end = (start + range.num_columns as usize).min(headers.len());
        Ok(headers[start..end].to_vec())
    }

    /// 1-based position of the first column labelled `name`
    pub fn position<S: GridStore + ?Sized>(
        &mut self,
        store: &S,
        sheet: SheetId,
        name: &str,
    ) -> GridResult<Option<u32>> {
        let headers = self.headers(store, sheet)?;
        Ok(headers.iter().position(|h| h == name).map(|i| i as u32 + 1))
    }

    /// Drop every cached header row of `sheet`
    pub fn invalidate(&mut self, sheet: SheetId) {
        self.cache.retain(|(cached, _), _| *cached != sheet);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
