//! Column and sheet tags as the source of truth for a workbook's schema.
//!
//! `build_metadata` seeds tags from what the workbook currently looks like;
//! every `fix_*` pass reads the tags back and pushes the grid towards them.

use std::collections::BTreeSet;

use gridkeep_core::{
    column_letters, CellContent, CellValue, GridRange, GridStore, MetadataEntry, MetadataQuery,
    MetadataTarget, MetadataVisibility, SheetId,
};
use gridkeep_table::{normalize_header, HeaderIndex, BLANK_HEADER, DEFAULT_HEADER_ROW};
use serde::Serialize;

use crate::config::{ColumnDescriptor, SchemaConfig};
use crate::error::{SchemaError, SchemaResult};
use crate::report::{BatchReport, ItemStatus};
use crate::rule::ValidationSpec;

pub const SHEET_NAME_KEY: &str = "sheetName";
pub const HEADER_NAME_KEY: &str = "headerName";
pub const NUMBER_FORMAT_KEY: &str = "numberFormat";
pub const DATA_VALIDATION_KEY: &str = "dataValidation";

/// Which sheets a repair pass touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Workbook,
    Sheet(SheetId),
}

impl Scope {
    fn query(&self, key: &str) -> MetadataQuery {
        let query = MetadataQuery::columns().key(key);
        match self {
            Scope::Workbook => query,
            Scope::Sheet(sheet) => query.in_sheet(*sheet),
        }
    }
}

/// Configured vs live columns of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetAssessment {
    pub sheet: String,
    pub found: bool,
    pub tagged: bool,
    /// Configured headers found in the header row
    pub present: Vec<String>,
    /// Configured headers missing from the header row
    pub missing: Vec<String>,
    /// Live headers with no configured column
    pub untracked: Vec<String>,
}

/// A `headerName` tag with the column it currently sits on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedHeader {
    pub sheet: String,
    pub header: String,
    pub column: u32,
    /// `Sheet!C:C`
    pub location: String,
}

/// Find a configured sheet by its `sheetName` tag, falling back to its live name
pub fn locate_sheet<S: GridStore + ?Sized>(store: &S, name: &str) -> Option<SheetId> {
    store
        .find_metadata(&MetadataQuery::sheets().key(SHEET_NAME_KEY))
        .into_iter()
        .find(|entry| entry.value == name)
        .map(|entry| entry.sheet)
        .or_else(|| store.sheet_by_name(name))
}

pub struct SchemaRegistry {
    config: SchemaConfig,
}

impl SchemaRegistry {
    pub fn new(config: SchemaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Tag every configured sheet and every configured column found in its
    /// header row. Sheets and columns that already carry tags are left alone,
    /// so running this twice adds nothing the second time.
    pub fn build_metadata<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        index: &mut HeaderIndex,
    ) -> BatchReport {
        let mut report = BatchReport::new();

        for descriptor in &self.config.sheets {
            let Some(sheet) = locate_sheet(store, &descriptor.name) else {
                report.record(
                    descriptor.name.clone(),
                    Err(SchemaError::SheetNotFound(descriptor.name.clone())),
                );
                continue;
            };

            report.record(
                descriptor.name.clone(),
                tag_sheet(store, sheet, &descriptor.name),
            );

            if !descriptor.has_headers {
                continue;
            }

            let headers = match index.headers(store, sheet) {
                Ok(headers) => headers,
                Err(e) => {
                    report.record(format!("{} headers", descriptor.name), Err(e.into()));
                    continue;
                }
            };

            for column in &descriptor.columns {
                let Some(i) = headers.iter().position(|h| *h == column.header_name) else {
                    tracing::debug!(
                        "{}: no column labelled '{}'",
                        descriptor.name,
                        column.header_name
                    );
                    continue;
                };
                let position = i as u32 + 1;
                report.record(
                    column_item(&descriptor.name, position, &column.header_name),
                    tag_column(store, sheet, position, column),
                );
            }
        }

        report
    }

    /// Drop every tag and derive them again from the current workbook
    pub fn rebuild_all_metadata<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        index: &mut HeaderIndex,
    ) -> BatchReport {
        let mut report = self.clear_metadata(store);
        index.clear();
        report.merge(self.build_metadata(store, index));
        report
    }

    pub fn clear_metadata<S: GridStore + ?Sized>(&self, store: &mut S) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in store.find_metadata(&MetadataQuery::new()) {
            let result = store
                .remove_metadata(entry.id)
                .map(|_| ItemStatus::Changed)
                .map_err(SchemaError::from);
            report.record(format!("{} tag #{}", entry.key, entry.id), result);
        }
        report
    }

    /// Rename every tagged sheet back to its tagged name
    pub fn fix_sheet_names<S: GridStore + ?Sized>(&self, store: &mut S) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in store.find_metadata(&MetadataQuery::sheets().key(SHEET_NAME_KEY)) {
            let result = fix_sheet_name(store, &entry);
            report.record(entry.value.clone(), result);
        }
        report
    }

    /// Apply each `numberFormat` tag to the data rows of its column
    pub fn fix_number_formatting<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        scope: Scope,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in store.find_metadata(&scope.query(NUMBER_FORMAT_KEY)) {
            let item = tag_item(store, &entry);
            let result = column_range(store, &entry)
                .and_then(|range| apply_number_format(store, range, &entry.value));
            report.record(item, result);
        }
        report
    }

    /// Apply each `dataValidation` tag to the data rows of its column
    pub fn fix_data_validation<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        scope: Scope,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in store.find_metadata(&scope.query(DATA_VALIDATION_KEY)) {
            let item = tag_item(store, &entry);
            let result = column_range(store, &entry)
                .and_then(|range| apply_data_validation(store, range, &entry));
            report.record(item, result);
        }
        report
    }

    /// Rewrite drifted header cells of the tagged columns covered by `range`.
    ///
    /// Only the span from the first to the last drifted column is written, in a
    /// single call; untagged columns inside that span keep their content.
    /// Returns the written range, or `None` when every header already matches.
    pub fn fix_header_names<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        index: &mut HeaderIndex,
        range: &GridRange,
    ) -> SchemaResult<Option<GridRange>> {
        let sheet = range.sheet;
        let max_columns = store.max_columns(sheet)?;
        let tags = store.find_metadata(
            &MetadataQuery::columns()
                .key(HEADER_NAME_KEY)
                .intersecting(*range),
        );

        let header_row = GridRange::new(sheet, DEFAULT_HEADER_ROW, 1, 1, max_columns);
        let current = store.contents(&header_row)?.into_iter().next().unwrap_or_default();

        let mut expected: Vec<Option<&str>> = vec![None; max_columns as usize];
        for tag in &tags {
            let slot = tag
                .column
                .and_then(|column| expected.get_mut(column as usize - 1));
            if let Some(slot) = slot.filter(|slot| slot.is_none()) {
                *slot = Some(tag.value.as_str());
            }
        }

        let drifted: Vec<usize> = expected
            .iter()
            .enumerate()
            .filter_map(|(i, want)| {
                let want = (*want)?;
                let have = current
                    .get(i)
                    .map(|content| normalize_header(content.computed_value()))
                    .unwrap_or_else(|| BLANK_HEADER.to_string());
                (have != want).then_some(i)
            })
            .collect();

        let (Some(&first), Some(&last)) = (drifted.first(), drifted.last()) else {
            return Ok(None);
        };

        let row: Vec<CellContent> = (first..=last)
            .map(|i| match expected[i] {
                Some(name) => CellContent::from(CellValue::from(name)),
                None => current.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        let target = GridRange::new(
            sheet,
            DEFAULT_HEADER_ROW,
            first as u32 + 1,
            1,
            (last - first) as u32 + 1,
        );
        store.set_contents(&target, &[row])?;
        index.invalidate(sheet);

        tracing::info!(
            "Restored {} header(s) of '{}' in {}",
            drifted.len(),
            store.sheet_name(sheet)?,
            target
        );
        Ok(Some(target))
    }

    /// Apply the sheet's column number formats to the first row of `row_range`.
    /// Only the row is taken from the range; every tagged column is fixed.
    pub fn fix_row_number_formatting<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        row_range: &GridRange,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in row_tags(store, row_range, NUMBER_FORMAT_KEY) {
            let item = tag_item(store, &entry);
            let result = row_cell(&entry, row_range)
                .and_then(|cell| apply_number_format(store, cell, &entry.value));
            report.record(item, result);
        }
        report
    }

    /// Apply the sheet's column validation rules to the first row of `row_range`
    pub fn fix_row_data_validation<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        row_range: &GridRange,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        for entry in row_tags(store, row_range, DATA_VALIDATION_KEY) {
            let item = tag_item(store, &entry);
            let result = row_cell(&entry, row_range)
                .and_then(|cell| apply_data_validation(store, cell, &entry));
            report.record(item, result);
        }
        report
    }

    /// Sheet names, then header names of every tagged sheet, then formats and
    /// validation rules across the workbook
    pub fn repair_sheets<S: GridStore + ?Sized>(
        &self,
        store: &mut S,
        index: &mut HeaderIndex,
    ) -> BatchReport {
        let mut report = self.fix_sheet_names(store);

        let sheets: BTreeSet<SheetId> = store
            .find_metadata(&MetadataQuery::columns().key(HEADER_NAME_KEY))
            .into_iter()
            .map(|entry| entry.sheet)
            .collect();

        for sheet in sheets {
            let item = format!(
                "{} headers",
                store.sheet_name(sheet).unwrap_or_else(|_| sheet.to_string())
            );
            let result = store
                .max_columns(sheet)
                .map_err(SchemaError::from)
                .and_then(|columns| {
                    let row = GridRange::new(sheet, DEFAULT_HEADER_ROW, 1, 1, columns);
                    self.fix_header_names(store, index, &row)
                })
                .map(|written| match written {
                    Some(_) => ItemStatus::Changed,
                    None => ItemStatus::Unchanged,
                });
            report.record(item, result);
        }

        report.merge(self.fix_number_formatting(store, Scope::Workbook));
        report.merge(self.fix_data_validation(store, Scope::Workbook));
        report
    }

    /// Compare each configured sheet with its live header row
    pub fn assess_metadata<S: GridStore + ?Sized>(
        &self,
        store: &S,
        index: &mut HeaderIndex,
    ) -> SchemaResult<Vec<SheetAssessment>> {
        let mut assessments = Vec::with_capacity(self.config.sheets.len());

        for descriptor in &self.config.sheets {
            let configured = descriptor.columns.iter().map(|c| c.header_name.clone());
            let Some(sheet) = locate_sheet(store, &descriptor.name) else {
                tracing::warn!("Sheet '{}' not found", descriptor.name);
                assessments.push(SheetAssessment {
                    sheet: descriptor.name.clone(),
                    found: false,
                    tagged: false,
                    present: Vec::new(),
                    missing: configured.collect(),
                    untracked: Vec::new(),
                });
                continue;
            };

            let tagged = !store
                .find_metadata(&MetadataQuery::sheets().key(SHEET_NAME_KEY).in_sheet(sheet))
                .is_empty();
            let headers = index.headers(store, sheet)?;

            let (present, missing): (Vec<String>, Vec<String>) =
                configured.partition(|name| headers.contains(name));
            let untracked: Vec<String> = headers
                .iter()
                .filter(|h| h.as_str() != BLANK_HEADER && descriptor.column(h).is_none())
                .cloned()
                .collect();

            tracing::info!(
                "{}: {} present, {} missing, {} untracked",
                descriptor.name,
                present.len(),
                missing.len(),
                untracked.len()
            );
            assessments.push(SheetAssessment {
                sheet: descriptor.name.clone(),
                found: true,
                tagged,
                present,
                missing,
                untracked,
            });
        }

        Ok(assessments)
    }

    /// Every `headerName` tag with its current column
    pub fn tagged_headers<S: GridStore + ?Sized>(&self, store: &S) -> SchemaResult<Vec<TaggedHeader>> {
        let mut tagged = Vec::new();
        for entry in store.find_metadata(&MetadataQuery::columns().key(HEADER_NAME_KEY)) {
            let Some(column) = entry.column else { continue };
            let sheet = store.sheet_name(entry.sheet)?;
            let letters = column_letters(column);
            tagged.push(TaggedHeader {
                location: format!("{}!{}:{}", sheet, letters, letters),
                sheet,
                header: entry.value,
                column,
            });
        }
        tagged.sort_by(|a, b| (&a.sheet, a.column).cmp(&(&b.sheet, b.column)));
        Ok(tagged)
    }
}

fn column_item(sheet: &str, column: u32, header: &str) -> String {
    format!("{}!{} ({})", sheet, column_letters(column), header)
}

fn tag_item<S: GridStore + ?Sized>(store: &S, entry: &MetadataEntry) -> String {
    let sheet = store
        .sheet_name(entry.sheet)
        .unwrap_or_else(|_| entry.sheet.to_string());
    let column = entry.column.map(column_letters).unwrap_or_default();
    format!("{}!{} {}", sheet, column, entry.key)
}

fn tag_sheet<S: GridStore + ?Sized>(
    store: &mut S,
    sheet: SheetId,
    name: &str,
) -> SchemaResult<ItemStatus> {
    let existing = store.find_metadata(&MetadataQuery::sheets().key(SHEET_NAME_KEY).in_sheet(sheet));
    if !existing.is_empty() {
        return Ok(ItemStatus::Unchanged);
    }
    store.add_metadata(
        MetadataTarget::Sheet(sheet),
        SHEET_NAME_KEY,
        name,
        MetadataVisibility::Document,
    )?;
    Ok(ItemStatus::Changed)
}

fn tag_column<S: GridStore + ?Sized>(
    store: &mut S,
    sheet: SheetId,
    position: u32,
    column: &ColumnDescriptor,
) -> SchemaResult<ItemStatus> {
    let at_column = GridRange::new(sheet, 1, position, 1, 1);
    if !store
        .find_metadata(&MetadataQuery::columns().intersecting(at_column))
        .is_empty()
    {
        return Ok(ItemStatus::Unchanged);
    }

    let target = MetadataTarget::Column { sheet, position };
    let visibility = MetadataVisibility::Document;
    store.add_metadata(target, HEADER_NAME_KEY, &column.header_name, visibility)?;
    if let Some(pattern) = &column.number_format {
        store.add_metadata(target, NUMBER_FORMAT_KEY, pattern, visibility)?;
    }
    if let Some(spec) = &column.data_validation {
        store.add_metadata(target, DATA_VALIDATION_KEY, &spec.to_json()?, visibility)?;
    }
    Ok(ItemStatus::Changed)
}

fn fix_sheet_name<S: GridStore + ?Sized>(
    store: &mut S,
    entry: &MetadataEntry,
) -> SchemaResult<ItemStatus> {
    let current = store.sheet_name(entry.sheet)?;
    if current == entry.value {
        return Ok(ItemStatus::Unchanged);
    }
    store.rename_sheet(entry.sheet, &entry.value)?;
    tracing::info!("Sheet Name '{}' updated to '{}'", current, entry.value);
    Ok(ItemStatus::Changed)
}

/// Data rows of a column tag's current column; `None` when the sheet has no data rows
fn column_range<S: GridStore + ?Sized>(
    store: &S,
    entry: &MetadataEntry,
) -> SchemaResult<Option<GridRange>> {
    let column = entry.column.ok_or_else(|| SchemaError::MalformedTag {
        id: entry.id,
        key: entry.key.clone(),
        reason: "not attached to a column".to_string(),
    })?;
    Ok(store.column_data_range(entry.sheet, column)?)
}

/// Every `key` column tag of the row's sheet, wherever the range sits in the row
fn row_tags<S: GridStore + ?Sized>(store: &S, row_range: &GridRange, key: &str) -> Vec<MetadataEntry> {
    store.find_metadata(&MetadataQuery::columns().key(key).in_sheet(row_range.sheet))
}

fn row_cell(entry: &MetadataEntry, row_range: &GridRange) -> SchemaResult<Option<GridRange>> {
    Ok(entry
        .column
        .map(|column| GridRange::new(row_range.sheet, row_range.row, column, 1, 1)))
}

fn apply_number_format<S: GridStore + ?Sized>(
    store: &mut S,
    range: Option<GridRange>,
    pattern: &str,
) -> SchemaResult<ItemStatus> {
    let Some(range) = range else {
        return Ok(ItemStatus::Unchanged);
    };
    let applied = store
        .number_formats(&range)?
        .iter()
        .flatten()
        .all(|format| format.as_deref() == Some(pattern));
    if applied {
        return Ok(ItemStatus::Unchanged);
    }
    store.set_number_format(&range, pattern)?;
    Ok(ItemStatus::Changed)
}

fn apply_data_validation<S: GridStore + ?Sized>(
    store: &mut S,
    range: Option<GridRange>,
    entry: &MetadataEntry,
) -> SchemaResult<ItemStatus> {
    let Some(range) = range else {
        return Ok(ItemStatus::Unchanged);
    };
    let spec = ValidationSpec::from_json(&entry.value).map_err(|e| SchemaError::MalformedTag {
        id: entry.id,
        key: entry.key.clone(),
        reason: e.to_string(),
    })?;
    let rule = spec.to_rule(store)?;

    let applied = store
        .data_validations(&range)?
        .iter()
        .flatten()
        .all(|existing| existing.as_ref() == Some(&rule));
    if applied {
        return Ok(ItemStatus::Unchanged);
    }
    store.set_data_validation(&range, Some(&rule))?;
    Ok(ItemStatus::Changed)
}
