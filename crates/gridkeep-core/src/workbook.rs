use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellContent, CellValue};
use crate::error::GridError;
use crate::format::{display_text, CellFormat};
use crate::metadata::{
    DeveloperMetadata, MetadataEntry, MetadataId, MetadataLocation, MetadataQuery, MetadataTarget,
    MetadataVisibility,
};
use crate::range::{GridRange, SheetId};
use crate::sheet::Sheet;
use crate::store::{GridResult, GridStore, NamedRange};
use crate::validation::DataValidationRule;

/// An in-memory workbook: sheets, developer metadata and named ranges.
///
/// This is the reference [`GridStore`]. Structural edits keep the rest of the
/// workbook consistent: named ranges shift or shrink with inserted and deleted
/// rows and columns, column tags are dropped with their column, and sheet tags
/// with their sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    /// Workbook name (usually the file name)
    pub name: String,
    sheets: Vec<Sheet>,
    #[serde(default)]
    developer_metadata: Vec<DeveloperMetadata>,
    #[serde(default)]
    named_ranges: Vec<NamedRange>,
    #[serde(default)]
    next_sheet_id: u32,
    #[serde(default)]
    next_metadata_id: u32,
    /// Ranges of every value write since the last `take_write_log`
    #[serde(skip)]
    write_log: Vec<GridRange>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Workbook {
    /// Create a new workbook with a default sheet
    pub fn new(name: impl Into<String>) -> Self {
        let mut workbook = Self::empty(name);
        workbook.push_sheet(|id| Sheet::new(id, "Sheet1"));
        workbook
    }

    /// Create a workbook without any sheet
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
            developer_metadata: Vec::new(),
            named_ranges: Vec::new(),
            next_sheet_id: 1,
            next_metadata_id: 1,
            write_log: Vec::new(),
        }
    }

    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Add a sheet of the default size
    pub fn add_sheet(&mut self, name: impl Into<String>) -> GridResult<SheetId> {
        let name = name.into();
        self.check_new_name(&name, None)?;
        Ok(self.push_sheet(|id| Sheet::new(id, name)))
    }

    pub fn add_sheet_with_size(
        &mut self,
        name: impl Into<String>,
        rows: u32,
        columns: u32,
    ) -> GridResult<SheetId> {
        let name = name.into();
        self.check_new_name(&name, None)?;
        Ok(self.push_sheet(|id| Sheet::with_size(id, name, rows, columns)))
    }

    /// Remove a sheet together with its tags and named ranges
    pub fn remove_sheet(&mut self, id: SheetId) -> GridResult<Sheet> {
        if self.sheets.len() <= 1 {
            return Err(GridError::CannotDeleteLastSheet);
        }
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or(GridError::SheetNotFound(id))?;

        self.developer_metadata.retain(|md| md.location.sheet() != id);
        self.named_ranges.retain(|named| named.range.sheet != id);
        Ok(self.sheets.remove(index))
    }

    /// Copy a sheet under a fresh identity. Developer metadata is not copied.
    pub fn duplicate_sheet(&mut self, id: SheetId) -> GridResult<SheetId> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or(GridError::SheetNotFound(id))?;
        let mut copy = self.sheets[index].clone();

        let mut num = 2;
        copy.name = loop {
            let name = format!("{} ({})", self.sheets[index].name, num);
            if self.sheet_by_name(&name).is_none() {
                break name;
            }
            num += 1;
        };
        copy.id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        copy.reassign_column_ids();

        let new_id = copy.id;
        self.sheets.insert(index + 1, copy);
        Ok(new_id)
    }

    /// Drain the ranges written since the last call
    pub fn take_write_log(&mut self) -> Vec<GridRange> {
        std::mem::take(&mut self.write_log)
    }

    /// Serialize the workbook to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the workbook to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a workbook from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut workbook: Workbook = serde_json::from_str(json)?;
        let max_sheet = workbook.sheets.iter().map(|s| s.id.0).max().unwrap_or(0);
        let max_metadata = workbook.developer_metadata.iter().map(|md| md.id).max().unwrap_or(0);
        workbook.next_sheet_id = workbook.next_sheet_id.max(max_sheet + 1);
        workbook.next_metadata_id = workbook.next_metadata_id.max(max_metadata + 1);
        Ok(workbook)
    }

    fn push_sheet<F>(&mut self, make: F) -> SheetId
    where
        F: FnOnce(SheetId) -> Sheet,
    {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.push(make(id));
        id
    }

    fn check_new_name(&self, name: &str, renaming: Option<SheetId>) -> GridResult<()> {
        if name.trim().is_empty() {
            return Err(GridError::InvalidSheetName("Name cannot be empty".to_string()));
        }
        if self
            .sheets
            .iter()
            .any(|s| s.name == name && Some(s.id) != renaming)
        {
            return Err(GridError::SheetNameExists(name.to_string()));
        }
        Ok(())
    }

    fn require(&self, id: SheetId) -> GridResult<&Sheet> {
        self.sheet(id).ok_or(GridError::SheetNotFound(id))
    }

    fn require_mut(&mut self, id: SheetId) -> GridResult<&mut Sheet> {
        self.sheet_mut(id).ok_or(GridError::SheetNotFound(id))
    }

    /// Checked read of one property of every cell in `range`
    fn read_cells<T, F>(&self, range: &GridRange, read: F) -> GridResult<Vec<Vec<T>>>
    where
        F: Fn(Option<&Cell>) -> T,
    {
        let sheet = self.require(range.sheet)?;
        sheet.check_range(range)?;
        Ok((range.row..=range.last_row())
            .map(|row| {
                (range.column..=range.last_column())
                    .map(|column| read(sheet.cell(row, column)))
                    .collect()
            })
            .collect())
    }

    /// Checked update of every cell in `range`
    fn update_cells<F>(&mut self, range: &GridRange, mut update: F) -> GridResult<()>
    where
        F: FnMut(u32, u32, &mut Cell),
    {
        let sheet = self.require_mut(range.sheet)?;
        sheet.check_range(range)?;
        for row in range.row..=range.last_row() {
            for column in range.column..=range.last_column() {
                sheet.update_cell(row, column, |cell| update(row, column, cell));
            }
        }
        Ok(())
    }

    fn shift_named_ranges<F>(&mut self, sheet: SheetId, shift: F)
    where
        F: Fn(&GridRange) -> Option<GridRange>,
    {
        self.named_ranges.retain_mut(|named| {
            if named.range.sheet != sheet {
                return true;
            }
            match shift(&named.range) {
                Some(range) => {
                    named.range = range;
                    true
                }
                None => false,
            }
        });
    }

    fn entry(&self, md: &DeveloperMetadata) -> Option<MetadataEntry> {
        let column = match md.location {
            MetadataLocation::Sheet { .. } => None,
            MetadataLocation::Column { sheet, column } => {
                Some(self.sheet(sheet)?.column_position(column)?)
            }
        };
        Some(MetadataEntry {
            id: md.id,
            key: md.key.clone(),
            value: md.value.clone(),
            visibility: md.visibility,
            sheet: md.location.sheet(),
            column,
        })
    }
}

impl GridStore for Workbook {
    fn sheet_ids(&self) -> Vec<SheetId> {
        self.sheets.iter().map(|s| s.id).collect()
    }

    fn sheet_by_name(&self, name: &str) -> Option<SheetId> {
        self.sheets.iter().find(|s| s.name == name).map(|s| s.id)
    }

    fn sheet_name(&self, sheet: SheetId) -> GridResult<String> {
        Ok(self.require(sheet)?.name.clone())
    }

    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> GridResult<()> {
        self.check_new_name(name, Some(sheet))?;
        self.require_mut(sheet)?.name = name.to_string();
        Ok(())
    }

    fn max_rows(&self, sheet: SheetId) -> GridResult<u32> {
        Ok(self.require(sheet)?.max_rows())
    }

    fn max_columns(&self, sheet: SheetId) -> GridResult<u32> {
        Ok(self.require(sheet)?.max_columns())
    }

    fn last_row(&self, sheet: SheetId) -> GridResult<u32> {
        Ok(self.require(sheet)?.last_row())
    }

    fn last_column(&self, sheet: SheetId) -> GridResult<u32> {
        Ok(self.require(sheet)?.last_column())
    }

    fn contents(&self, range: &GridRange) -> GridResult<Vec<Vec<CellContent>>> {
        self.read_cells(range, |cell| cell.map(|c| c.content.clone()).unwrap_or_default())
    }

    fn set_contents(&mut self, range: &GridRange, contents: &[Vec<CellContent>]) -> GridResult<()> {
        let width = range.num_columns as usize;
        if contents.len() != range.num_rows as usize || contents.iter().any(|row| row.len() != width) {
            return Err(GridError::ShapeMismatch {
                range: range.a1_notation(),
                expected_rows: range.num_rows,
                expected_columns: range.num_columns,
                actual_rows: contents.len(),
                actual_columns: contents
                    .iter()
                    .map(Vec::len)
                    .find(|len| *len != width)
                    .unwrap_or(width),
            });
        }

        self.update_cells(range, |row, column, cell| {
            let content = &contents[(row - range.row) as usize][(column - range.column) as usize];
            cell.content = content.clone();
        })?;
        self.write_log.push(*range);
        Ok(())
    }

    fn display_values(&self, range: &GridRange) -> GridResult<Vec<Vec<String>>> {
        self.read_cells(range, |cell| match cell {
            Some(cell) => display_text(cell.computed_value(), cell.format.number_format.as_deref()),
            None => String::new(),
        })
    }

    fn number_formats(&self, range: &GridRange) -> GridResult<Vec<Vec<Option<String>>>> {
        self.read_cells(range, |cell| cell.and_then(|c| c.format.number_format.clone()))
    }

    fn set_number_format(&mut self, range: &GridRange, pattern: &str) -> GridResult<()> {
        let pattern = (!pattern.is_empty()).then(|| pattern.to_string());
        self.update_cells(range, |_, _, cell| cell.format.number_format = pattern.clone())
    }

    fn data_validations(&self, range: &GridRange) -> GridResult<Vec<Vec<Option<DataValidationRule>>>> {
        self.read_cells(range, |cell| cell.and_then(|c| c.validation.clone()))
    }

    fn set_data_validation(
        &mut self,
        range: &GridRange,
        rule: Option<&DataValidationRule>,
    ) -> GridResult<()> {
        self.update_cells(range, |_, _, cell| cell.validation = rule.cloned())
    }

    fn copy_format_to_range(&mut self, source: &GridRange, dest: &GridRange) -> GridResult<()> {
        let formats: Vec<Vec<CellFormat>> =
            self.read_cells(source, |cell| cell.map(|c| c.format.clone()).unwrap_or_default())?;

        self.update_cells(dest, |row, column, cell| {
            let r = ((row - dest.row) % source.num_rows) as usize;
            let c = ((column - dest.column) % source.num_columns) as usize;
            cell.format = formats[r][c].clone();
        })
    }

    fn insert_rows(&mut self, sheet: SheetId, before: u32, count: u32) -> GridResult<()> {
        self.require_mut(sheet)?.insert_rows(before, count)?;
        self.shift_named_ranges(sheet, |range| Some(range.with_rows_inserted(before, count)));
        Ok(())
    }

    fn delete_rows(&mut self, sheet: SheetId, start: u32, count: u32) -> GridResult<()> {
        self.require_mut(sheet)?.delete_rows(start, count)?;
        self.shift_named_ranges(sheet, |range| range.with_rows_deleted(start, count));
        Ok(())
    }

    fn insert_columns(&mut self, sheet: SheetId, before: u32, count: u32) -> GridResult<()> {
        self.require_mut(sheet)?.insert_columns(before, count)?;
        self.shift_named_ranges(sheet, |range| Some(range.with_columns_inserted(before, count)));
        Ok(())
    }

    fn delete_columns(&mut self, sheet: SheetId, start: u32, count: u32) -> GridResult<()> {
        let removed = self.require_mut(sheet)?.delete_columns(start, count)?;
        self.developer_metadata.retain(|md| match md.location {
            MetadataLocation::Column { sheet: s, column } => !(s == sheet && removed.contains(&column)),
            MetadataLocation::Sheet { .. } => true,
        });
        self.shift_named_ranges(sheet, |range| range.with_columns_deleted(start, count));
        Ok(())
    }

    fn append_row(&mut self, sheet: SheetId, values: &[CellValue]) -> GridResult<u32> {
        let target = self.require_mut(sheet)?;
        let row = target.last_row() + 1;
        let width = (values.len() as u32).max(1);
        target.ensure_rows(row);
        target.ensure_columns(width);

        for (i, value) in values.iter().enumerate() {
            target.set_content(row, i as u32 + 1, value.clone().into());
        }
        self.write_log.push(GridRange::new(sheet, row, 1, 1, width));
        Ok(row)
    }

    fn add_metadata(
        &mut self,
        target: MetadataTarget,
        key: &str,
        value: &str,
        visibility: MetadataVisibility,
    ) -> GridResult<MetadataId> {
        let location = match target {
            MetadataTarget::Sheet(sheet) => {
                self.require(sheet)?;
                MetadataLocation::Sheet { sheet }
            }
            MetadataTarget::Column { sheet, position } => {
                let target_sheet = self.require(sheet)?;
                let column = target_sheet
                    .column_id(position)
                    .ok_or_else(|| GridError::OutOfBounds {
                        range: GridRange::new(sheet, 1, position.max(1), 1, 1).a1_notation(),
                        max_rows: target_sheet.max_rows(),
                        max_columns: target_sheet.max_columns(),
                    })?;
                MetadataLocation::Column { sheet, column }
            }
        };

        let id = self.next_metadata_id;
        self.next_metadata_id += 1;
        self.developer_metadata.push(DeveloperMetadata {
            id,
            key: key.to_string(),
            value: value.to_string(),
            visibility,
            location,
        });
        Ok(id)
    }

    fn find_metadata(&self, query: &MetadataQuery) -> Vec<MetadataEntry> {
        self.developer_metadata
            .iter()
            .filter_map(|md| self.entry(md))
            .filter(|entry| query.matches(entry))
            .collect()
    }

    fn remove_metadata(&mut self, id: MetadataId) -> GridResult<()> {
        let index = self
            .developer_metadata
            .iter()
            .position(|md| md.id == id)
            .ok_or(GridError::MetadataNotFound(id))?;
        self.developer_metadata.remove(index);
        Ok(())
    }

    fn named_ranges(&self) -> Vec<NamedRange> {
        self.named_ranges.clone()
    }

    fn set_named_range(&mut self, name: &str, range: GridRange) -> GridResult<()> {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(GridError::InvalidNamedRange(name.to_string()));
        }
        self.require(range.sheet)?;
        if range.row == 0 || range.column == 0 || range.num_rows == 0 || range.num_columns == 0 {
            return Err(GridError::InvalidRange(range.a1_notation()));
        }

        match self.named_ranges.iter_mut().find(|named| named.name == name) {
            Some(named) => named.range = range,
            None => self.named_ranges.push(NamedRange {
                name: name.to_string(),
                range,
            }),
        }
        Ok(())
    }
}
