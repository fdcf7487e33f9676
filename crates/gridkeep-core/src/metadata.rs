//! Developer metadata: string tags attached to a sheet or to a whole column.
//!
//! Column tags are anchored to a [`ColumnId`], not to a position, so they
//! follow their column when other columns are inserted or deleted. A tag is
//! dropped together with the column or sheet it is attached to.

use serde::{Deserialize, Serialize};

use crate::range::{GridRange, SheetId};

pub type MetadataId = u32;

/// Stable identity of a column within its sheet
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataVisibility {
    #[default]
    Document,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Sheet,
    Column,
}

/// Where a tag is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataLocation {
    Sheet { sheet: SheetId },
    Column { sheet: SheetId, column: ColumnId },
}

impl MetadataLocation {
    pub fn kind(&self) -> LocationKind {
        match self {
            MetadataLocation::Sheet { .. } => LocationKind::Sheet,
            MetadataLocation::Column { .. } => LocationKind::Column,
        }
    }

    pub fn sheet(&self) -> SheetId {
        match self {
            MetadataLocation::Sheet { sheet } | MetadataLocation::Column { sheet, .. } => *sheet,
        }
    }
}

/// Where a new tag should be attached, addressed by current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataTarget {
    Sheet(SheetId),
    Column { sheet: SheetId, position: u32 },
}

/// A stored tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperMetadata {
    pub id: MetadataId,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub visibility: MetadataVisibility,
    pub location: MetadataLocation,
}

/// A tag as reported by a query, with its column resolved to the current position
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub id: MetadataId,
    pub key: String,
    pub value: String,
    pub visibility: MetadataVisibility,
    pub sheet: SheetId,
    /// Current 1-based column position for column tags
    pub column: Option<u32>,
}

impl MetadataEntry {
    pub fn kind(&self) -> LocationKind {
        if self.column.is_some() {
            LocationKind::Column
        } else {
            LocationKind::Sheet
        }
    }
}

/// Filter for [`crate::GridStore::find_metadata`]; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataQuery {
    pub kind: Option<LocationKind>,
    pub key: Option<String>,
    pub sheet: Option<SheetId>,
    pub intersecting: Option<GridRange>,
}

impl MetadataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets() -> Self {
        Self::new().kind(LocationKind::Sheet)
    }

    pub fn columns() -> Self {
        Self::new().kind(LocationKind::Column)
    }

    pub fn kind(mut self, kind: LocationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn in_sheet(mut self, sheet: SheetId) -> Self {
        self.sheet = Some(sheet);
        self
    }

    /// Only tags whose location intersects `range`. Column locations span every
    /// row, sheet locations span the whole sheet.
    pub fn intersecting(mut self, range: GridRange) -> Self {
        self.intersecting = Some(range);
        self
    }

    pub fn matches(&self, entry: &MetadataEntry) -> bool {
        if self.kind.is_some_and(|kind| kind != entry.kind()) {
            return false;
        }
        if self.key.as_deref().is_some_and(|key| key != entry.key) {
            return false;
        }
        if self.sheet.is_some_and(|sheet| sheet != entry.sheet) {
            return false;
        }
        if let Some(range) = &self.intersecting {
            if range.sheet != entry.sheet {
                return false;
            }
            if let Some(column) = entry.column {
                if !range.spans_columns(column, column) {
                    return false;
                }
            }
        }
        true
    }
}
