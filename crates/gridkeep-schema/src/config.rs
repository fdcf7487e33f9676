use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use gridkeep_core::column_position;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::rule::ValidationSpec;

fn default_true() -> bool {
    true
}

/// The schema a workbook is expected to follow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    #[serde(default)]
    pub sheets: Vec<SheetDescriptor>,
    #[serde(default)]
    pub named_ranges: BTreeMap<String, NamedRangeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDescriptor {
    pub name: String,
    #[serde(default = "default_true")]
    pub has_headers: bool,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub header_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_validation: Option<ValidationSpec>,
}

/// Where a named range should point. The header name wins when it is found in
/// the sheet's header row; the column letters are the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRangeEntry {
    pub sheet_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            number_format: None,
            data_validation: None,
        }
    }

    pub fn with_number_format(mut self, pattern: impl Into<String>) -> Self {
        self.number_format = Some(pattern.into());
        self
    }

    pub fn with_data_validation(mut self, spec: ValidationSpec) -> Self {
        self.data_validation = Some(spec);
        self
    }
}

impl SheetDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            has_headers: true,
            columns,
        }
    }

    pub fn column(&self, header: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.header_name == header)
    }
}

impl SchemaConfig {
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let config: SchemaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetDescriptor> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn validate(&self) -> SchemaResult<()> {
        let mut sheet_names = HashSet::new();
        for sheet in &self.sheets {
            if sheet.name.trim().is_empty() {
                return Err(invalid("sheet name must not be empty"));
            }
            if !sheet_names.insert(sheet.name.as_str()) {
                return Err(invalid(format!("sheet '{}' is configured twice", sheet.name)));
            }

            let mut headers = HashSet::new();
            for column in &sheet.columns {
                if column.header_name.trim().is_empty() {
                    return Err(invalid(format!("sheet '{}' has a blank header name", sheet.name)));
                }
                if !headers.insert(column.header_name.as_str()) {
                    return Err(invalid(format!(
                        "header '{}' is configured twice in sheet '{}'",
                        column.header_name, sheet.name
                    )));
                }
                if let Some(spec) = &column.data_validation {
                    spec.validate().map_err(|reason| {
                        invalid(format!("{}!{}: {}", sheet.name, column.header_name, reason))
                    })?;
                }
            }
        }

        for (name, entry) in &self.named_ranges {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(invalid(format!("'{}' is not a valid range name", name)));
            }
            if entry.sheet_name.trim().is_empty() {
                return Err(invalid(format!("named range '{}' has no sheet", name)));
            }
            if entry.column.is_none() && entry.header_name.is_none() {
                return Err(invalid(format!(
                    "named range '{}' needs a column or a header name",
                    name
                )));
            }
            if let Some(letters) = &entry.column {
                if column_position(letters).is_none() {
                    return Err(invalid(format!(
                        "named range '{}' has invalid column '{}'",
                        name, letters
                    )));
                }
            }
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::CriteriaKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "sheets": [
            {
                "name": "Trips",
                "columns": [
                    { "headerName": "Date", "numberFormat": "yyyy-mm-dd" },
                    { "headerName": "Fare", "numberFormat": "0.00" },
                    {
                        "headerName": "Driver",
                        "dataValidation": { "criteriaType": "VALUE_IN_RANGE", "namedRange": "lookupDrivers" }
                    }
                ]
            },
            { "name": "Drivers", "columns": [{ "headerName": "Name" }] }
        ],
        "namedRanges": {
            "lookupDrivers": { "sheetName": "Drivers", "column": "A", "headerName": "Name" }
        }
    }"#;

    #[test]
    fn test_parse_config() {
        let config = SchemaConfig::from_json(CONFIG).unwrap();

        assert_eq!(config.sheets.len(), 2);
        let trips = config.sheet("Trips").unwrap();
        assert!(trips.has_headers);
        assert_eq!(
            trips.column("Fare"),
            Some(&ColumnDescriptor::new("Fare").with_number_format("0.00"))
        );
        assert_eq!(
            trips.column("Driver").unwrap().data_validation.as_ref().unwrap().criteria_type,
            CriteriaKind::ValueInRange
        );
        assert_eq!(config.named_ranges["lookupDrivers"].column.as_deref(), Some("A"));
    }

    #[test]
    fn test_rejects_duplicate_headers() {
        let json = r#"{"sheets":[{"name":"Trips","columns":[{"headerName":"Date"},{"headerName":"Date"}]}]}"#;
        assert!(matches!(
            SchemaConfig::from_json(json),
            Err(SchemaError::InvalidConfig(reason)) if reason.contains("Date")
        ));
    }

    #[test]
    fn test_rejects_bad_named_ranges() {
        let no_target = r#"{"namedRanges":{"lookupDrivers":{"sheetName":"Drivers"}}}"#;
        assert!(matches!(SchemaConfig::from_json(no_target), Err(SchemaError::InvalidConfig(_))));

        let bad_column = r#"{"namedRanges":{"lookupDrivers":{"sheetName":"Drivers","column":"A1"}}}"#;
        assert!(matches!(SchemaConfig::from_json(bad_column), Err(SchemaError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_incomplete_validation() {
        let json = r#"{"sheets":[{"name":"Trips","columns":[{"headerName":"Paid","dataValidation":{"criteriaType":"VALUE_IN_LIST"}}]}]}"#;
        assert!(matches!(SchemaConfig::from_json(json), Err(SchemaError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = SchemaConfig::load(file.path()).unwrap();
        assert_eq!(config.sheets[1].name, "Drivers");

        let missing = SchemaConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SchemaError::Io(_))));
    }
}
