use serde::{Deserialize, Serialize};

use crate::format::CellFormat;
use crate::validation::DataValidationRule;

/// Represents the raw value stored in a cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    /// Check if the value is empty (an empty string counts as empty)
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// The content of a cell - either a raw value or a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CellContent {
    #[serde(rename = "Value")]
    Value {
        #[serde(rename = "value")]
        value: CellValue,
    },
    #[serde(rename = "Formula")]
    Formula {
        #[serde(rename = "expression")]
        /// Original formula text (e.g., "=SUM(A1:A10)")
        expression: String,
        #[serde(rename = "cachedValue")]
        /// Last computed value as reported by the substrate
        cached_value: CellValue,
    },
}

impl Default for CellContent {
    fn default() -> Self {
        CellContent::Value {
            value: CellValue::Empty,
        }
    }
}

impl From<CellValue> for CellContent {
    fn from(value: CellValue) -> Self {
        CellContent::Value { value }
    }
}

impl CellContent {
    pub fn formula(expression: impl Into<String>, cached_value: CellValue) -> Self {
        CellContent::Formula {
            expression: expression.into(),
            cached_value,
        }
    }

    /// Get the computed value (for both value and formula)
    pub fn computed_value(&self) -> &CellValue {
        match self {
            CellContent::Value { value } => value,
            CellContent::Formula { cached_value, .. } => cached_value,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula { .. })
    }

    pub fn formula_expression(&self) -> Option<&str> {
        match self {
            CellContent::Formula { expression, .. } => Some(expression),
            _ => None,
        }
    }

    /// Check if this content is empty (empty value, not a formula)
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Value { value } if value.is_empty())
    }
}

/// Complete cell data structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,
    #[serde(default, skip_serializing_if = "CellFormat::is_default")]
    pub format: CellFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<DataValidationRule>,
}

impl Cell {
    pub fn new(content: CellContent) -> Self {
        Cell {
            content,
            ..Cell::default()
        }
    }

    pub fn value(value: impl Into<CellValue>) -> Self {
        Cell::new(CellContent::Value {
            value: value.into(),
        })
    }

    pub fn formula(expression: impl Into<String>, cached_value: CellValue) -> Self {
        Cell::new(CellContent::formula(expression, cached_value))
    }

    pub fn computed_value(&self) -> &CellValue {
        self.content.computed_value()
    }

    /// A cell with no content, default format and no validation can be dropped from storage
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.format.is_default() && self.validation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_as_number() {
        assert_eq!(CellValue::Number(42.0).as_number(), Some(42.0));
        assert_eq!(CellValue::Boolean(true).as_number(), Some(1.0));
        assert_eq!(CellValue::Text("123".to_string()).as_number(), Some(123.0));
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_cell_value_as_text() {
        assert_eq!(CellValue::Number(42.0).as_text(), "42");
        assert_eq!(CellValue::Number(42.5).as_text(), "42.5");
        assert_eq!(CellValue::Boolean(true).as_text(), "TRUE");
        assert_eq!(CellValue::from("hello").as_text(), "hello");
    }

    #[test]
    fn test_empty_text_counts_as_empty() {
        assert!(CellValue::from("").is_empty());
        assert!(CellContent::from(CellValue::from("")).is_empty());
        assert!(!CellValue::from(" ").is_empty());
    }

    #[test]
    fn test_formula_keeps_cached_value() {
        let cell = Cell::formula("=A1+B1", CellValue::Number(3.0));
        assert!(cell.content.is_formula());
        assert_eq!(cell.content.formula_expression(), Some("=A1+B1"));
        assert_eq!(cell.computed_value(), &CellValue::Number(3.0));
        assert!(!cell.is_empty());
    }

    #[test]
    fn test_formatted_cell_is_not_empty() {
        let mut cell = Cell::default();
        assert!(cell.is_empty());
        cell.format.number_format = Some("0.00".into());
        assert!(!cell.is_empty());
    }
}
