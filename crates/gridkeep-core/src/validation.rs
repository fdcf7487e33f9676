use crate::range::GridRange;
use serde::{Deserialize, Serialize};

/// Comparison operators for numeric validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOperator {
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ValidationOperator {
    /// Number of operands the operator takes
    pub fn arity(&self) -> usize {
        match self {
            ValidationOperator::Between | ValidationOperator::NotBetween => 2,
            _ => 1,
        }
    }
}

/// Validation criteria types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationCriteria {
    /// Dropdown of static values
    ValueInList {
        items: Vec<String>,
        #[serde(default = "default_true")]
        show_dropdown: bool,
    },

    /// Dropdown sourced from a range of the workbook
    ValueInRange {
        range: GridRange,
        #[serde(default = "default_true")]
        show_dropdown: bool,
    },

    Checkbox,

    Number {
        operator: ValidationOperator,
        value1: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        value2: Option<f64>,
    },

    ValidDate,

    /// Custom formula (must evaluate to TRUE)
    CustomFormula {
        formula: String,
    },
}

fn default_true() -> bool { true }

/// A data validation rule as attached to cells
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataValidationRule {
    pub criteria: ValidationCriteria,
    /// Accept invalid input with a warning instead of rejecting it
    #[serde(default)]
    pub allow_invalid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl DataValidationRule {
    pub fn new(criteria: ValidationCriteria) -> Self {
        Self {
            criteria,
            allow_invalid: false,
            help_text: None,
        }
    }

    pub fn with_allow_invalid(mut self, allow_invalid: bool) -> Self {
        self.allow_invalid = allow_invalid;
        self
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    /// Get dropdown items for list validation (static values only)
    pub fn dropdown_items(&self) -> Option<&[String]> {
        match &self.criteria {
            ValidationCriteria::ValueInList { items, show_dropdown } if *show_dropdown => {
                Some(items)
            }
            _ => None,
        }
    }
}
