//! Serializable data validation descriptors.
//!
//! A [`ValidationSpec`] is what gets stored in a `dataValidation` tag. It is
//! turned into a concrete [`DataValidationRule`] at repair time, which is when
//! `VALUE_IN_RANGE` looks up its named range.

use gridkeep_core::{
    DataValidationRule, GridRange, GridStore, ValidationCriteria, ValidationOperator,
};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaKind {
    ValueInList,
    ValueInRange,
    Checkbox,
    NumberBetween,
    NumberNotBetween,
    NumberEqualTo,
    NumberNotEqualTo,
    NumberGreaterThan,
    NumberGreaterThanOrEqualTo,
    NumberLessThan,
    NumberLessThanOrEqualTo,
    DateIsValidDate,
    CustomFormula,
}

impl CriteriaKind {
    fn operator(&self) -> Option<ValidationOperator> {
        Some(match self {
            CriteriaKind::NumberBetween => ValidationOperator::Between,
            CriteriaKind::NumberNotBetween => ValidationOperator::NotBetween,
            CriteriaKind::NumberEqualTo => ValidationOperator::Equal,
            CriteriaKind::NumberNotEqualTo => ValidationOperator::NotEqual,
            CriteriaKind::NumberGreaterThan => ValidationOperator::GreaterThan,
            CriteriaKind::NumberGreaterThanOrEqualTo => ValidationOperator::GreaterThanOrEqual,
            CriteriaKind::NumberLessThan => ValidationOperator::LessThan,
            CriteriaKind::NumberLessThanOrEqualTo => ValidationOperator::LessThanOrEqual,
            _ => return None,
        })
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSpec {
    pub criteria_type: CriteriaKind,
    /// Items for `VALUE_IN_LIST`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Lookup for `VALUE_IN_RANGE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_range: Option<String>,
    /// Operands for the `NUMBER_*` criteria
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default = "default_true")]
    pub show_dropdown: bool,
    #[serde(default)]
    pub allow_invalid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl ValidationSpec {
    pub fn new(criteria_type: CriteriaKind) -> Self {
        Self {
            criteria_type,
            values: Vec::new(),
            named_range: None,
            bounds: Vec::new(),
            formula: None,
            show_dropdown: true,
            allow_invalid: false,
            help_text: None,
        }
    }

    pub fn in_named_range(name: impl Into<String>) -> Self {
        Self {
            named_range: Some(name.into()),
            ..Self::new(CriteriaKind::ValueInRange)
        }
    }

    pub fn in_list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            ..Self::new(CriteriaKind::ValueInList)
        }
    }

    /// Check that the criteria has the arguments it needs
    pub fn validate(&self) -> Result<(), String> {
        match self.criteria_type {
            CriteriaKind::ValueInList if self.values.is_empty() => {
                Err("VALUE_IN_LIST needs at least one value".to_string())
            }
            CriteriaKind::ValueInRange if self.named_range.as_deref().map_or(true, str::is_empty) => {
                Err("VALUE_IN_RANGE needs a namedRange".to_string())
            }
            CriteriaKind::CustomFormula if self.formula.as_deref().map_or(true, str::is_empty) => {
                Err("CUSTOM_FORMULA needs a formula".to_string())
            }
            kind => match kind.operator() {
                Some(op) if op.arity() != self.bounds.len() => Err(format!(
                    "{:?} needs {} bounds, got {}",
                    kind,
                    op.arity(),
                    self.bounds.len()
                )),
                _ => Ok(()),
            },
        }
    }

    /// Build the concrete rule against the current state of the store
    pub fn to_rule<S: GridStore + ?Sized>(&self, store: &S) -> SchemaResult<DataValidationRule> {
        self.validate().map_err(SchemaError::InvalidConfig)?;

        let criteria = match self.criteria_type {
            CriteriaKind::ValueInList => ValidationCriteria::ValueInList {
                items: self.values.clone(),
                show_dropdown: self.show_dropdown,
            },
            CriteriaKind::ValueInRange => {
                let name = self.named_range.clone().unwrap_or_default();
                let named = store
                    .range_by_name(&name)
                    .ok_or(SchemaError::NamedRangeNotFound(name))?;
                let rows = store.max_rows(named.sheet)?;
                ValidationCriteria::ValueInRange {
                    range: GridRange::new(named.sheet, 1, named.column, rows, 1),
                    show_dropdown: self.show_dropdown,
                }
            }
            CriteriaKind::Checkbox => ValidationCriteria::Checkbox,
            CriteriaKind::DateIsValidDate => ValidationCriteria::ValidDate,
            CriteriaKind::CustomFormula => ValidationCriteria::CustomFormula {
                formula: self.formula.clone().unwrap_or_default(),
            },
            kind => {
                let operator = kind
                    .operator()
                    .ok_or_else(|| SchemaError::InvalidConfig(format!("unsupported criteria {kind:?}")))?;
                ValidationCriteria::Number {
                    operator,
                    value1: self.bounds[0],
                    value2: self.bounds.get(1).copied(),
                }
            }
        };

        let mut rule = DataValidationRule::new(criteria).with_allow_invalid(self.allow_invalid);
        if let Some(help) = &self.help_text {
            rule = rule.with_help_text(help.clone());
        }
        Ok(rule)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
