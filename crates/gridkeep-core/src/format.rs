use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// Cell formatting. Only the number format is interpreted; every other
/// property (fonts, colours, alignment) rides along as an opaque style map and
/// is copied as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
}

impl CellFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        *self == CellFormat::default()
    }

    pub fn with_number_format(mut self, pattern: impl Into<String>) -> Self {
        self.number_format = Some(pattern.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }
}

/// Render a value the way it is shown in the grid under a number format.
///
/// Understands the fixed-decimal family (`0`, `0.00`, `#,##0.00`, `0.0%`);
/// text (`@`), `General` and any other pattern fall back to the raw text.
pub fn display_text(value: &CellValue, number_format: Option<&str>) -> String {
    let (CellValue::Number(n), Some(pattern)) = (value, number_format) else {
        return value.as_text();
    };

    let pattern = pattern.trim();
    let (body, percent) = match pattern.strip_suffix('%') {
        Some(body) => (body, true),
        None => (pattern, false),
    };
    if body.is_empty() || !body.chars().all(|c| matches!(c, '0' | '#' | ',' | '.')) {
        return value.as_text();
    }

    let decimals = body
        .split_once('.')
        .map(|(_, frac)| frac.chars().filter(|c| *c == '0').count())
        .unwrap_or(0);
    let scaled = if percent { n * 100.0 } else { *n };
    let mut text = format!("{:.*}", decimals, scaled);

    if body.contains(',') {
        text = group_thousands(&text);
    }
    if percent {
        text.push('%');
    }
    text
}

fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
