use std::fmt;

use crate::error::SchemaError;

/// What happened to one item of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Changed,
    Unchanged,
}

#[derive(Debug)]
pub struct ItemReport {
    /// Human readable handle, e.g. `Trips!C (Driver)`
    pub item: String,
    pub result: Result<ItemStatus, SchemaError>,
}

/// Per-item outcomes of a registry or builder pass. One failing item never
/// stops the others.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, item: impl Into<String>, result: Result<ItemStatus, SchemaError>) {
        let item = item.into();
        match &result {
            Ok(ItemStatus::Changed) => {}
            Ok(ItemStatus::Unchanged) => tracing::debug!("{} unchanged", item),
            Err(e) => tracing::error!("{} failed: {}", item, e),
        }
        self.items.push(ItemReport { item, result });
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.items.extend(other.items);
    }

    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|r| matches!(r.result, Ok(ItemStatus::Changed)))
            .map(|r| r.item.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SchemaError)> {
        self.items
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.item.as_str(), e)))
    }

    pub fn changed_count(&self) -> usize {
        self.changed().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let changed = self.changed_count();
        let failed = self.failure_count();
        write!(
            f,
            "{} changed, {} unchanged, {} failed",
            changed,
            self.items.len() - changed - failed,
            failed
        )
    }
}
