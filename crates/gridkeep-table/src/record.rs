use gridkeep_core::CellValue;

use crate::header::is_blank_header;

/// Header-keyed values in insertion order. Setting an existing header
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, CellValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<CellValue>) {
        let header = header.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(h, _)| *h == header) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((header, value)),
        }
    }

    pub fn with(mut self, header: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(header, value);
        self
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.entries.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }

    pub fn contains(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    pub fn remove(&mut self, header: &str) -> Option<CellValue> {
        let index = self.entries.iter().position(|(h, _)| h == header)?;
        Some(self.entries.remove(index).1)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries.iter().map(|(h, v)| (h.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values laid out under `headers`. Blank-headed columns always come out
    /// empty, whatever the fields hold under the placeholder.
    pub fn row_for(&self, headers: &[String]) -> Vec<CellValue> {
        headers
            .iter()
            .map(|h| {
                if is_blank_header(h) {
                    return CellValue::Empty;
                }
                self.get(h).cloned().unwrap_or_default()
            })
            .collect()
    }

    /// Copy every field of `other` over this one
    pub fn extend_from(&mut self, other: &Fields) {
        for (header, value) in other.iter() {
            self.insert(header, value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (header, value) in iter {
            fields.insert(header, value);
        }
        fields
    }
}

/// One data row of a table.
///
/// `row_position` (absolute, 1-based) and `row_index` (0-based within the
/// range it was read from) are bookkeeping only and never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Fields,
    pub row_position: u32,
    pub row_index: usize,
}

impl Record {
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.fields.get(header)
    }
}

impl From<Record> for Fields {
    fn from(record: Record) -> Self {
        record.fields
    }
}
