//! Snapshot of all watched records from one collection pass.

use std::collections::HashSet;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::models::Record;

/// Ordered records as of one successful collection pass.
///
/// Snapshots are plain values: passes build a fresh one and the diff engine
/// returns a new one instead of editing its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot<R> {
    records: Vec<R>,
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R> Snapshot<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R: Record> Snapshot<R> {
    /// Keep the first record for each key, returning the later repeats.
    pub fn dedup_by_key(&mut self) -> Vec<R> {
        let mut seen = HashSet::new();
        let (kept, duplicates): (Vec<R>, Vec<R>) = mem::take(&mut self.records)
            .into_iter()
            .partition(|record| seen.insert(record.key()));
        self.records = kept;
        duplicates
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.iter().any(|r| r.key() == key)
    }
}

impl<R> From<Vec<R>> for Snapshot<R> {
    fn from(records: Vec<R>) -> Self {
        Self { records }
    }
}

impl<R> FromIterator<R> for Snapshot<R> {
    fn from_iter<T: IntoIterator<Item = R>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a, R> IntoIterator for &'a Snapshot<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    #[test]
    fn test_dedup_keeps_first_seen() {
        let mut snapshot: Snapshot<Product> = vec![
            Product::new("A1", "First", 1000),
            Product::new("B2", "Other", 2000),
            Product::new("A1", "Second", 900),
        ]
        .into();

        let duplicates = snapshot.dedup_by_key();

        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].name, "Second");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records()[0].name, "First");
        assert!(snapshot.contains_key("B2"));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let snapshot: Snapshot<Product> = vec![Product::new("A1", "Case", 1000)].into();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.is_array());

        let back: Snapshot<Product> = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
