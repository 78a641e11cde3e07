//! First pass: collect per-column statistics without retaining record data.

use std::collections::HashMap;

use crate::error::ConvertResult;
use crate::types::{FlattenedRecord, PropertyInfo};

use super::EntryProcessor;

/// Accumulates one [`PropertyInfo`] per property name.
///
/// Columns keep the order in which their names were first seen; that order later drives the
/// exported header and field order.
#[derive(Debug, Clone, Default)]
pub struct SchemaCollector {
    columns: Vec<PropertyInfo>,
    index: HashMap<String, usize>,
    records: usize,
}

impl SchemaCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected columns in first-seen order.
    pub fn columns(&self) -> &[PropertyInfo] {
        &self.columns
    }

    /// Consume the collector, returning the columns in first-seen order.
    pub fn into_columns(self) -> Vec<PropertyInfo> {
        self.columns
    }

    /// Statistics for one column, if it was seen.
    pub fn get(&self, name: &str) -> Option<&PropertyInfo> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Column names in first-seen order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of records processed so far.
    pub fn record_count(&self) -> usize {
        self.records
    }

    fn column_mut(&mut self, name: &str) -> &mut PropertyInfo {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.columns.len();
                self.columns.push(PropertyInfo::new(name));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.columns[idx]
    }
}

impl EntryProcessor for SchemaCollector {
    fn process_entry(&mut self, entry: &FlattenedRecord) -> ConvertResult<()> {
        self.records += 1;
        for property in &entry.properties {
            self.column_mut(&property.name).observe(&property.value);
        }
        Ok(())
    }

    fn after_entries(&mut self) -> ConvertResult<()> {
        tracing::debug!(
            records = self.records,
            columns = self.columns.len(),
            "schema collection finished"
        );
        Ok(())
    }
}
