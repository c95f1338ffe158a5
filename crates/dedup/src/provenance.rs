use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::FactoryRecord;

/// Distinct source documents behind one output record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    sources: BTreeSet<String>,
}

impl Provenance {
    pub fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FactoryRecord>,
    {
        let sources = records
            .into_iter()
            .filter_map(|r| r.source_file_path.clone())
            .collect();
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.sources.iter().cloned().collect()
    }

    /// Sorted JSON array. An empty provenance is still an array.
    pub fn into_json(self) -> Value {
        Value::Array(self.sources.into_iter().map(Value::String).collect())
    }
}
