//! Static provider: answers queries from an in-memory record set.
//!
//! Used for offline runs and tests. Records are stored at their finest
//! grain and projected down to the requested detail level on every query,
//! which mirrors how the live endpoint aggregates.

use async_trait::async_trait;
use pacmon_core::error::ProviderError;
use pacmon_core::provider::{ExpenditureProvider, ExpenditureQuery};
use pacmon_core::{Category, ExpenditureRecord};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Grouping key of a projected row: one optional category per dimension.
type ProjectionKey = [Option<Category>; 3];

pub struct StaticProvider {
    name: String,
    records: Vec<ExpenditureRecord>,
}

impl StaticProvider {
    pub fn new(records: Vec<ExpenditureRecord>) -> Self {
        Self {
            name: "fixture".into(),
            records,
        }
    }

    /// Load a JSON array of records.
    pub fn from_json_file(path: &Path) -> pacmon_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<ExpenditureRecord> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), records = records.len(), "Loaded fixture records");
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ExpenditureProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        query: &ExpenditureQuery,
    ) -> std::result::Result<Vec<ExpenditureRecord>, ProviderError> {
        let dimensions = query.detail.dimensions();
        let mut order: Vec<ProjectionKey> = Vec::new();
        let mut groups: HashMap<ProjectionKey, ExpenditureRecord> = HashMap::new();

        for record in self
            .records
            .iter()
            .filter(|r| r.year == query.year && r.program == query.program)
        {
            let mut key: ProjectionKey = [None, None, None];
            for (slot, dimension) in dimensions.iter().enumerate() {
                let category = record.category(*dimension).ok_or_else(|| {
                    ProviderError::MalformedResponse(format!(
                        "fixture row for {} has no {dimension}",
                        record.program
                    ))
                })?;
                let mut category = category.clone();
                if !query.include_descriptions {
                    category.description.clear();
                }
                key[slot] = Some(category);
            }

            let row = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                let mut row = ExpenditureRecord::new(record.year, record.program.clone());
                if query.include_descriptions {
                    row.program_description = record.program_description.clone();
                }
                for (slot, dimension) in dimensions.iter().enumerate() {
                    if let Some(category) = &key[slot] {
                        row = row.with_category(*dimension, category.clone());
                    }
                }
                row
            });
            row.updated_appropriation += record.updated_appropriation;
            row.committed += record.committed;
            row.settled += record.settled;
            row.paid += record.paid;
        }

        Ok(order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect())
    }
}
