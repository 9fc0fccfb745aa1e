//! Grouped breakdowns of committed amounts by category.

use pacmon_core::{Dimension, PipelineError};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dataset::ConsolidatedDataset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub code: String,
    pub description: String,
    /// Summed committed amount
    pub amount: f64,
}

/// Groups sorted by descending amount, ties by ascending code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub dimension: Dimension,
    pub rows: Vec<AggregateRow>,
}

impl AggregateView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.amount).sum()
    }
}

/// Breakdown with the dimension's default truncation
/// (unbounded for nature, top 10 for source and unit).
pub fn aggregate_by(
    dataset: &ConsolidatedDataset,
    dimension: Dimension,
) -> Result<AggregateView, PipelineError> {
    aggregate_top(dataset, dimension, dimension.default_limit())
}

/// Group rows by the dimension's (code, description) pair and sum the
/// committed amount. Groups summing to zero or less are dropped.
pub fn aggregate_top(
    dataset: &ConsolidatedDataset,
    dimension: Dimension,
    limit: Option<usize>,
) -> Result<AggregateView, PipelineError> {
    if !dataset.detail.includes(dimension) {
        return Err(PipelineError::MissingDimension(dimension));
    }

    let mut groups: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for row in &dataset.rows {
        let category = row
            .category(dimension)
            .ok_or(PipelineError::MissingDimension(dimension))?;
        *groups
            .entry((category.code.as_str(), category.description.as_str()))
            .or_default() += row.committed;
    }

    // BTreeMap iteration is already ascending by code; the stable sort keeps
    // that order among equal amounts.
    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|((code, description), amount)| AggregateRow {
            code: code.to_string(),
            description: description.to_string(),
            amount,
        })
        .collect();
    rows.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    Ok(AggregateView { dimension, rows })
}
