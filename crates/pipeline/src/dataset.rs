//! Consolidation of per-program datasets and execution totals.

use pacmon_core::{Dataset, DetailLevel, ExpenditureRecord};
use serde::Serialize;
use std::borrow::Borrow;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// The row union of every dataset fetched for one request.
///
/// No deduplication is performed: a row present in two inputs is counted twice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedDataset {
    /// Dimensions every input carried
    pub detail: DetailLevel,
    pub rows: Vec<ExpenditureRecord>,
}

impl ConsolidatedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn totals(&self) -> Totals {
        self.rows.iter().map(Totals::of).sum()
    }
}

/// Concatenate datasets, preserving input order and row order within each.
///
/// The resulting detail level is the intersection of the inputs' levels, so a
/// breakdown is only offered when every input can answer it.
pub fn consolidate<I, D>(datasets: I) -> ConsolidatedDataset
where
    I: IntoIterator<Item = D>,
    D: Borrow<Dataset>,
{
    let mut detail: Option<DetailLevel> = None;
    let mut rows = Vec::new();

    for dataset in datasets {
        let dataset = dataset.borrow();
        detail = Some(match detail {
            Some(level) => level.intersect(dataset.detail),
            None => dataset.detail,
        });
        rows.extend(dataset.rows.iter().cloned());
    }

    ConsolidatedDataset {
        detail: detail.unwrap_or(DetailLevel::NONE),
        rows,
    }
}

/// Sums of the four monetary attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub updated_appropriation: f64,
    pub committed: f64,
    pub settled: f64,
    pub paid: f64,
}

impl Totals {
    pub fn of(record: &ExpenditureRecord) -> Self {
        Self {
            updated_appropriation: record.updated_appropriation,
            committed: record.committed,
            settled: record.settled,
            paid: record.paid,
        }
    }

    pub fn ratios(&self) -> ExecutionRatios {
        let over_appropriation = |amount: f64| {
            (self.updated_appropriation != 0.0).then(|| amount / self.updated_appropriation)
        };
        ExecutionRatios {
            committed: over_appropriation(self.committed),
            settled: over_appropriation(self.settled),
            paid: over_appropriation(self.paid),
        }
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(mut self, rhs: Totals) -> Totals {
        self += rhs;
        self
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Totals) {
        self.updated_appropriation += rhs.updated_appropriation;
        self.committed += rhs.committed;
        self.settled += rhs.settled;
        self.paid += rhs.paid;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::default(), Add::add)
    }
}

/// Execution over updated appropriation. `None` means not applicable
/// (zero appropriation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExecutionRatios {
    pub committed: Option<f64>,
    pub settled: Option<f64>,
    pub paid: Option<f64>,
}
