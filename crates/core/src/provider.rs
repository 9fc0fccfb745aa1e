//! Provider trait: the abstraction over the upstream budget-data source.
//!
//! A provider answers one question: "what was executed for this action in
//! this fiscal year, broken down at this level of detail?"
//!
//! Implementations: SIOP SPARQL endpoint, static fixture data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::fiscal_year::FiscalYear;
use crate::program::ProgramCode;
use crate::record::{DetailLevel, ExpenditureRecord};

/// A single provider request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenditureQuery {
    pub year: FiscalYear,

    pub program: ProgramCode,

    /// Categorical breakdowns to include
    #[serde(default)]
    pub detail: DetailLevel,

    /// Ask for human-readable descriptions alongside codes
    #[serde(default = "default_include_descriptions")]
    pub include_descriptions: bool,
}

fn default_include_descriptions() -> bool {
    true
}

impl ExpenditureQuery {
    pub fn new(year: FiscalYear, program: ProgramCode, detail: DetailLevel) -> Self {
        Self {
            year,
            program,
            detail,
            include_descriptions: default_include_descriptions(),
        }
    }

    pub fn without_descriptions(mut self) -> Self {
        self.include_descriptions = false;
        self
    }
}

/// The core provider trait.
///
/// The fetch layer calls `query()` without knowing which backend answers.
/// Every failure must come back as a [`ProviderError`]; raw transport or
/// parse errors never escape an implementation.
#[async_trait]
pub trait ExpenditureProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "siop", "fixture").
    fn name(&self) -> &str;

    /// Fetch the detailed execution rows for one (year, program) slice.
    async fn query(
        &self,
        query: &ExpenditureQuery,
    ) -> std::result::Result<Vec<ExpenditureRecord>, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
