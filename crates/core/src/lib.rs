//! # pacmon Core
//!
//! Domain types, traits, and error definitions for pacmon, a monitor of
//! public budget execution for a fixed set of strategic investment actions.
//! This crate has **no I/O**; it defines the domain model that the
//! provider, pipeline and CLI crates build on.
//!
//! ## Design Philosophy
//!
//! The external budget-data source is defined here as a trait
//! ([`ExpenditureProvider`]). Implementations live in `pacmon-providers`.
//! This enables:
//! - Swapping the SIOP endpoint for an offline fixture via configuration
//! - Easy testing with mock providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod fiscal_year;
pub mod program;
pub mod provider;
pub mod record;

// Re-export key types at crate root for ergonomics
pub use error::{Error, PipelineError, ProviderError, Result};
pub use event::{EventBus, PipelineEvent};
pub use fiscal_year::{FiscalYear, YearRange};
pub use program::{ProgramCode, ProgramEntry, ProgramRegistry, Selection};
pub use provider::{ExpenditureProvider, ExpenditureQuery};
pub use record::{Category, Dataset, DetailLevel, Dimension, ExpenditureRecord};
