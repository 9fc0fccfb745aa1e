//! # pacmon Pipeline
//!
//! The retrieval and summary pipeline:
//!
//! ```text
//! Selection ─► ProgramRegistry::resolve ─► Fetcher (cache + provider) per code
//!           ─► consolidate ─► totals + breakdowns by nature / source / unit
//! ```
//!
//! The [`Pipeline`] wires these together and publishes progress on an
//! [`EventBus`](pacmon_core::EventBus).

pub mod aggregate;
pub mod batch;
pub mod cache;
pub mod dataset;
pub mod fetcher;

pub use aggregate::{aggregate_by, aggregate_top, AggregateRow, AggregateView};
pub use batch::{BatchReport, Breakdown, Pipeline, PipelineSettings};
pub use cache::{CacheKey, CacheStats, CachedSlice, Clock, FetchCache, ManualClock, SystemClock};
pub use dataset::{consolidate, ConsolidatedDataset, ExecutionRatios, Totals};
pub use fetcher::{FetchOutcome, Fetcher};
