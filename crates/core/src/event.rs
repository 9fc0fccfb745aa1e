//! Pipeline events: progress signals for the presentation layer.
//!
//! The pipeline publishes an event after each fetch completes so a caller
//! can render "n of total processed" without being coupled to the fetch
//! loop. With concurrent fetching, completion events may arrive out of
//! selection order; the consolidated result never does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::fiscal_year::FiscalYear;
use crate::program::ProgramCode;

/// All events the retrieval pipeline emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A batch of program fetches is about to start
    BatchStarted {
        year: FiscalYear,
        programs: usize,
        timestamp: DateTime<Utc>,
    },

    /// One program's rows are available (fresh or cached)
    FetchCompleted {
        code: ProgramCode,
        year: FiscalYear,
        rows: usize,
        cached: bool,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One program's fetch failed; its slice counts as empty
    FetchFailed {
        code: ProgramCode,
        year: FiscalYear,
        cause: String,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// All fetches finished and the results were consolidated
    BatchFinished {
        year: FiscalYear,
        rows: usize,
        failures: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// `(completed, total)` for per-fetch events.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self {
            Self::FetchCompleted { completed, total, .. }
            | Self::FetchFailed { completed, total, .. } => Some((*completed, *total)),
            _ => None,
        }
    }
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
