//! A query session: configuration, provider and one pipeline whose cache is
//! shared by every query issued through it.

use pacmon_config::AppConfig;
use pacmon_core::{
    DetailLevel, ExpenditureProvider, FiscalYear, PipelineError, PipelineEvent, Selection,
};
use pacmon_pipeline::{BatchReport, Pipeline};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::render;

pub struct Session {
    config: AppConfig,
    pipeline: Pipeline,
}

impl Session {
    pub fn new(config: AppConfig, provider: Arc<dyn ExpenditureProvider>) -> Self {
        let pipeline = Pipeline::from_config(&config, provider);
        Self { config, pipeline }
    }

    /// Build the configured provider and a fresh pipeline.
    pub fn from_config(config: AppConfig) -> pacmon_core::Result<Self> {
        let provider = pacmon_providers::build_from_config(&config)?;
        Ok(Self::new(config, provider))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn default_year(&self) -> Result<FiscalYear, PipelineError> {
        self.pipeline.check_year(self.config.years.default)
    }

    /// Validate the year and run one batch. With `progress`, per-fetch lines
    /// are printed on stderr while the batch runs.
    pub async fn query(
        &self,
        year: i32,
        selection: &Selection,
        detail: Option<DetailLevel>,
        progress: bool,
    ) -> Result<BatchReport, PipelineError> {
        let year = self.pipeline.check_year(year)?;
        let detail = detail.unwrap_or(self.pipeline.settings().detail);
        debug!(year = year.value(), %detail, ?selection, "Running query");

        let printer = progress.then(|| {
            let mut rx = self.pipeline.events().subscribe();
            let registry = self.pipeline.registry().clone();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            if let Some(line) = render::progress_line(&event, &registry) {
                                eprintln!("{line}");
                            }
                            if matches!(event.as_ref(), PipelineEvent::BatchFinished { .. }) {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Progress printer fell behind");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        });

        let result = self.pipeline.run_with_detail(year, selection, detail).await;
        match &result {
            Ok(report) if !report.failures.is_empty() => {
                warn!(failed = report.failures.len(), "Query finished with failed actions");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Query rejected"),
        }

        if let Some(handle) = printer {
            if result.is_ok() {
                let _ = handle.await;
            } else {
                handle.abort();
            }
        }

        result
    }
}

/// Turn `--program` values and `--all` into a selection. Values may be bare
/// codes, `"code - description"` options or the select-all marker.
pub fn selection_from_args(programs: &[String], all: bool) -> Selection {
    if all {
        Selection::SelectAll
    } else {
        Selection::from_options(programs)
    }
}
