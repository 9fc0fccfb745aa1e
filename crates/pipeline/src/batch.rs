//! Batch orchestration: resolve a selection, fetch every program, consolidate
//! and summarize.
//!
//! Fetch failures never abort a batch. A failed program contributes an empty
//! slice and shows up in [`BatchReport::failures`]; a breakdown that cannot be
//! computed fails on its own without affecting totals or the other breakdowns.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use pacmon_config::AppConfig;
use pacmon_core::{
    DetailLevel, Dimension, EventBus, ExpenditureProvider, FiscalYear, PipelineError,
    PipelineEvent, ProgramCode, ProgramRegistry, Selection, YearRange,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_top, AggregateView};
use crate::cache::FetchCache;
use crate::dataset::{consolidate, ConsolidatedDataset, ExecutionRatios, Totals};
use crate::fetcher::{FetchOutcome, Fetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub years: YearRange,
    pub detail: DetailLevel,
    pub max_concurrent_fetches: usize,
    /// Truncation for the bounded breakdowns (source and unit)
    pub top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            years: YearRange::default(),
            detail: DetailLevel::FULL,
            max_concurrent_fetches: 1,
            top_n: 10,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            years: config.year_range(),
            detail: config.pipeline.detail_level(),
            max_concurrent_fetches: config.pipeline.max_concurrent_fetches.max(1),
            top_n: config.pipeline.top_n,
        }
    }

    fn limit_for(&self, dimension: Dimension) -> Option<usize> {
        dimension.default_limit().map(|_| self.top_n)
    }
}

/// One of the three breakdowns, or why it could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub dimension: Dimension,
    pub result: Result<AggregateView, PipelineError>,
}

/// Everything the presentation layer needs for one request.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub year: FiscalYear,
    pub detail: DetailLevel,
    /// Resolved codes, in selection order
    pub programs: Vec<ProgramCode>,
    pub dataset: ConsolidatedDataset,
    pub totals: Totals,
    pub ratios: ExecutionRatios,
    pub breakdowns: Vec<Breakdown>,
    /// One `ProviderQueryFailed` per failed program
    pub failures: Vec<PipelineError>,
}

impl BatchReport {
    pub fn breakdown(&self, dimension: Dimension) -> Option<&Result<AggregateView, PipelineError>> {
        self.breakdowns
            .iter()
            .find(|b| b.dimension == dimension)
            .map(|b| &b.result)
    }

    pub fn failed_codes(&self) -> Vec<&ProgramCode> {
        self.failures.iter().filter_map(PipelineError::failed_code).collect()
    }

    pub fn has_data(&self) -> bool {
        !self.dataset.is_empty()
    }
}

/// Registry, fetch layer and event bus wired together.
pub struct Pipeline {
    registry: ProgramRegistry,
    fetcher: Fetcher,
    events: Arc<EventBus>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(registry: ProgramRegistry, fetcher: Fetcher, settings: PipelineSettings) -> Self {
        Self {
            registry,
            fetcher,
            events: Arc::new(EventBus::default()),
            settings,
        }
    }

    /// Build a pipeline with a fresh session cache from configuration.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn ExpenditureProvider>) -> Self {
        let cache = Arc::new(FetchCache::with_ttl(config.cache.ttl()));
        let fetcher = Fetcher::new(provider, cache)
            .with_timeout(config.provider.timeout())
            .with_cache_failures(config.cache.cache_failures)
            .with_descriptions(config.provider.include_descriptions);
        Self::new(config.registry(), fetcher, PipelineSettings::from_config(config))
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cache(&self) -> &FetchCache {
        self.fetcher.cache()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Validate a user-supplied year against the configured range.
    pub fn check_year(&self, year: i32) -> Result<FiscalYear, PipelineError> {
        self.settings.years.check(year)
    }

    /// Run a batch at the configured detail level.
    pub async fn run(&self, year: FiscalYear, selection: &Selection) -> Result<BatchReport, PipelineError> {
        self.run_with_detail(year, selection, self.settings.detail).await
    }

    /// Run a batch. Every program is fetched at the same `detail`.
    ///
    /// Returns `EmptySelection` before touching the provider when the
    /// selection resolves to nothing; every other failure is reported inside
    /// the [`BatchReport`].
    pub async fn run_with_detail(
        &self,
        year: FiscalYear,
        selection: &Selection,
        detail: DetailLevel,
    ) -> Result<BatchReport, PipelineError> {
        let programs = self.registry.resolve(selection);
        if programs.is_empty() {
            return Err(PipelineError::EmptySelection);
        }

        let started = Instant::now();
        let total = programs.len();
        info!(year = year.value(), programs = total, %detail, "Starting batch");
        self.events.publish(PipelineEvent::BatchStarted {
            year,
            programs: total,
            timestamp: Utc::now(),
        });

        let outcomes = self.fetch_all(year, &programs, detail).await;

        let mut failures = Vec::new();
        let mut datasets = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Some(failure) = outcome.failure {
                failures.push(failure);
            }
            datasets.push(outcome.dataset);
        }

        let dataset = consolidate(datasets);
        let totals = dataset.totals();
        let breakdowns = Dimension::ALL
            .into_iter()
            .map(|dimension| Breakdown {
                dimension,
                result: aggregate_top(&dataset, dimension, self.settings.limit_for(dimension)),
            })
            .collect::<Vec<_>>();

        for breakdown in &breakdowns {
            if let Err(e) = &breakdown.result {
                debug!(dimension = %breakdown.dimension, error = %e, "Breakdown unavailable");
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        if !failures.is_empty() {
            warn!(failed = failures.len(), total, "Some programs could not be fetched");
        }
        info!(rows = dataset.len(), failures = failures.len(), duration_ms, "Batch finished");
        self.events.publish(PipelineEvent::BatchFinished {
            year,
            rows: dataset.len(),
            failures: failures.len(),
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(BatchReport {
            year,
            detail,
            programs,
            ratios: totals.ratios(),
            totals,
            dataset,
            breakdowns,
            failures,
        })
    }

    /// Fetch every code with bounded concurrency. Results come back in
    /// `programs` order; progress events are published as fetches complete.
    async fn fetch_all(
        &self,
        year: FiscalYear,
        programs: &[ProgramCode],
        detail: DetailLevel,
    ) -> Vec<FetchOutcome> {
        let total = programs.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        stream::iter(programs)
            .map(move |code| async move {
                let outcome = self.fetcher.fetch(year, code, detail).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                let event = match &outcome.failure {
                    Some(failure) => PipelineEvent::FetchFailed {
                        code: code.clone(),
                        year,
                        cause: failure.to_string(),
                        completed: done,
                        total,
                        timestamp: Utc::now(),
                    },
                    None => PipelineEvent::FetchCompleted {
                        code: code.clone(),
                        year,
                        rows: outcome.dataset.len(),
                        cached: outcome.cached,
                        completed: done,
                        total,
                        timestamp: Utc::now(),
                    },
                };
                self.events.publish(event);
                outcome
            })
            .buffered(self.settings.max_concurrent_fetches.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pacmon_core::{Category, ExpenditureQuery, ExpenditureRecord, ProviderError};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves fixed rows per code; codes in `failing` error out.
    struct ScriptedProvider {
        rows: HashMap<&'static str, Vec<(&'static str, &'static str, f64)>>,
        failing: Vec<&'static str>,
        delays: HashMap<&'static str, Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                rows: HashMap::new(),
                failing: Vec::new(),
                delays: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// (category code, unit code, committed)
        fn with_rows(mut self, code: &'static str, rows: Vec<(&'static str, &'static str, f64)>) -> Self {
            self.rows.insert(code, rows);
            self
        }

        fn failing(mut self, code: &'static str) -> Self {
            self.failing.push(code);
            self
        }

        fn delayed(mut self, code: &'static str, delay: Duration) -> Self {
            self.delays.insert(code, delay);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExpenditureProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn query(&self, query: &ExpenditureQuery) -> Result<Vec<ExpenditureRecord>, ProviderError> {
            let code = query.program.as_str();
            self.calls.lock().unwrap().push(code.to_string());
            if let Some(delay) = self.delays.get(code) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&code) {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "internal error".into(),
                });
            }
            let rows = self.rows.get(code).cloned().unwrap_or_default();
            Ok(rows
                .into_iter()
                .map(|(nature, unit, committed)| {
                    let mut record = ExpenditureRecord::new(query.year, query.program.clone())
                        .with_amounts(committed * 2.0, committed, committed, committed);
                    if query.detail.nature {
                        record = record.with_category(Dimension::Nature, Category::new(nature, nature));
                    }
                    if query.detail.source {
                        record = record.with_category(Dimension::Source, Category::new("1000", "Livres"));
                    }
                    if query.detail.unit {
                        record = record.with_category(Dimension::Unit, Category::new(unit, unit));
                    }
                    record
                })
                .collect())
        }
    }

    fn pipeline(provider: Arc<ScriptedProvider>, settings: PipelineSettings) -> Pipeline {
        let fetcher = Fetcher::new(provider, Arc::new(FetchCache::new()));
        Pipeline::new(ProgramRegistry::navy_strategic(), fetcher, settings)
    }

    fn year(pipeline: &Pipeline) -> FiscalYear {
        pipeline.check_year(2024).unwrap()
    }

    #[tokio::test]
    async fn committed_totals_sum_across_programs() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_rows("14T7", vec![("4", "52131", 60.0), ("3", "52131", 40.0)])
                .with_rows("123G", vec![("4", "52133", 50.0)]),
        );
        let pipeline = pipeline(provider, PipelineSettings::default());
        let report = pipeline
            .run(year(&pipeline), &Selection::explicit(["14T7", "123G"]))
            .await
            .unwrap();

        assert_eq!(report.totals.committed, 150.0);
        assert_eq!(report.totals.updated_appropriation, 300.0);
        assert_eq!(report.ratios.committed, Some(0.5));
        assert!(report.failures.is_empty());
        assert_eq!(report.dataset.len(), 3);
    }

    #[tokio::test]
    async fn failed_program_is_reported_and_skipped() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_rows("14T7", vec![("4", "52131", 100.0)])
                .failing("123G"),
        );
        let pipeline = pipeline(provider, PipelineSettings::default());
        let report = pipeline
            .run(year(&pipeline), &Selection::explicit(["14T7", "123G"]))
            .await
            .unwrap();

        assert!(report.dataset.rows.iter().all(|r| r.program.as_str() == "14T7"));
        assert_eq!(report.totals.committed, 100.0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failed_codes(), vec![&ProgramCode::new("123G")]);
        // Breakdowns still computed from the surviving program
        let nature = report.breakdown(Dimension::Nature).unwrap().as_ref().unwrap();
        assert_eq!(nature.rows[0].amount, 100.0);
    }

    #[tokio::test]
    async fn empty_selection_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new());
        let pipeline = pipeline(provider.clone(), PipelineSettings::default());
        let err = pipeline
            .run(year(&pipeline), &Selection::Explicit(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptySelection);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn select_all_fetches_every_registered_program() {
        let provider = Arc::new(ScriptedProvider::new());
        let pipeline = pipeline(provider.clone(), PipelineSettings::default());
        let report = pipeline
            .run(year(&pipeline), &Selection::SelectAll)
            .await
            .unwrap();
        assert_eq!(report.programs.len(), 5);
        assert_eq!(provider.call_count(), 5);
        assert!(!report.has_data());
    }

    #[tokio::test]
    async fn missing_dimension_only_fails_that_breakdown() {
        let provider = Arc::new(ScriptedProvider::new().with_rows("14T7", vec![("4", "52131", 10.0)]));
        let pipeline = pipeline(provider, PipelineSettings::default());
        let nature_only = DetailLevel::NONE.with(Dimension::Nature);
        let report = pipeline
            .run_with_detail(year(&pipeline), &Selection::explicit(["14T7"]), nature_only)
            .await
            .unwrap();

        assert_eq!(report.totals.committed, 10.0);
        assert!(report.breakdown(Dimension::Nature).unwrap().is_ok());
        assert_eq!(
            report.breakdown(Dimension::Unit).unwrap(),
            &Err(PipelineError::MissingDimension(Dimension::Unit))
        );
        assert!(report.breakdown(Dimension::Source).unwrap().is_err());
    }

    #[tokio::test]
    async fn repeated_batches_hit_the_cache() {
        let provider = Arc::new(ScriptedProvider::new().with_rows("14T7", vec![("4", "52131", 10.0)]));
        let pipeline = pipeline(provider.clone(), PipelineSettings::default());
        let selection = Selection::explicit(["14T7"]);

        pipeline.run(year(&pipeline), &selection).await.unwrap();
        pipeline.run(year(&pipeline), &selection).await.unwrap();
        assert_eq!(provider.call_count(), 1);

        // A different detail level is a different cache entry
        pipeline
            .run_with_detail(year(&pipeline), &selection, DetailLevel::NONE)
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(pipeline.cache().stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_keep_selection_order() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_rows("14T7", vec![("4", "U1", 1.0)])
                .with_rows("123G", vec![("4", "U2", 2.0)])
                .with_rows("123H", vec![("4", "U3", 3.0)])
                .delayed("14T7", Duration::from_millis(300))
                .delayed("123G", Duration::from_millis(100)),
        );
        let settings = PipelineSettings {
            max_concurrent_fetches: 3,
            ..PipelineSettings::default()
        };
        let pipeline = pipeline(provider, settings);
        let mut events = pipeline.events().subscribe();

        let report = pipeline
            .run(year(&pipeline), &Selection::explicit(["14T7", "123G", "123H"]))
            .await
            .unwrap();

        let order: Vec<&str> = report.dataset.rows.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(order, vec!["14T7", "123G", "123H"]);

        // Completion order differs from selection order, progress still counts up
        let mut completions = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PipelineEvent::FetchCompleted { code, completed, total, .. } = event.as_ref() {
                completions.push((code.to_string(), *completed, *total));
            }
        }
        assert_eq!(
            completions,
            vec![
                ("123H".to_string(), 1, 3),
                ("123G".to_string(), 2, 3),
                ("14T7".to_string(), 3, 3)
            ]
        );
    }

    #[tokio::test]
    async fn events_bracket_the_batch() {
        let provider = Arc::new(ScriptedProvider::new().failing("123G"));
        let pipeline = pipeline(provider, PipelineSettings::default());
        let mut events = pipeline.events().subscribe();

        pipeline
            .run(year(&pipeline), &Selection::explicit(["14T7", "123G"]))
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), 4);
        assert!(matches!(received[0].as_ref(), PipelineEvent::BatchStarted { programs: 2, .. }));
        assert!(matches!(received[1].as_ref(), PipelineEvent::FetchCompleted { completed: 1, .. }));
        assert!(matches!(received[2].as_ref(), PipelineEvent::FetchFailed { completed: 2, .. }));
        assert!(matches!(received[3].as_ref(), PipelineEvent::BatchFinished { failures: 1, .. }));
    }

    #[tokio::test]
    async fn top_n_setting_bounds_unit_breakdown() {
        let units: Vec<(&'static str, &'static str, f64)> = vec![
            ("4", "U01", 1.0), ("4", "U02", 2.0), ("4", "U03", 3.0), ("4", "U04", 4.0),
        ];
        let provider = Arc::new(ScriptedProvider::new().with_rows("14T7", units));
        let settings = PipelineSettings {
            top_n: 2,
            ..PipelineSettings::default()
        };
        let pipeline = pipeline(provider, settings);
        let report = pipeline
            .run(year(&pipeline), &Selection::explicit(["14T7"]))
            .await
            .unwrap();

        let unit = report.breakdown(Dimension::Unit).unwrap().as_ref().unwrap();
        let codes: Vec<&str> = unit.rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["U04", "U03"]);
        // Nature stays unbounded regardless of top_n
        let nature = report.breakdown(Dimension::Nature).unwrap().as_ref().unwrap();
        assert_eq!(nature.len(), 1);
    }

    #[test]
    fn settings_from_config() {
        let mut config = AppConfig::default();
        config.pipeline.max_concurrent_fetches = 4;
        config.pipeline.detail = vec![Dimension::Source];
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.max_concurrent_fetches, 4);
        assert_eq!(settings.detail, DetailLevel::NONE.with(Dimension::Source));
        assert_eq!(settings.limit_for(Dimension::Nature), None);
        assert_eq!(settings.limit_for(Dimension::Unit), Some(10));
    }
}
