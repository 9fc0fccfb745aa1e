//! Fetch-and-cache layer.
//!
//! Wraps an [`ExpenditureProvider`] with the [`FetchCache`] and a per-call
//! timeout. A fetch never fails from the caller's point of view: provider
//! errors come back as an empty dataset plus a
//! [`PipelineError::ProviderQueryFailed`] side-channel notification.

use pacmon_core::error::{PipelineError, ProviderError};
use pacmon_core::{Dataset, DetailLevel, ExpenditureProvider, ExpenditureQuery, FiscalYear, ProgramCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CachedSlice, FetchCache};

/// The result of fetching one (year, program, detail) slice.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub code: ProgramCode,
    pub dataset: Arc<Dataset>,
    /// Served from the cache without touching the provider
    pub cached: bool,
    pub failure: Option<PipelineError>,
}

pub struct Fetcher {
    provider: Arc<dyn ExpenditureProvider>,
    cache: Arc<FetchCache>,
    timeout: Duration,
    cache_failures: bool,
    include_descriptions: bool,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn ExpenditureProvider>, cache: Arc<FetchCache>) -> Self {
        Self {
            provider,
            cache,
            timeout: Duration::from_secs(60),
            cache_failures: true,
            include_descriptions: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_failures(mut self, cache_failures: bool) -> Self {
        self.cache_failures = cache_failures;
        self
    }

    pub fn with_descriptions(mut self, include_descriptions: bool) -> Self {
        self.include_descriptions = include_descriptions;
        self
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch one slice, consulting the cache first.
    pub async fn fetch(&self, year: FiscalYear, code: &ProgramCode, detail: DetailLevel) -> FetchOutcome {
        let key = CacheKey::new(year, code.clone(), detail);

        if let Some(slice) = self.cache.get(&key) {
            debug!(code = %code, year = year.value(), %detail, "Cache hit");
            return outcome(year, code, slice, true);
        }

        let mut query = ExpenditureQuery::new(year, code.clone(), detail);
        if !self.include_descriptions {
            query = query.without_descriptions();
        }

        let result = match tokio::time::timeout(self.timeout, self.provider.query(&query)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no answer from {} within {}s",
                self.provider.name(),
                self.timeout.as_secs()
            ))),
        };

        let slice = match result {
            Ok(rows) => {
                debug!(code = %code, year = year.value(), rows = rows.len(), "Fetched from provider");
                self.cache.insert(key, CachedSlice::success(Dataset::new(detail, rows)))
            }
            Err(e) => {
                warn!(code = %code, year = year.value(), error = %e, "Provider query failed");
                let failed = CachedSlice::failed(detail, e.to_string());
                if self.cache_failures {
                    self.cache.insert(key, failed)
                } else {
                    failed
                }
            }
        };

        outcome(year, code, slice, false)
    }
}

fn outcome(year: FiscalYear, code: &ProgramCode, slice: CachedSlice, cached: bool) -> FetchOutcome {
    let failure = slice.failure.map(|cause| PipelineError::ProviderQueryFailed {
        code: code.clone(),
        year,
        cause,
    });
    FetchOutcome {
        code: code.clone(),
        dataset: slice.dataset,
        cached,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pacmon_core::{Dimension, ExpenditureRecord, YearRange};
    use std::sync::Mutex;

    /// Counts calls; fails for codes listed in `failing`, sleeps for `slow`.
    struct CountingProvider {
        calls: Mutex<Vec<ExpenditureQuery>>,
        failing: Vec<&'static str>,
        slow: Option<Duration>,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing: Vec::new(),
                slow: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExpenditureProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn query(&self, query: &ExpenditureQuery) -> Result<Vec<ExpenditureRecord>, ProviderError> {
            self.calls.lock().unwrap().push(query.clone());
            if let Some(delay) = self.slow {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&query.program.as_str()) {
                return Err(ProviderError::Network("connection reset".into()));
            }
            let mut record = ExpenditureRecord::new(query.year, query.program.clone())
                .with_amounts(10.0, 5.0, 4.0, 3.0);
            for dimension in query.detail.dimensions() {
                record = record.with_category(dimension, pacmon_core::Category::new("1", "one"));
            }
            Ok(vec![record])
        }
    }

    fn year() -> FiscalYear {
        YearRange::default().check(2024).unwrap()
    }

    fn fetcher(provider: Arc<CountingProvider>) -> Fetcher {
        Fetcher::new(provider, Arc::new(FetchCache::new()))
    }

    #[tokio::test]
    async fn identical_requests_call_provider_once() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(provider.clone());
        let code = ProgramCode::new("14T7");

        let first = fetcher.fetch(year(), &code, DetailLevel::FULL).await;
        let second = fetcher.fetch(year(), &code, DetailLevel::FULL).await;

        assert_eq!(provider.calls(), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.dataset.rows, first.dataset.rows);
        assert!(second.failure.is_none());
    }

    #[tokio::test]
    async fn different_detail_levels_are_fetched_separately() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(provider.clone());
        let code = ProgramCode::new("14T7");

        let coarse = fetcher.fetch(year(), &code, DetailLevel::NONE).await;
        let fine = fetcher.fetch(year(), &code, DetailLevel::NONE.with(Dimension::Unit)).await;

        assert_eq!(provider.calls(), 2);
        assert!(!fine.cached);
        assert!(coarse.dataset.rows[0].unit.is_none());
        assert!(fine.dataset.rows[0].unit.is_some());
    }

    #[tokio::test]
    async fn failure_becomes_empty_dataset_and_notification() {
        let provider = Arc::new(CountingProvider {
            failing: vec!["123G"],
            ..CountingProvider::new()
        });
        let fetcher = fetcher(provider.clone());
        let code = ProgramCode::new("123G");

        let outcome = fetcher.fetch(year(), &code, DetailLevel::NONE).await;
        assert!(outcome.dataset.is_empty());
        match outcome.failure {
            Some(PipelineError::ProviderQueryFailed { code, year: y, cause }) => {
                assert_eq!(code.as_str(), "123G");
                assert_eq!(y, year());
                assert!(cause.contains("connection reset"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }

        // Cached failure: no second provider call, notification repeated
        let again = fetcher.fetch(year(), &code, DetailLevel::NONE).await;
        assert_eq!(provider.calls(), 1);
        assert!(again.cached);
        assert!(again.failure.is_some());
    }

    #[tokio::test]
    async fn failures_can_be_left_uncached() {
        let provider = Arc::new(CountingProvider {
            failing: vec!["123G"],
            ..CountingProvider::new()
        });
        let fetcher = fetcher(provider.clone()).with_cache_failures(false);
        let code = ProgramCode::new("123G");

        fetcher.fetch(year(), &code, DetailLevel::NONE).await;
        fetcher.fetch(year(), &code, DetailLevel::NONE).await;
        assert_eq!(provider.calls(), 2);
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_query_failure() {
        let provider = Arc::new(CountingProvider {
            slow: Some(Duration::from_secs(120)),
            ..CountingProvider::new()
        });
        let fetcher = fetcher(provider).with_timeout(Duration::from_secs(5));

        let outcome = fetcher.fetch(year(), &ProgramCode::new("14T7"), DetailLevel::NONE).await;
        assert!(outcome.dataset.is_empty());
        let failure = outcome.failure.unwrap();
        assert!(failure.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn descriptions_flag_reaches_provider() {
        let provider = Arc::new(CountingProvider::new());
        let fetcher = fetcher(provider.clone()).with_descriptions(false);
        fetcher.fetch(year(), &ProgramCode::new("1N47"), DetailLevel::NONE).await;
        assert!(!provider.calls.lock().unwrap()[0].include_descriptions);
        assert_eq!(fetcher.provider_name(), "counting");
    }
}
