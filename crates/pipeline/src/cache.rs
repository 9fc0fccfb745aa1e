//! In-memory fetch cache keyed by (year, program, detail level).
//!
//! Entries live for the process session unless a TTL is configured.
//! Population is first-writer-wins: when two fetches for the same key race,
//! the later insert is dropped and the earlier entry is returned.

use pacmon_core::{Dataset, DetailLevel, FiscalYear, ProgramCode};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub year: FiscalYear,
    pub code: ProgramCode,
    pub detail: DetailLevel,
}

impl CacheKey {
    pub fn new(year: FiscalYear, code: ProgramCode, detail: DetailLevel) -> Self {
        Self { year, code, detail }
    }
}

/// A cached provider answer. A failed fetch is stored as an empty dataset
/// together with the failure cause.
#[derive(Debug, Clone)]
pub struct CachedSlice {
    pub dataset: Arc<Dataset>,
    pub failure: Option<String>,
    stored_at: Instant,
}

impl CachedSlice {
    pub fn success(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
            failure: None,
            stored_at: Instant::now(),
        }
    }

    pub fn failed(detail: DetailLevel, cause: impl Into<String>) -> Self {
        Self {
            dataset: Arc::new(Dataset::empty(detail)),
            failure: Some(cause.into()),
            stored_at: Instant::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe memo of provider answers.
pub struct FetchCache {
    entries: RwLock<HashMap<CacheKey, CachedSlice>>,
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FetchCache {
    /// A session-lifetime cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(None, Arc::new(SystemClock))
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_fresh(&self, slice: &CachedSlice, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(slice.stored_at) < ttl,
            None => true,
        }
    }

    /// Look up a key. Expired entries count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<CachedSlice> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(slice) if self.is_fresh(slice, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(slice.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a slice unless a fresh entry already exists; returns whichever
    /// entry the cache now holds.
    pub fn insert(&self, key: CacheKey, mut slice: CachedSlice) -> CachedSlice {
        let now = self.clock.now();
        slice.stored_at = now;

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(&key).filter(|e| self.is_fresh(e, now)) {
            debug!(code = %key.code, year = key.year.value(), "Concurrent fetch lost the race; keeping first entry");
            return existing.clone();
        }
        entries.insert(key, slice.clone());
        slice
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    /// Drop every entry for one fiscal year; returns how many were removed.
    pub fn invalidate_year(&self, year: FiscalYear) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|key, _| key.year != year);
        let removed = before - entries.len();
        debug!(year = year.value(), removed, "Invalidated cached year");
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new()
    }
}
