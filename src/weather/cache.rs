//! Per-task weather cache with a staleness-driven refresh policy.
//!
//! Each task id moves through `Empty -> Loading -> Loaded | Failed`, and back to
//! `Loading` when its reading goes stale. Fetches run as independent tokio
//! tasks; a fetch only ever writes the entry it was issued for, and only if
//! that entry has not been evicted or re-requested in the meantime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::WeatherConfig;
use crate::error::{FetchError, WeatherError};
use crate::task::TaskId;
use crate::weather::provider::WeatherProvider;
use crate::weather::snapshot::WeatherSnapshot;

/// Source of "now" for stamping completed fetches.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Where a cache entry is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherState {
    Empty,
    Loading,
    Loaded,
    Failed,
}

/// Cached weather for one task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherEntry {
    pub data: Option<WeatherSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When the in-flight fetch was started.
    pub loading_since: Option<DateTime<Utc>>,
    generation: u64,
}

impl WeatherEntry {
    pub fn state(&self) -> WeatherState {
        if self.loading {
            WeatherState::Loading
        } else if self.error.is_some() {
            WeatherState::Failed
        } else if self.data.is_some() {
            WeatherState::Loaded
        } else {
            WeatherState::Empty
        }
    }
}

/// When an entry should be fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub stale_after: chrono::Duration,
    pub retry_failed_after: chrono::Duration,
    /// A load older than this was abandoned and may be started again.
    pub abandon_after: chrono::Duration,
}

impl RefreshPolicy {
    pub fn from_config(config: &WeatherConfig) -> Self {
        Self {
            stale_after: config.stale_after,
            retry_failed_after: config.retry_failed_after,
            abandon_after: chrono::Duration::from_std(config.timeout).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// In-flight entries need no second fetch until they outlive the fetch
    /// timeout, which a live fetch never does.
    pub fn needs_fetch(&self, entry: &WeatherEntry, now: DateTime<Utc>) -> bool {
        if entry.loading {
            return entry
                .loading_since
                .map_or(true, |since| now - since > self.abandon_after);
        }
        let Some(last) = entry.last_fetched_at else {
            return true;
        };
        let threshold = match entry.state() {
            WeatherState::Failed => self.retry_failed_after,
            _ => self.stale_after,
        };
        now - last >= threshold
    }
}

#[derive(Default)]
struct Entries {
    by_task: HashMap<TaskId, WeatherEntry>,
    last_generation: u64,
}

/// Shared handle to the weather cache. Clones see the same entries.
#[derive(Clone)]
pub struct WeatherCache {
    entries: Arc<Mutex<Entries>>,
    provider: Arc<dyn WeatherProvider>,
    policy: RefreshPolicy,
    timeout: Duration,
    clock: Clock,
    runtime: Handle,
}

impl WeatherCache {
    /// Create a cache whose fetches run on `runtime`.
    pub fn new(provider: Arc<dyn WeatherProvider>, config: &WeatherConfig, runtime: Handle) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries::default())),
            provider,
            policy: RefreshPolicy::from_config(config),
            timeout: config.timeout,
            clock: Arc::new(Utc::now),
            runtime,
        }
    }

    /// Replace the clock used to stamp finished fetches.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Start a fetch for `task_id` if its entry is empty or stale.
    ///
    /// Returns the handle of the spawned fetch, or `None` when the entry is
    /// fresh or a fetch is already in flight.
    pub fn ensure_fresh(
        &self,
        task_id: TaskId,
        location: &str,
        now: DateTime<Utc>,
    ) -> Option<JoinHandle<()>> {
        let generation = {
            let mut entries = self.entries.lock();
            let needed = entries
                .by_task
                .get(&task_id)
                .map_or(true, |entry| self.policy.needs_fetch(entry, now));
            if !needed {
                return None;
            }
            entries.last_generation += 1;
            let generation = entries.last_generation;
            let entry = entries.by_task.entry(task_id).or_default();
            if entry.loading {
                tracing::warn!(task_id = %task_id, "restarting abandoned weather fetch");
            }
            entry.loading = true;
            entry.loading_since = Some(now);
            entry.error = None;
            entry.generation = generation;
            generation
        };

        tracing::info!(task_id = %task_id, location, provider = self.provider.name(), "fetching weather");
        Some(self.spawn_fetch(task_id, location.to_string(), generation))
    }

    /// `ensure_fresh` for each `(id, location)`; returns the fetches started.
    pub fn refresh_all(&self, targets: &[(TaskId, String)], now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        targets
            .iter()
            .filter_map(|(id, location)| self.ensure_fresh(*id, location, now))
            .collect()
    }

    fn spawn_fetch(&self, task_id: TaskId, location: String, generation: u64) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let provider = Arc::clone(&self.provider);
        let clock = Arc::clone(&self.clock);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, provider.fetch(&location)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout.as_millis() as u64)),
            };
            let finished_at = clock();

            let mut entries = entries.lock();
            let Some(entry) = entries
                .by_task
                .get_mut(&task_id)
                .filter(|entry| entry.generation == generation)
            else {
                tracing::debug!(task_id = %task_id, "discarding weather result for evicted or superseded entry");
                return;
            };

            entry.loading = false;
            entry.loading_since = None;
            entry.last_fetched_at = Some(finished_at);
            match outcome {
                Ok(snapshot) => {
                    tracing::info!(task_id = %task_id, temperature = snapshot.temperature, "weather loaded");
                    entry.data = Some(snapshot);
                    entry.error = None;
                }
                Err(error) => {
                    let failure = WeatherError::fetch_failed(task_id, &error);
                    tracing::warn!(task_id = %task_id, %error, "weather fetch failed");
                    entry.data = None;
                    entry.error = Some(failure.to_string());
                }
            }
        })
    }

    /// Copy of the entry for `task_id`, if any.
    pub fn entry(&self, task_id: TaskId) -> Option<WeatherEntry> {
        self.entries.lock().by_task.get(&task_id).cloned()
    }

    pub fn state(&self, task_id: TaskId) -> WeatherState {
        self.entries
            .lock()
            .by_task
            .get(&task_id)
            .map_or(WeatherState::Empty, WeatherEntry::state)
    }

    /// Forget everything about `task_id`. A fetch still in flight for it is
    /// discarded when it resolves.
    pub fn evict(&self, task_id: TaskId) -> bool {
        let removed = self.entries.lock().by_task.remove(&task_id).is_some();
        if removed {
            tracing::debug!(task_id = %task_id, "weather entry evicted");
        }
        removed
    }

    pub fn evict_all(&self) {
        self.entries.lock().by_task.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_task.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    type Respond = Box<dyn Fn(usize, &str) -> Result<WeatherSnapshot, FetchError> + Send + Sync>;

    /// Answers from a closure; the first call can be held until the gate opens.
    struct FakeProvider {
        calls: AtomicUsize,
        hold_first: Option<Arc<Semaphore>>,
        respond: Respond,
    }

    impl FakeProvider {
        fn new(respond: Respond) -> Self {
            Self { calls: AtomicUsize::new(0), hold_first: None, respond }
        }

        fn held(respond: Respond) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let provider = Self { hold_first: Some(Arc::clone(&gate)), ..Self::new(respond) };
            (provider, gate)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if let Some(gate) = &self.hold_first {
                    let _permit = gate.acquire().await.map_err(|e| FetchError::Transport(e.to_string()))?;
                }
            }
            (self.respond)(call, location)
        }
    }

    fn snapshot(temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: temp,
            humidity: 60,
            wind_speed: 4.0,
            condition_code: 800,
            description: "clear sky".into(),
        }
    }

    fn sunny() -> Respond {
        Box::new(|_, _| Ok(snapshot(21.0)))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T09:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn cache_with(provider: Arc<FakeProvider>, config: &WeatherConfig) -> WeatherCache {
        WeatherCache::new(provider, config, Handle::current()).with_clock(Arc::new(t0))
    }

    async fn wait_for_calls(provider: &FakeProvider, n: usize) {
        while provider.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn first_fetch_loads_entry() {
        let provider = Arc::new(FakeProvider::new(sunny()));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());
        assert_eq!(cache.state(TaskId(1)), WeatherState::Empty);

        cache.ensure_fresh(TaskId(1), "Paris", t0()).unwrap().await.unwrap();

        let entry = cache.entry(TaskId(1)).unwrap();
        assert_eq!(entry.state(), WeatherState::Loaded);
        assert_eq!(entry.data, Some(snapshot(21.0)));
        assert_eq!(entry.last_fetched_at, Some(t0()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_are_coalesced() {
        let (provider, gate) = FakeProvider::held(sunny());
        let provider = Arc::new(provider);
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        let first = cache.ensure_fresh(TaskId(1), "Paris", t0());
        assert!(first.is_some());
        assert_eq!(cache.state(TaskId(1)), WeatherState::Loading);
        assert!(cache.ensure_fresh(TaskId(1), "Paris", t0()).is_none());

        gate.add_permits(1);
        first.unwrap().await.unwrap();
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.state(TaskId(1)), WeatherState::Loaded);
    }

    #[tokio::test]
    async fn server_error_marks_entry_failed_until_retry_window() {
        let provider = Arc::new(FakeProvider::new(Box::new(|_, _| Err(FetchError::Status(500)))));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        cache.ensure_fresh(TaskId(5), "Paris", t0()).unwrap().await.unwrap();
        let entry = cache.entry(TaskId(5)).unwrap();
        assert_eq!(entry.state(), WeatherState::Failed);
        assert!(entry.error.as_deref().unwrap().contains("HTTP 500"));
        assert_eq!(entry.data, None);

        assert!(cache
            .ensure_fresh(TaskId(5), "Paris", t0() + chrono::Duration::minutes(29))
            .is_none());
        assert_eq!(provider.calls(), 1);

        assert!(cache
            .ensure_fresh(TaskId(5), "Paris", t0() + chrono::Duration::minutes(30))
            .is_some());
    }

    #[tokio::test]
    async fn failure_discards_previous_reading() {
        let provider = Arc::new(FakeProvider::new(Box::new(|call, _| {
            if call == 0 {
                Ok(snapshot(12.0))
            } else {
                Err(FetchError::Transport("connection reset".into()))
            }
        })));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        cache.ensure_fresh(TaskId(1), "Oslo", t0()).unwrap().await.unwrap();
        let later = t0() + chrono::Duration::minutes(31);
        cache.ensure_fresh(TaskId(1), "Oslo", later).unwrap().await.unwrap();

        let entry = cache.entry(TaskId(1)).unwrap();
        assert_eq!(entry.state(), WeatherState::Failed);
        assert_eq!(entry.data, None);
    }

    #[tokio::test]
    async fn stale_entry_refreshes_and_keeps_data_while_loading() {
        let provider = Arc::new(FakeProvider::new(Box::new(|call, _| Ok(snapshot(10.0 + call as f64)))));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        cache.ensure_fresh(TaskId(1), "Rome", t0()).unwrap().await.unwrap();
        assert!(cache
            .ensure_fresh(TaskId(1), "Rome", t0() + chrono::Duration::minutes(10))
            .is_none());

        let refresh = cache
            .ensure_fresh(TaskId(1), "Rome", t0() + chrono::Duration::minutes(30))
            .unwrap();
        let during = cache.entry(TaskId(1)).unwrap();
        assert!(during.loading);
        assert_eq!(during.data, Some(snapshot(10.0)));

        refresh.await.unwrap();
        assert_eq!(cache.entry(TaskId(1)).unwrap().data, Some(snapshot(11.0)));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_task() {
        let provider = Arc::new(FakeProvider::new(Box::new(|_, location| {
            if location == "Atlantis" {
                Err(FetchError::Status(404))
            } else {
                Ok(snapshot(25.0))
            }
        })));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        let targets = vec![(TaskId(1), "Atlantis".to_string()), (TaskId(2), "Lisbon".to_string())];
        let handles = cache.refresh_all(&targets, t0());
        assert_eq!(handles.len(), 2);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.state(TaskId(1)), WeatherState::Failed);
        assert_eq!(cache.state(TaskId(2)), WeatherState::Loaded);
    }

    #[tokio::test]
    async fn result_for_evicted_entry_is_dropped() {
        let (provider, gate) = FakeProvider::held(sunny());
        let provider = Arc::new(provider);
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        let handle = cache.ensure_fresh(TaskId(9), "Paris", t0()).unwrap();
        assert!(cache.evict(TaskId(9)));
        gate.add_permits(1);
        handle.await.unwrap();

        assert!(cache.entry(TaskId(9)).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn superseded_fetch_cannot_overwrite_newer_one() {
        let (provider, gate) = FakeProvider::held(Box::new(|call, _| {
            if call == 0 {
                Err(FetchError::Status(503))
            } else {
                Ok(snapshot(18.0))
            }
        }));
        let provider = Arc::new(provider);
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        let old = cache.ensure_fresh(TaskId(3), "Berlin", t0()).unwrap();
        wait_for_calls(&provider, 1).await;
        cache.evict(TaskId(3));
        let new = cache.ensure_fresh(TaskId(3), "Berlin", t0()).unwrap();
        new.await.unwrap();
        assert_eq!(cache.state(TaskId(3)), WeatherState::Loaded);

        gate.add_permits(1);
        old.await.unwrap();
        assert_eq!(cache.state(TaskId(3)), WeatherState::Loaded);
        assert_eq!(cache.entry(TaskId(3)).unwrap().data, Some(snapshot(18.0)));
    }

    #[tokio::test]
    async fn abandoned_fetch_can_be_restarted_after_timeout() {
        let (provider, _gate) = FakeProvider::held(sunny());
        let provider = Arc::new(provider);
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());

        let stuck = cache.ensure_fresh(TaskId(4), "Oslo", t0()).unwrap();
        wait_for_calls(&provider, 1).await;
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert_eq!(cache.state(TaskId(4)), WeatherState::Loading);
        assert_eq!(cache.entry(TaskId(4)).unwrap().loading_since, Some(t0()));

        let within = t0() + chrono::Duration::seconds(10);
        assert!(cache.ensure_fresh(TaskId(4), "Oslo", within).is_none());

        let later = t0() + chrono::Duration::seconds(11);
        cache.ensure_fresh(TaskId(4), "Oslo", later).unwrap().await.unwrap();
        let entry = cache.entry(TaskId(4)).unwrap();
        assert_eq!(entry.state(), WeatherState::Loaded);
        assert_eq!(entry.loading_since, None);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_as_failure() {
        let (provider, _gate) = FakeProvider::held(sunny());
        let config = WeatherConfig {
            timeout: Duration::from_millis(50),
            ..WeatherConfig::default()
        };
        let cache = cache_with(Arc::new(provider), &config);

        cache.ensure_fresh(TaskId(1), "Paris", t0()).unwrap().await.unwrap();
        let entry = cache.entry(TaskId(1)).unwrap();
        assert_eq!(entry.state(), WeatherState::Failed);
        assert!(entry.error.unwrap().contains("timed out after 50ms"));
    }

    #[tokio::test]
    async fn shorter_retry_applies_only_to_failures() {
        let provider = Arc::new(FakeProvider::new(Box::new(|_, location| {
            if location == "bad" {
                Err(FetchError::Status(500))
            } else {
                Ok(snapshot(5.0))
            }
        })));
        let config = WeatherConfig {
            retry_failed_after: chrono::Duration::minutes(5),
            ..WeatherConfig::default()
        };
        let cache = cache_with(Arc::clone(&provider), &config);

        cache.ensure_fresh(TaskId(1), "bad", t0()).unwrap().await.unwrap();
        cache.ensure_fresh(TaskId(2), "good", t0()).unwrap().await.unwrap();

        let later = t0() + chrono::Duration::minutes(5);
        assert!(cache.ensure_fresh(TaskId(1), "bad", later).is_some());
        assert!(cache.ensure_fresh(TaskId(2), "good", later).is_none());
    }

    #[tokio::test]
    async fn evict_and_evict_all_drop_entries() {
        let provider = Arc::new(FakeProvider::new(sunny()));
        let cache = cache_with(Arc::clone(&provider), &WeatherConfig::default());
        for id in 1..=3 {
            cache.ensure_fresh(TaskId(id), "Paris", t0()).unwrap().await.unwrap();
        }

        assert!(cache.evict(TaskId(2)));
        assert!(!cache.evict(TaskId(2)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.state(TaskId(2)), WeatherState::Empty);

        cache.evict_all();
        assert!(cache.is_empty());
    }
}
