//! The catch-up digest.
//!
//! [`DigestService`] decides what to fetch from the last visit, asks the
//! configured backend for a summary and keeps the latest result in a single
//! slot. The slot stays locked for the whole of a call, so the freshness
//! check and the write that follows it cannot interleave with another call.

mod prompt;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::app::{CatchupError, Result};
use crate::config::DigestConfig;
use crate::domain::CatchUpSummary;
use crate::fetcher::HierarchicalFetcher;
use crate::llm::{filter, GenerationService, LlmConfig};
use crate::visit::VisitTracker;

pub use prompt::build_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSettings {
    pub freshness_window: Duration,
    pub min_interval: Duration,
    pub story_limit: usize,
    pub prompt_story_limit: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self::from(&DigestConfig::default())
    }
}

impl From<&DigestConfig> for DigestSettings {
    fn from(config: &DigestConfig) -> Self {
        Self {
            freshness_window: to_delta(config.freshness_window()),
            min_interval: to_delta(config.min_interval()),
            story_limit: config.story_limit,
            prompt_story_limit: config.prompt_story_limit,
        }
    }
}

/// Out-of-range values saturate at the largest representable delta.
fn to_delta(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}

pub struct DigestService {
    fetcher: Arc<HierarchicalFetcher>,
    visits: Arc<VisitTracker>,
    generator: Arc<GenerationService>,
    llm: LlmConfig,
    settings: DigestSettings,
    cache: Mutex<Option<CatchUpSummary>>,
}

impl DigestService {
    pub fn new(
        fetcher: Arc<HierarchicalFetcher>,
        visits: Arc<VisitTracker>,
        generator: Arc<GenerationService>,
        llm: LlmConfig,
        settings: DigestSettings,
    ) -> Self {
        Self {
            fetcher,
            visits,
            generator,
            llm,
            settings,
            cache: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &DigestSettings {
        &self.settings
    }

    /// Produce the catch-up digest.
    ///
    /// A digest younger than the freshness window is returned as is unless
    /// `force_regenerate` is set. A visit within the minimum interval yields
    /// an "all caught up" digest unless `bypass_recency_check` is set. Errors
    /// from fetching or generation leave the cache as it was.
    pub async fn generate_digest(
        &self,
        force_regenerate: bool,
        bypass_recency_check: bool,
    ) -> Result<CatchUpSummary> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();

        if force_regenerate {
            *cache = None;
        } else if let Some(cached) = cache.as_ref() {
            if now.signed_duration_since(cached.generated_at) < self.settings.freshness_window {
                tracing::debug!("Returning cached digest from {}", cached.generated_at);
                return Ok(cached.clone());
            }
        }

        let visit = self.visits.snapshot().await?;

        if !bypass_recency_check {
            if let Some(last_visit) = visit.last_visit {
                if now.signed_duration_since(last_visit) < self.settings.min_interval {
                    tracing::info!("Last visit was {}, all caught up", visit.description);
                    let summary = CatchUpSummary::all_caught_up(last_visit, visit.description);
                    *cache = Some(summary.clone());
                    return Ok(summary);
                }
            }
        }

        let stories = self
            .fetcher
            .fetch_stories_since(visit.last_visit, self.settings.story_limit)
            .await?;
        if stories.is_empty() {
            return Err(CatchupError::NoStoriesAvailable);
        }

        let has_new_stories = has_new_stories(&stories, visit.last_visit);
        let prompt = build_prompt(
            &stories,
            visit.last_visit,
            &visit.description,
            has_new_stories,
            self.settings.prompt_story_limit,
            now,
        );

        let raw = self.generator.generate(&prompt, &self.llm).await?;
        let text = filter::filter(&raw);

        let summary = CatchUpSummary {
            summary: Some(text),
            story_count: stories.len(),
            last_visit: visit.last_visit,
            time_since_last_visit: visit.description,
            has_new_stories,
            is_all_caught_up: false,
            generated_at: Utc::now(),
            stories,
        };
        tracing::info!(
            "Generated digest from {} stories (new since last visit: {})",
            summary.story_count,
            summary.has_new_stories
        );

        *cache = Some(summary.clone());
        Ok(summary)
    }

    /// Record a visit now and drop the cached digest. Safe to repeat.
    pub async fn mark_as_read(&self) -> Result<DateTime<Utc>> {
        let mut cache = self.cache.lock().await;
        let visited = self.visits.update_last_visit().await?;
        *cache = None;
        Ok(visited)
    }

    pub async fn clear_cache(&self) {
        *self.cache.lock().await = None;
    }

    pub async fn cached(&self) -> Option<CatchUpSummary> {
        self.cache.lock().await.clone()
    }

    pub fn subscribe_download_progress(&self) -> watch::Receiver<f64> {
        self.generator.subscribe_download_progress()
    }

    pub fn on_download_progress<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(f64) + Send + 'static,
    {
        self.generator.on_download_progress(callback)
    }
}

/// True on a first visit, or when any story postdates the last visit.
fn has_new_stories(stories: &[crate::domain::Story], last_visit: Option<DateTime<Utc>>) -> bool {
    match last_visit {
        None => true,
        Some(last_visit) => stories.iter().any(|story| story.posted_at() > last_visit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use reqwest::Client;
    use tokio_test::{assert_err, assert_ok};

    use crate::llm::{GenerationBackend, LlmError, LocalModelBackend, LocalRuntimeConfig, Provider};
    use crate::source::testing::MemorySource;
    use crate::store::SqliteStore;

    struct Scripted {
        reply: std::result::Result<&'static str, &'static str>,
        calls: AtomicUsize,
        prompts: StdMutex<Vec<String>>,
    }

    impl Scripted {
        fn replying(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                calls: AtomicUsize::new(0),
                prompts: StdMutex::new(Vec::new()),
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message),
                calls: AtomicUsize::new(0),
                prompts: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> std::result::Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(message) => Err(LlmError::Unavailable(message.to_string())),
            }
        }
    }

    struct Harness {
        service: DigestService,
        source: Arc<MemorySource>,
        visits: Arc<VisitTracker>,
        backend: Arc<Scripted>,
    }

    fn harness(source: MemorySource, backend: Arc<Scripted>, settings: DigestSettings) -> Harness {
        let source = Arc::new(source);
        let fetcher = Arc::new(HierarchicalFetcher::new(source.clone()));
        let visits = Arc::new(VisitTracker::new(Arc::new(SqliteStore::in_memory().unwrap())));
        let client = Client::new();
        let local = Arc::new(LocalModelBackend::from_config(
            client.clone(),
            &LocalRuntimeConfig::default(),
        ));
        let generator = Arc::new(
            GenerationService::with_parts(client, local)
                .with_backend(Provider::OnDevice, backend.clone()),
        );

        let service = DigestService::new(
            fetcher,
            visits.clone(),
            generator,
            LlmConfig::default(),
            settings,
        );
        Harness {
            service,
            source,
            visits,
            backend,
        }
    }

    /// Three top stories posted two hours ago.
    fn three_stories() -> MemorySource {
        let posted = Utc::now() - Duration::hours(2);
        MemorySource::new()
            .with_top(vec![1, 2, 3])
            .with_story(1, 100, posted)
            .with_story(2, 50, posted)
            .with_story(3, 10, posted)
    }

    #[tokio::test]
    async fn test_first_visit_generates_digest() {
        let h = harness(three_stories(), Scripted::replying("Welcome!"), DigestSettings::default());

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert_eq!(summary.summary.as_deref(), Some("Welcome!"));
        assert_eq!(summary.story_count, 3);
        assert!(summary.has_new_stories);
        assert!(!summary.is_all_caught_up);
        assert!(summary.is_first_visit());
        assert_eq!(summary.time_since_last_visit, crate::visit::FIRST_VISIT);
        assert!(h.backend.last_prompt().contains("first time using the app"));
        assert_eq!(h.service.cached().await, Some(summary));
    }

    #[tokio::test]
    async fn test_cached_digest_is_reused() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());

        let first = assert_ok!(h.service.generate_digest(false, false).await);
        let second = assert_ok!(h.service.generate_digest(false, false).await);

        assert_eq!(first, second);
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(h.backend.calls(), 1);
        assert_eq!(h.source.list_requests(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_regenerates() {
        let settings = DigestSettings {
            freshness_window: Duration::zero(),
            ..DigestSettings::default()
        };
        let h = harness(three_stories(), Scripted::replying("digest"), settings);

        assert_ok!(h.service.generate_digest(false, false).await);
        assert_ok!(h.service.generate_digest(false, false).await);

        assert_eq!(h.backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_force_regenerate_skips_cache() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());

        assert_ok!(h.service.generate_digest(false, false).await);
        assert_ok!(h.service.generate_digest(true, false).await);

        assert_eq!(h.backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_recent_visit_is_all_caught_up() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());
        let visited = Utc::now() - Duration::minutes(10);
        h.visits.record_visit_at(visited).await.unwrap();

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert!(summary.is_all_caught_up);
        assert_eq!(summary.summary, None);
        assert_eq!(summary.last_visit, Some(visited));
        assert_eq!(summary.time_since_last_visit, "10 minutes ago");
        assert_eq!(h.source.list_requests(), 0);
        assert_eq!(h.source.item_requests(), 0);
        assert_eq!(h.backend.calls(), 0);
        assert_eq!(h.service.cached().await, Some(summary));
    }

    #[tokio::test]
    async fn test_bypass_with_nothing_new_uses_trending_prompt() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());
        h.visits
            .record_visit_at(Utc::now() - Duration::minutes(10))
            .await
            .unwrap();

        let summary = assert_ok!(h.service.generate_digest(false, true).await);

        // every story predates the visit, so the top stories are used as is
        assert_eq!(summary.story_count, 3);
        assert!(!summary.has_new_stories);
        assert!(h.backend.last_prompt().contains("no major new stories"));
    }

    #[tokio::test]
    async fn test_new_stories_since_last_visit() {
        let now = Utc::now();
        let source = MemorySource::new()
            .with_top(vec![1, 2, 3])
            .with_story(1, 100, now - Duration::hours(5))
            .with_story(2, 50, now - Duration::minutes(30))
            .with_story(3, 10, now - Duration::minutes(20));
        let h = harness(source, Scripted::replying("digest"), DigestSettings::default());
        h.visits
            .record_visit_at(now - Duration::hours(1))
            .await
            .unwrap();

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert!(summary.has_new_stories);
        let ids: Vec<i64> = summary.stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(h.backend.last_prompt().contains("Summarize what they missed."));
    }

    #[tokio::test]
    async fn test_mark_as_read_clears_cache_and_rechecks_recency() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());

        let first = assert_ok!(h.service.generate_digest(false, false).await);
        assert!(!first.is_all_caught_up);

        assert_ok!(h.service.mark_as_read().await);
        assert_ok!(h.service.mark_as_read().await);

        let next = assert_ok!(h.service.generate_digest(false, false).await);
        assert_ne!(next, first);
        assert!(next.is_all_caught_up);
        assert_eq!(h.backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_stories_available() {
        let h = harness(
            MemorySource::new().with_top(vec![]),
            Scripted::replying("digest"),
            DigestSettings::default(),
        );

        let err = assert_err!(h.service.generate_digest(false, false).await);

        assert!(matches!(err, CatchupError::NoStoriesAvailable));
        assert_eq!(h.service.cached().await, None);
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_cache_untouched() {
        let h = harness(three_stories(), Scripted::failing("daemon down"), DigestSettings::default());

        let err = assert_err!(h.service.generate_digest(false, false).await);

        assert!(matches!(err, CatchupError::Llm(LlmError::Unavailable(_))));
        assert_eq!(h.service.cached().await, None);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let h = harness(
            three_stories().with_failure(2),
            Scripted::replying("digest"),
            DigestSettings::default(),
        );

        let err = assert_err!(h.service.generate_digest(false, false).await);

        assert!(matches!(err, CatchupError::Io(_)));
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_output_is_sanitized() {
        let h = harness(
            three_stories(),
            Scripted::replying("<think>plan the answer</think>\n<summary>\nSince you've been away...\n</summary>"),
            DigestSettings::default(),
        );

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert_eq!(summary.summary.as_deref(), Some("Since you've been away..."));
    }

    #[tokio::test]
    async fn test_prompt_story_limit() {
        let posted = Utc::now() - Duration::hours(1);
        let mut source = MemorySource::new().with_top((1..=5).collect());
        for id in 1..=5 {
            source = source.with_story(id, id, posted);
        }
        let settings = DigestSettings {
            prompt_story_limit: 2,
            ..DigestSettings::default()
        };
        let h = harness(source, Scripted::replying("digest"), settings);

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert_eq!(summary.story_count, 5);
        let prompt = h.backend.last_prompt();
        assert!(prompt.contains("2. [Score: 2"));
        assert!(!prompt.contains("3. [Score: 3"));
    }

    #[tokio::test]
    async fn test_clear_cache_keeps_visit() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());

        assert_ok!(h.service.generate_digest(false, false).await);
        h.service.clear_cache().await;

        assert_eq!(h.service.cached().await, None);
        assert_eq!(h.visits.last_visit().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_generation() {
        let h = harness(three_stories(), Scripted::replying("digest"), DigestSettings::default());

        let (first, second) = tokio::join!(
            h.service.generate_digest(false, false),
            h.service.generate_digest(false, false)
        );

        let first = assert_ok!(first);
        let second = assert_ok!(second);
        assert_eq!(first, second);
        assert_eq!(h.backend.calls(), 1);
        assert_eq!(h.source.list_requests(), 1);
    }

    #[test]
    fn test_oversized_intervals_saturate() {
        let config = DigestConfig {
            freshness_window_secs: 10_000_000_000_000_000,
            min_interval_secs: u64::MAX,
            ..DigestConfig::default()
        };

        let settings = DigestSettings::from(&config);

        assert_eq!(settings.freshness_window, Duration::MAX);
        assert_eq!(settings.min_interval, Duration::MAX);
        assert!(settings.min_interval > Duration::zero());
    }

    #[tokio::test]
    async fn test_huge_min_interval_still_reports_caught_up() {
        let settings = DigestSettings::from(&DigestConfig {
            min_interval_secs: u64::MAX,
            ..DigestConfig::default()
        });
        let h = harness(three_stories(), Scripted::replying("digest"), settings);
        h.visits
            .record_visit_at(Utc::now() - Duration::days(365))
            .await
            .unwrap();

        let summary = assert_ok!(h.service.generate_digest(false, false).await);

        assert!(summary.is_all_caught_up);
        assert_eq!(h.backend.calls(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = DigestSettings::from(&DigestConfig::default());
        assert_eq!(settings.freshness_window, Duration::minutes(5));
        assert_eq!(settings.min_interval, Duration::minutes(30));
        assert_eq!(settings.story_limit, 50);
        assert_eq!(settings.prompt_story_limit, 30);
    }
}
