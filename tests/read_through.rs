use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, json};
use time::{Duration, OffsetDateTime};
use tokio::sync::{Barrier, Mutex};

use kura::application::error::AppError;
use kura::application::provider::{Document, Provider, ProviderError};
use kura::application::service::{CacheStatus, FetchCache};
use kura::application::store::CacheStore;
use kura::cache::{FreshnessWindows, fingerprint};
use kura::config::FreshnessSettings;
use kura::domain::entities::CacheRecord;
use kura::domain::request::RequestKey;
use kura::domain::types::{Medium, StatusFilter};
use kura::infra::memory::MemoryStore;

/// Provider stub that pops pre-scripted responses and counts calls.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<Document, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<Document, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn fetch(&self, _key: &RequestKey) -> Result<Document, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().await;
        assert!(!responses.is_empty(), "provider called more often than scripted");
        responses.remove(0)
    }
}

/// Provider stub that holds every caller at a barrier so all of them are
/// forced through the miss path before any write lands.
struct BarrierProvider {
    document: Document,
    barrier: Barrier,
    calls: AtomicUsize,
}

impl BarrierProvider {
    fn new(document: Document, parties: usize) -> Self {
        Self {
            document,
            barrier: Barrier::new(parties),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for BarrierProvider {
    async fn fetch(&self, _key: &RequestKey) -> Result<Document, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.barrier.wait().await;
        Ok(self.document.clone())
    }
}

fn document(label: &str) -> Document {
    let mut doc = Map::new();
    doc.insert("data".to_string(), json!({ "label": label }));
    doc
}

fn short_profile_windows() -> FreshnessWindows {
    FreshnessWindows::from(&FreshnessSettings {
        profile_ttl_secs: 60,
        ..FreshnessSettings::default()
    })
}

#[tokio::test]
async fn first_read_fetches_and_caches() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(document("aiko"))]));
    let service = FetchCache::new(store.clone(), provider.clone(), FreshnessWindows::default());

    let key = RequestKey::profile("aiko");
    let outcome = service.fetch_or_cache(&key).await.expect("first read succeeds");

    assert_eq!(outcome.status, CacheStatus::Miss);
    assert_eq!(outcome.record.payload, document("aiko"));
    assert_eq!(provider.calls(), 1);

    let stored = store
        .lookup(key.kind, &fingerprint(&key))
        .await
        .expect("store reachable")
        .expect("record persisted");
    assert_eq!(stored.payload, document("aiko"));
    assert_eq!(
        stored.created_at, stored.modified_at,
        "a first write leaves both timestamps equal"
    );
}

#[tokio::test]
async fn second_read_is_served_without_provider() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(document("aiko"))]));
    let service = FetchCache::new(store.clone(), provider.clone(), FreshnessWindows::default());

    let key = RequestKey::profile("aiko");
    let first = service.fetch_or_cache(&key).await.expect("first read succeeds");
    let second = service.fetch_or_cache(&key).await.expect("second read succeeds");

    assert_eq!(provider.calls(), 1);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(second.record.modified_at, first.record.modified_at);
    assert_eq!(second.record.payload, first.record.payload);
}

#[tokio::test]
async fn missing_subject_is_never_cached() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(ProviderError::NotFound),
        Err(ProviderError::NotFound),
    ]));
    let service = FetchCache::new(store.clone(), provider.clone(), FreshnessWindows::default());

    let key = RequestKey::profile("ghost");
    let error = service.fetch_or_cache(&key).await.expect_err("missing subject fails");
    assert!(matches!(error, AppError::NotFound));
    assert!(
        store
            .lookup(key.kind, &fingerprint(&key))
            .await
            .expect("store reachable")
            .is_none(),
        "a not found answer must leave no record behind"
    );

    // The miss is asked upstream again rather than remembered.
    let error = service.fetch_or_cache(&key).await.expect_err("still missing");
    assert!(matches!(error, AppError::NotFound));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn upstream_failure_leaves_stale_record_untouched() {
    let store = Arc::new(MemoryStore::new());
    let key = RequestKey::profile("aiko");
    let stale_at = OffsetDateTime::now_utc() - Duration::minutes(10);
    let seeded = CacheRecord::new(fingerprint(&key), document("old"), stale_at);
    store.insert(key.kind, &seeded).await.expect("seed record");

    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::unreachable(
        "connection refused",
    ))]));
    let service = FetchCache::new(store.clone(), provider.clone(), short_profile_windows());

    let error = service.fetch_or_cache(&key).await.expect_err("refresh fails");
    assert!(matches!(error, AppError::Upstream(_)));
    assert_eq!(provider.calls(), 1);

    let after = store
        .lookup(key.kind, &fingerprint(&key))
        .await
        .expect("store reachable")
        .expect("record still present");
    assert_eq!(after.payload, document("old"));
    assert_eq!(after.modified_at, stale_at, "failed refresh must not advance the record");
}

#[tokio::test]
async fn stale_record_is_refreshed_in_place() {
    let store = Arc::new(MemoryStore::new());
    let key = RequestKey::profile("aiko");
    let stale_at = OffsetDateTime::now_utc() - Duration::minutes(10);
    let seeded = CacheRecord::new(fingerprint(&key), document("old"), stale_at);
    store.insert(key.kind, &seeded).await.expect("seed record");

    let provider = Arc::new(ScriptedProvider::new(vec![Ok(document("new"))]));
    let service = FetchCache::new(store.clone(), provider.clone(), short_profile_windows());

    let outcome = service.fetch_or_cache(&key).await.expect("refresh succeeds");
    assert_eq!(outcome.status, CacheStatus::Refreshed);
    assert_eq!(outcome.record.payload, document("new"));
    assert!(outcome.record.modified_at > stale_at);
    assert_eq!(
        outcome.record.created_at, stale_at,
        "refresh must keep the original creation time"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn concurrent_first_reads_converge_on_one_record() {
    const READERS: usize = 8;

    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(BarrierProvider::new(document("aiko"), READERS));
    let service = Arc::new(FetchCache::new(
        store.clone(),
        provider.clone(),
        FreshnessWindows::default(),
    ));

    let tasks = (0..READERS).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            let key = RequestKey::profile("aiko");
            service.fetch_or_cache(&key).await
        })
    });

    for joined in join_all(tasks).await {
        let outcome = joined.expect("task completes").expect("read succeeds");
        assert_eq!(outcome.status, CacheStatus::Miss);
        assert_eq!(outcome.record.payload, document("aiko"));
    }
    assert_eq!(provider.calls(), READERS);

    let key = RequestKey::profile("aiko");
    let settled = store
        .lookup(key.kind, &fingerprint(&key))
        .await
        .expect("store reachable")
        .expect("record persisted");
    assert_eq!(settled.payload, document("aiko"));
}

#[tokio::test]
async fn status_aliases_share_one_cache_entry() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(document("list"))]));
    let service = FetchCache::new(store.clone(), provider.clone(), FreshnessWindows::default());

    let ptw = StatusFilter::parse(Medium::Anime, "ptw").expect("alias parses");
    let spelled_out = StatusFilter::parse(Medium::Anime, "plantowatch").expect("alias parses");

    let first = service
        .fetch_or_cache(&RequestKey::anime_list("aiko", ptw, 1))
        .await
        .expect("first read succeeds");
    let second = service
        .fetch_or_cache(&RequestKey::anime_list("aiko", spelled_out, 1))
        .await
        .expect("second read succeeds");

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(provider.calls(), 1);
}
