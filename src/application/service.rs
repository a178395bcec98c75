//! Read-through orchestration: the one path every cacheable request takes.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use time::{Duration, OffsetDateTime};
use tracing::{debug, instrument};

use crate::application::error::AppError;
use crate::application::provider::Provider;
use crate::application::store::{CacheStore, StoreError};
use crate::cache::{FreshnessWindows, fingerprint};
use crate::domain::entities::CacheRecord;
use crate::domain::request::RequestKey;

const METRIC_CACHE_HIT_TOTAL: &str = "kura_cache_hit_total";
const METRIC_CACHE_MISS_TOTAL: &str = "kura_cache_miss_total";
const METRIC_CACHE_REFRESH_TOTAL: &str = "kura_cache_refresh_total";
const METRIC_UPSTREAM_ERROR_TOTAL: &str = "kura_upstream_error_total";
const METRIC_UPSTREAM_FETCH_MS: &str = "kura_upstream_fetch_ms";

/// How a request was satisfied relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Refreshed,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Refreshed => "refreshed",
        }
    }
}

/// What [`FetchCache::fetch_or_cache`] hands to the response layer.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub record: CacheRecord,
    pub status: CacheStatus,
    pub window: Duration,
}

/// Read-through service joining the store, the provider, and the freshness
/// windows. One instance is shared across all requests.
pub struct FetchCache {
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn Provider>,
    windows: FreshnessWindows,
}

impl FetchCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        provider: Arc<dyn Provider>,
        windows: FreshnessWindows,
    ) -> Self {
        Self {
            store,
            provider,
            windows,
        }
    }

    /// Serves one request through the cache.
    ///
    /// A fresh record is served as-is. An absent or stale record triggers
    /// exactly one provider fetch whose result is upserted and then re-read,
    /// so the response always reflects what the store holds rather than what
    /// this writer fetched. A lost insert race is retried as an update
    /// instead of surfacing the conflict; upstream failures surface without
    /// touching the store, stale record or not.
    ///
    /// No lock is held across the lookup, the fetch, or the write.
    #[instrument(skip(self), fields(kind = key.kind.as_str(), subject = %key.subject))]
    pub async fn fetch_or_cache(&self, key: &RequestKey) -> Result<FetchOutcome, AppError> {
        let kind = key.kind;
        let fingerprint = fingerprint(key);
        let window = self.windows.window(kind);

        let existing = self.store.lookup(kind, &fingerprint).await?;
        let now = OffsetDateTime::now_utc();
        let had_record = existing.is_some();
        if let Some(record) = existing {
            if !self.windows.is_stale(&record, kind, now) {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                debug!(fingerprint = %fingerprint, "serving fresh record");
                return Ok(FetchOutcome {
                    record,
                    status: CacheStatus::Hit,
                    window,
                });
            }
        }

        let fetch_started_at = Instant::now();
        let document = match self.provider.fetch(key).await {
            Ok(document) => document,
            Err(error) => {
                counter!(METRIC_UPSTREAM_ERROR_TOTAL).increment(1);
                return Err(AppError::from(error));
            }
        };
        histogram!(METRIC_UPSTREAM_FETCH_MS)
            .record(fetch_started_at.elapsed().as_secs_f64() * 1000.0);

        let written_at = OffsetDateTime::now_utc();
        if had_record {
            self.store
                .update(kind, &fingerprint, &document, written_at)
                .await?;
        } else {
            let record = CacheRecord::new(fingerprint.clone(), document, written_at);
            match self.store.insert(kind, &record).await {
                Ok(()) => {}
                Err(StoreError::Duplicate { .. }) => {
                    // Another writer created the record first; apply ours as
                    // a refresh of theirs.
                    self.store
                        .update(kind, &fingerprint, &record.payload, record.modified_at)
                        .await?;
                }
                Err(error) => return Err(AppError::from(error)),
            }
        }

        // Authoritative re-read: concurrent writers must all answer with the
        // record the store settled on.
        let record = self
            .store
            .lookup(kind, &fingerprint)
            .await?
            .ok_or_else(|| AppError::from(StoreError::integrity("record missing after upsert")))?;

        let status = if had_record {
            counter!(METRIC_CACHE_REFRESH_TOTAL).increment(1);
            CacheStatus::Refreshed
        } else {
            counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
            CacheStatus::Miss
        };
        debug!(fingerprint = %fingerprint, status = status.as_str(), "record written");
        Ok(FetchOutcome {
            record,
            status,
            window,
        })
    }
}
