//! In-memory cache store used when no database is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::application::store::{CacheStore, StoreError};
use crate::domain::entities::{CacheRecord, Fingerprint};
use crate::domain::types::ResourceKind;

const MEMORY_UNIQUE_CONSTRAINT: &str = "memory_records_pkey";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    kind: ResourceKind,
    fingerprint: Fingerprint,
}

/// Process-local store keyed by `(kind, fingerprint)`.
///
/// Gives a single instance the same read-through behavior as the Postgres
/// store without an external service. Contents do not survive restarts.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, CacheRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: ResourceKind, fingerprint: &Fingerprint) -> RecordKey {
        RecordKey {
            kind,
            fingerprint: fingerprint.clone(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn lookup(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self
            .records
            .get(&Self::key(kind, fingerprint))
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, kind: ResourceKind, record: &CacheRecord) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(Self::key(kind, &record.fingerprint)) {
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                Ok(())
            }
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                constraint: MEMORY_UNIQUE_CONSTRAINT.to_string(),
            }),
        }
    }

    async fn update(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
        payload: &Map<String, Value>,
        modified_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(Self::key(kind, fingerprint)) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.modified_at <= modified_at {
                    record.payload = payload.clone();
                    record.modified_at = modified_at;
                }
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
