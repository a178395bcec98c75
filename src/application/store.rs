//! Store trait describing cache persistence adapters.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CacheRecord, Fingerprint};
use crate::domain::types::ResourceKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("store timeout")]
    Timeout,
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Persistence seam for cached records.
///
/// The store keeps at most one record per `(kind, fingerprint)` pair and
/// never deletes on its own. Writes are durable before the call returns, so
/// a completed upsert is immediately visible to a subsequent lookup.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches the record for a fingerprint, fresh or stale.
    async fn lookup(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CacheRecord>, StoreError>;

    /// Creates a record, failing with [`StoreError::Duplicate`] when one
    /// already exists for the fingerprint.
    async fn insert(&self, kind: ResourceKind, record: &CacheRecord) -> Result<(), StoreError>;

    /// Replaces the payload and advances `modified_at` on an existing
    /// record, failing with [`StoreError::NotFound`] when absent.
    ///
    /// Updates are last-writer-wins with a monotonic guard: a write whose
    /// `modified_at` is older than the stored one leaves the record in
    /// place and still reports success, so racing refreshes converge on the
    /// newest payload regardless of completion order.
    async fn update(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
        payload: &Map<String, Value>,
        modified_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Cheap reachability probe for health reporting.
    async fn health_check(&self) -> Result<(), StoreError>;
}
