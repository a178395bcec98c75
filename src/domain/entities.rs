//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Hex-encoded digest identifying one cached request within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cached upstream document with its lifecycle timestamps.
///
/// `created_at` is set once on first insert and never changes; refreshes
/// replace the payload and advance `modified_at` only. The store keeps at
/// most one record per fingerprint within a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheRecord {
    pub fingerprint: Fingerprint,
    pub payload: Map<String, Value>,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

impl CacheRecord {
    /// A brand-new record whose two timestamps coincide.
    pub fn new(fingerprint: Fingerprint, payload: Map<String, Value>, at: OffsetDateTime) -> Self {
        Self {
            fingerprint,
            payload,
            created_at: at,
            modified_at: at,
        }
    }

    /// Age of the cached payload relative to `now`.
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.modified_at
    }
}
