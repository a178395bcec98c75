//! Response envelope assembly.
//!
//! Pure presentation of a served record: the payload plus the cache metadata
//! callers revalidate against. Building an envelope never touches the store
//! or the provider.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::application::service::{CacheStatus, FetchOutcome};
use crate::domain::entities::CacheRecord;

/// Payload plus cache metadata for one served record.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub payload: Map<String, Value>,
    pub etag: String,
    pub last_modified: OffsetDateTime,
    pub expires: OffsetDateTime,
    pub cache_status: CacheStatus,
}

impl Envelope {
    pub fn from_outcome(outcome: FetchOutcome) -> Self {
        let etag = etag_for(&outcome.record);
        let expires = outcome.record.modified_at + outcome.window;
        Self {
            etag,
            last_modified: outcome.record.modified_at,
            expires,
            cache_status: outcome.status,
            payload: outcome.record.payload,
        }
    }
}

/// Strong validator over what makes a response distinct: which record it is
/// and when that record last changed.
fn etag_for(record: &CacheRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.fingerprint.as_str().as_bytes());
    hasher.update(record.modified_at.unix_timestamp_nanos().to_be_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("\"{}\"", &digest[..32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Fingerprint;
    use time::Duration;
    use time::macros::datetime;

    fn outcome_at(modified_at: OffsetDateTime) -> FetchOutcome {
        let mut payload = Map::new();
        payload.insert("username".to_string(), Value::String("neko".to_string()));
        FetchOutcome {
            record: CacheRecord::new(Fingerprint::new("ab".repeat(32)), payload, modified_at),
            status: CacheStatus::Hit,
            window: Duration::hours(1),
        }
    }

    #[test]
    fn payload_passes_through_untouched() {
        let outcome = outcome_at(datetime!(2024-03-01 12:00 UTC));
        let expected = outcome.record.payload.clone();
        let envelope = Envelope::from_outcome(outcome);
        assert_eq!(envelope.payload, expected);
    }

    #[test]
    fn expires_is_modified_plus_window() {
        let modified = datetime!(2024-03-01 12:00 UTC);
        let envelope = Envelope::from_outcome(outcome_at(modified));
        assert_eq!(envelope.last_modified, modified);
        assert_eq!(envelope.expires, modified + Duration::hours(1));
    }

    #[test]
    fn etag_is_stable_for_an_unchanged_record() {
        let modified = datetime!(2024-03-01 12:00 UTC);
        let first = Envelope::from_outcome(outcome_at(modified));
        let second = Envelope::from_outcome(outcome_at(modified));
        assert_eq!(first.etag, second.etag);
    }

    #[test]
    fn etag_changes_when_the_record_is_refreshed() {
        let first = Envelope::from_outcome(outcome_at(datetime!(2024-03-01 12:00 UTC)));
        let second = Envelope::from_outcome(outcome_at(datetime!(2024-03-01 13:00 UTC)));
        assert_ne!(first.etag, second.etag);
    }

    #[test]
    fn etag_distinguishes_refreshes_within_the_same_second() {
        let base = datetime!(2024-03-01 12:00 UTC);
        let first = Envelope::from_outcome(outcome_at(base + Duration::milliseconds(125)));
        let second = Envelope::from_outcome(outcome_at(base + Duration::milliseconds(875)));
        assert_ne!(first.etag, second.etag);
    }

    #[test]
    fn etag_is_a_quoted_strong_validator() {
        let envelope = Envelope::from_outcome(outcome_at(datetime!(2024-03-01 12:00 UTC)));
        assert!(envelope.etag.starts_with('"') && envelope.etag.ends_with('"'));
        assert_eq!(envelope.etag.len(), 34);
    }
}
