//! Deterministic request fingerprinting.
//!
//! Every lookup and write against the store is keyed by the digest computed
//! here; the canonical encoding below is the only thing that decides whether
//! two requests share a record.

use sha2::{Digest, Sha256};

use crate::domain::entities::Fingerprint;
use crate::domain::request::RequestKey;
use crate::domain::types::{Medium, StatusFilter};

/// Digests a request key into its cache fingerprint.
///
/// The encoding is one line per field in fixed order, with canonical
/// defaults already applied by [`RequestKey`] construction. The resource
/// kind always participates, so equal subjects of different kinds can never
/// collide.
pub fn fingerprint(key: &RequestKey) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(key.kind.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(key.subject.as_bytes());
    hasher.update(b"\n");
    hasher.update(format!("page={}", key.params.page).as_bytes());
    hasher.update(b"\n");
    let medium = key.params.medium.map(Medium::as_str).unwrap_or("");
    hasher.update(format!("medium={medium}").as_bytes());
    hasher.update(b"\n");
    let status = key.params.status.map(StatusFilter::as_str).unwrap_or("");
    hasher.update(format!("status={status}").as_bytes());
    Fingerprint::new(hex::encode(hasher.finalize()))
}
