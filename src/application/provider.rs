//! Provider trait describing the upstream document source.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::request::RequestKey;

/// JSON object a provider returns for one request.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested subject does not exist upstream. Never cached, so the
    /// next request for the same key asks upstream again.
    #[error("subject not found upstream")]
    NotFound,
    /// The upstream could not be reached or answered abnormally.
    #[error("upstream unreachable: {reason}")]
    Unreachable { reason: String },
    /// The upstream answered but the body could not be understood.
    #[error("upstream payload malformed: {reason}")]
    Malformed { reason: String },
}

impl ProviderError {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Seam to the slow upstream source.
///
/// Implementations perform exactly one fetch attempt per call. Retry and
/// freshness decisions belong to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn fetch(&self, key: &RequestKey) -> Result<Document, ProviderError>;
}
