//! Request identity: everything a cacheable request is keyed on.

use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::types::{Medium, ResourceKind, StatusFilter};

/// Page assumed when a paged resource is requested without one, so `?page=1`
/// and no parameter at all share a cache entry.
pub const DEFAULT_PAGE: u32 = 1;

/// Canonical identity of one cacheable request.
///
/// Two requests with the same key are the same cache entry; the fingerprint
/// hashes exactly the fields here. Subjects are lowercased on construction
/// because MyAnimeList usernames are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestKey {
    pub kind: ResourceKind,
    pub subject: String,
    pub params: RequestParams,
}

/// Narrowing parameters beyond the subject, with canonical defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestParams {
    pub page: u32,
    pub medium: Option<Medium>,
    pub status: Option<StatusFilter>,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            medium: None,
            status: None,
        }
    }
}

impl RequestKey {
    fn new(kind: ResourceKind, subject: &str, params: RequestParams) -> Self {
        Self {
            kind,
            subject: subject.to_ascii_lowercase(),
            params,
        }
    }

    pub fn profile(username: &str) -> Self {
        Self::new(ResourceKind::Profile, username, RequestParams::default())
    }

    /// History of one user, optionally narrowed to a single medium.
    pub fn history(username: &str, medium: Option<Medium>) -> Self {
        Self::new(
            ResourceKind::History,
            username,
            RequestParams {
                medium,
                ..RequestParams::default()
            },
        )
    }

    pub fn friends(username: &str, page: u32) -> Self {
        Self::new(
            ResourceKind::Friends,
            username,
            RequestParams {
                page,
                ..RequestParams::default()
            },
        )
    }

    pub fn reviews(username: &str, page: u32) -> Self {
        Self::new(
            ResourceKind::Reviews,
            username,
            RequestParams {
                page,
                ..RequestParams::default()
            },
        )
    }

    pub fn recommendations(username: &str, page: u32) -> Self {
        Self::new(
            ResourceKind::Recommendations,
            username,
            RequestParams {
                page,
                ..RequestParams::default()
            },
        )
    }

    pub fn clubs(username: &str) -> Self {
        Self::new(ResourceKind::Clubs, username, RequestParams::default())
    }

    /// Site-wide listing, not tied to any subject.
    pub fn recently_online() -> Self {
        Self::new(ResourceKind::RecentlyOnline, "", RequestParams::default())
    }

    pub fn anime_list(username: &str, status: StatusFilter, page: u32) -> Self {
        Self::new(
            ResourceKind::AnimeList,
            username,
            RequestParams {
                page,
                status: Some(status),
                ..RequestParams::default()
            },
        )
    }

    pub fn manga_list(username: &str, status: StatusFilter, page: u32) -> Self {
        Self::new(
            ResourceKind::MangaList,
            username,
            RequestParams {
                page,
                status: Some(status),
                ..RequestParams::default()
            },
        )
    }
}

/// Validates an explicit page number, falling back to [`DEFAULT_PAGE`] when
/// the caller sent none.
pub fn page_or_default(raw: Option<u32>) -> Result<u32, DomainError> {
    match raw {
        None => Ok(DEFAULT_PAGE),
        Some(0) => Err(DomainError::validation("page must be 1 or greater")),
        Some(page) => Ok(page),
    }
}
