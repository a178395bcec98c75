//! Shared domain enumerations for cacheable resources.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Every cacheable resource kind. Each kind names one logical collection in
/// the store, so records of different kinds can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Profile,
    History,
    Friends,
    Reviews,
    Recommendations,
    Clubs,
    RecentlyOnline,
    AnimeList,
    MangaList,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Profile,
        ResourceKind::History,
        ResourceKind::Friends,
        ResourceKind::Reviews,
        ResourceKind::Recommendations,
        ResourceKind::Clubs,
        ResourceKind::RecentlyOnline,
        ResourceKind::AnimeList,
        ResourceKind::MangaList,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::History => "history",
            ResourceKind::Friends => "friends",
            ResourceKind::Reviews => "reviews",
            ResourceKind::Recommendations => "recommendations",
            ResourceKind::Clubs => "clubs",
            ResourceKind::RecentlyOnline => "recently_online",
            ResourceKind::AnimeList => "anime_list",
            ResourceKind::MangaList => "manga_list",
        }
    }
}

/// Which medium a history or list request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Anime,
    Manga,
}

impl Medium {
    pub fn as_str(self) -> &'static str {
        match self {
            Medium::Anime => "anime",
            Medium::Manga => "manga",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.to_ascii_lowercase().as_str() {
            "anime" => Ok(Medium::Anime),
            "manga" => Ok(Medium::Manga),
            _ => Err(DomainError::validation(format!(
                "media type `{raw}` is not supported, expected `anime` or `manga`"
            ))),
        }
    }
}

/// Status buckets shared by anime and manga lists.
///
/// The watch-side and read-side spellings collapse into one bucket each, so
/// `watching` on an anime list and `reading` on a manga list are the same
/// filter as far as the cache and the provider are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    Current,
    Completed,
    OnHold,
    Dropped,
    Planned,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Current => "current",
            StatusFilter::Completed => "completed",
            StatusFilter::OnHold => "on_hold",
            StatusFilter::Dropped => "dropped",
            StatusFilter::Planned => "planned",
        }
    }

    /// Numeric bucket the upstream provider expects.
    pub fn bucket(self) -> u8 {
        match self {
            StatusFilter::All => 7,
            StatusFilter::Current => 1,
            StatusFilter::Completed => 2,
            StatusFilter::OnHold => 3,
            StatusFilter::Dropped => 4,
            StatusFilter::Planned => 6,
        }
    }

    /// Parses a status token as spelled for the given medium, case-insensitively.
    ///
    /// Anime lists speak the watch-side vocabulary (`watching`, `plantowatch`,
    /// `ptw`), manga lists the read-side one (`reading`, `plantoread`, `ptr`).
    pub fn parse(medium: Medium, raw: &str) -> Result<Self, DomainError> {
        let token = raw.to_ascii_lowercase();
        let parsed = match (medium, token.as_str()) {
            (_, "all") => Some(StatusFilter::All),
            (Medium::Anime, "watching") | (Medium::Manga, "reading") => Some(StatusFilter::Current),
            (_, "completed") => Some(StatusFilter::Completed),
            (_, "onhold") => Some(StatusFilter::OnHold),
            (_, "dropped") => Some(StatusFilter::Dropped),
            (Medium::Anime, "plantowatch" | "ptw") => Some(StatusFilter::Planned),
            (Medium::Manga, "plantoread" | "ptr") => Some(StatusFilter::Planned),
            _ => None,
        };
        parsed.ok_or_else(|| {
            DomainError::validation(format!(
                "status filter `{raw}` is not supported for {} lists",
                medium.as_str()
            ))
        })
    }
}
