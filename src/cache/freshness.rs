//! Per-resource freshness windows.
//!
//! Controls how long each resource kind stays servable from the store via
//! `kura.toml`.

use time::{Duration, OffsetDateTime};

use crate::domain::entities::CacheRecord;
use crate::domain::types::ResourceKind;

/// How long each resource kind stays fresh after its last refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessWindows {
    pub profile: Duration,
    pub history: Duration,
    pub friends: Duration,
    pub reviews: Duration,
    pub recommendations: Duration,
    pub clubs: Duration,
    pub recently_online: Duration,
    pub anime_list: Duration,
    pub manga_list: Duration,
}

impl Default for FreshnessWindows {
    fn default() -> Self {
        Self::from(&crate::config::FreshnessSettings::default())
    }
}

impl From<&crate::config::FreshnessSettings> for FreshnessWindows {
    fn from(settings: &crate::config::FreshnessSettings) -> Self {
        Self {
            profile: Duration::seconds(settings.profile_ttl_secs as i64),
            history: Duration::seconds(settings.history_ttl_secs as i64),
            friends: Duration::seconds(settings.friends_ttl_secs as i64),
            reviews: Duration::seconds(settings.reviews_ttl_secs as i64),
            recommendations: Duration::seconds(settings.recommendations_ttl_secs as i64),
            clubs: Duration::seconds(settings.clubs_ttl_secs as i64),
            recently_online: Duration::seconds(settings.recently_online_ttl_secs as i64),
            anime_list: Duration::seconds(settings.anime_list_ttl_secs as i64),
            manga_list: Duration::seconds(settings.manga_list_ttl_secs as i64),
        }
    }
}

impl FreshnessWindows {
    /// Window for one resource kind.
    pub fn window(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::Profile => self.profile,
            ResourceKind::History => self.history,
            ResourceKind::Friends => self.friends,
            ResourceKind::Reviews => self.reviews,
            ResourceKind::Recommendations => self.recommendations,
            ResourceKind::Clubs => self.clubs,
            ResourceKind::RecentlyOnline => self.recently_online,
            ResourceKind::AnimeList => self.anime_list,
            ResourceKind::MangaList => self.manga_list,
        }
    }

    /// Whether a stored record is past its window at `now`.
    ///
    /// A record exactly at the boundary is still fresh; staleness requires
    /// strictly exceeding the window.
    pub fn is_stale(&self, record: &CacheRecord, kind: ResourceKind, now: OffsetDateTime) -> bool {
        record.age(now) > self.window(kind)
    }
}
