//! HTTP adapter for the scraper service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::instrument;

use crate::application::provider::{Document, Provider, ProviderError};
use crate::config::UpstreamSettings;
use crate::domain::request::RequestKey;
use crate::domain::types::ResourceKind;

/// Client for the MyAnimeList scraper service.
///
/// One instance is shared across all requests; reqwest pools connections
/// internally. Every fetch is a GET whose path and query are derived from
/// the request key.
#[derive(Debug, Clone)]
pub struct ScraperClient {
    client: Client,
    base: Url,
}

impl ScraperClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("kura/", env!("CARGO_PKG_VERSION"))
    }

    fn url_for(&self, key: &RequestKey) -> Result<Url, ProviderError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ProviderError::unreachable("upstream base URL cannot carry path segments")
            })?;
            segments.pop_if_empty().push("users");
            match key.kind {
                ResourceKind::RecentlyOnline => {
                    segments.push("recently-online");
                }
                ResourceKind::Profile => {
                    segments.push(&key.subject);
                }
                ResourceKind::History => {
                    segments.push(&key.subject).push("history");
                }
                ResourceKind::Friends => {
                    segments.push(&key.subject).push("friends");
                }
                ResourceKind::Reviews => {
                    segments.push(&key.subject).push("reviews");
                }
                ResourceKind::Recommendations => {
                    segments.push(&key.subject).push("recommendations");
                }
                ResourceKind::Clubs => {
                    segments.push(&key.subject).push("clubs");
                }
                ResourceKind::AnimeList => {
                    segments.push(&key.subject).push("animelist");
                }
                ResourceKind::MangaList => {
                    segments.push(&key.subject).push("mangalist");
                }
            }
        }

        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(medium) = key.params.medium {
            pairs.push(("type", medium.as_str().to_string()));
        }
        if let Some(status) = key.params.status {
            pairs.push(("status", status.bucket().to_string()));
        }
        if matches!(
            key.kind,
            ResourceKind::Friends
                | ResourceKind::Reviews
                | ResourceKind::Recommendations
                | ResourceKind::AnimeList
                | ResourceKind::MangaList
        ) {
            pairs.push(("page", key.params.page.to_string()));
        }

        if !pairs.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (name, value) in &pairs {
                qp.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Provider for ScraperClient {
    #[instrument(skip(self), fields(kind = key.kind.as_str()))]
    async fn fetch(&self, key: &RequestKey) -> Result<Document, ProviderError> {
        let url = self.url_for(key)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProviderError::unreachable(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound),
            status if !status.is_success() => {
                return Err(ProviderError::unreachable(format!(
                    "upstream answered {status}"
                )));
            }
            _ => {}
        }

        let value: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::malformed(err.to_string()))?;

        match value {
            Value::Object(document) => Ok(document),
            _ => Err(ProviderError::malformed(
                "expected a JSON object at the top level",
            )),
        }
    }
}
