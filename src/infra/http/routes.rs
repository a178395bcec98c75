//! Route table and request handlers for the caching proxy.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::Deserialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};
use super::store_health_response;
use crate::application::envelope::Envelope;
use crate::application::error::AppError;
use crate::application::service::FetchCache;
use crate::application::store::CacheStore;
use crate::domain::request::{RequestKey, page_or_default};
use crate::domain::types::{Medium, StatusFilter};

/// Response header naming how the cache satisfied the request.
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

const HTTP_DATE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[derive(Clone)]
pub struct HttpState {
    pub service: Arc<FetchCache>,
    pub store: Arc<dyn CacheStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/users/recently-online", get(recently_online))
        .route("/users/{username}", get(profile))
        .route("/users/{username}/history", get(history))
        .route("/users/{username}/history/{medium}", get(history_by_medium))
        .route("/users/{username}/friends", get(friends))
        .route("/users/{username}/reviews", get(reviews))
        .route("/users/{username}/recommendations", get(recommendations))
        .route("/users/{username}/clubs", get(clubs))
        .route("/users/{username}/animelist", get(anime_list))
        .route("/users/{username}/animelist/{status}", get(anime_list_by_status))
        .route("/users/{username}/mangalist", get(manga_list))
        .route("/users/{username}/mangalist/{status}", get(manga_list_by_status))
        .route("/_health/store", get(store_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

/// Parses `?page=` by hand so malformed values surface as the service's own
/// error body instead of the extractor's plain-text rejection.
fn requested_page(query: &PageQuery) -> Result<u32, AppError> {
    let explicit = match query.page.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
            AppError::BadRequest(format!("page `{raw}` is not a positive integer"))
        })?),
    };
    Ok(page_or_default(explicit)?)
}

async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &headers, RequestKey::profile(&username)).await
}

async fn history(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &headers, RequestKey::history(&username, None)).await
}

async fn history_by_medium(
    State(state): State<HttpState>,
    Path((username, medium)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let medium = match Medium::parse(&medium) {
        Ok(medium) => medium,
        Err(error) => return AppError::from(error).into_response(),
    };
    serve(&state, &headers, RequestKey::history(&username, Some(medium))).await
}

async fn friends(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let page = match requested_page(&query) {
        Ok(page) => page,
        Err(error) => return error.into_response(),
    };
    serve(&state, &headers, RequestKey::friends(&username, page)).await
}

async fn reviews(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let page = match requested_page(&query) {
        Ok(page) => page,
        Err(error) => return error.into_response(),
    };
    serve(&state, &headers, RequestKey::reviews(&username, page)).await
}

async fn recommendations(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    let page = match requested_page(&query) {
        Ok(page) => page,
        Err(error) => return error.into_response(),
    };
    serve(&state, &headers, RequestKey::recommendations(&username, page)).await
}

async fn clubs(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    serve(&state, &headers, RequestKey::clubs(&username)).await
}

async fn recently_online(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    serve(&state, &headers, RequestKey::recently_online()).await
}

async fn anime_list(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    list(&state, &headers, Medium::Anime, &username, None, &query).await
}

async fn anime_list_by_status(
    State(state): State<HttpState>,
    Path((username, status)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    list(&state, &headers, Medium::Anime, &username, Some(&status), &query).await
}

async fn manga_list(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    list(&state, &headers, Medium::Manga, &username, None, &query).await
}

async fn manga_list_by_status(
    State(state): State<HttpState>,
    Path((username, status)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    list(&state, &headers, Medium::Manga, &username, Some(&status), &query).await
}

/// Shared funnel for both list flavors. Status and page are validated before
/// the cache or provider is ever consulted.
async fn list(
    state: &HttpState,
    headers: &HeaderMap,
    medium: Medium,
    username: &str,
    status: Option<&str>,
    query: &PageQuery,
) -> Response {
    let status = match status {
        None => StatusFilter::All,
        Some(raw) => match StatusFilter::parse(medium, raw) {
            Ok(status) => status,
            Err(error) => return AppError::from(error).into_response(),
        },
    };
    let page = match requested_page(query) {
        Ok(page) => page,
        Err(error) => return error.into_response(),
    };
    let key = match medium {
        Medium::Anime => RequestKey::anime_list(username, status, page),
        Medium::Manga => RequestKey::manga_list(username, status, page),
    };
    serve(state, headers, key).await
}

async fn store_health(State(state): State<HttpState>) -> Response {
    store_health_response(state.store.health_check().await)
}

async fn fallback() -> Response {
    ApiError::not_found("Route not found").into_response()
}

async fn serve(state: &HttpState, headers: &HeaderMap, key: RequestKey) -> Response {
    match state.service.fetch_or_cache(&key).await {
        Ok(outcome) => envelope_response(headers, Envelope::from_outcome(outcome)),
        Err(error) => error.into_response(),
    }
}

fn envelope_response(headers: &HeaderMap, envelope: Envelope) -> Response {
    let revalidated = headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|validator| validator.as_bytes() == envelope.etag.as_bytes());

    let mut response = if revalidated {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(&envelope.payload).into_response()
    };
    apply_cache_headers(&mut response, &envelope);
    response
}

fn apply_cache_headers(response: &mut Response, envelope: &Envelope) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&envelope.etag) {
        headers.insert(header::ETAG, value);
    }
    if let Some(value) = http_date(envelope.last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    if let Some(value) = http_date(envelope.expires) {
        headers.insert(header::EXPIRES, value);
    }
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(envelope.cache_status.as_str()),
    );
}

fn http_date(at: OffsetDateTime) -> Option<HeaderValue> {
    let formatted = at.to_offset(UtcOffset::UTC).format(HTTP_DATE_FORMAT).ok()?;
    HeaderValue::from_str(&formatted).ok()
}
