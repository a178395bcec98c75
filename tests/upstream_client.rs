use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::RawQuery;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::json;
use url::Url;

use kura::application::provider::{Provider, ProviderError};
use kura::config::UpstreamSettings;
use kura::domain::request::RequestKey;
use kura::domain::types::{Medium, StatusFilter};
use kura::infra::upstream::ScraperClient;

/// Serves canned scraper responses on an ephemeral local port.
async fn spawn_upstream() -> SocketAddr {
    let router = Router::new()
        .route(
            "/users/aiko",
            get(|| async { axum::Json(json!({ "data": { "username": "aiko" } })) }),
        )
        .route("/users/ghost", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/users/broken",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/users/mojibake", get(|| async { "<html>not json</html>" }))
        .route("/users/arr", get(|| async { axum::Json(json!([1, 2, 3])) }))
        .route(
            "/users/aiko/animelist",
            get(|RawQuery(query): RawQuery| async move {
                axum::Json(json!({ "data": { "query": query.unwrap_or_default() } }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("upstream serves");
    });
    addr
}

fn client_for(addr: SocketAddr) -> ScraperClient {
    let settings = UpstreamSettings {
        base_url: Url::parse(&format!("http://{addr}")).expect("upstream url"),
        timeout: Duration::from_secs(5),
    };
    ScraperClient::new(&settings).expect("client builds")
}

#[tokio::test]
async fn successful_fetch_returns_the_document() {
    let client = client_for(spawn_upstream().await);

    let document = client
        .fetch(&RequestKey::profile("aiko"))
        .await
        .expect("fetch succeeds");
    assert_eq!(document.get("data"), Some(&json!({ "username": "aiko" })));
}

#[tokio::test]
async fn missing_subject_maps_to_not_found() {
    let client = client_for(spawn_upstream().await);

    let error = client
        .fetch(&RequestKey::profile("ghost"))
        .await
        .expect_err("missing subject fails");
    assert!(matches!(error, ProviderError::NotFound));
}

#[tokio::test]
async fn server_errors_map_to_unreachable() {
    let client = client_for(spawn_upstream().await);

    let error = client
        .fetch(&RequestKey::profile("broken"))
        .await
        .expect_err("server error fails");
    match error {
        ProviderError::Unreachable { reason } => assert!(reason.contains("500"), "{reason}"),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn refused_connections_map_to_unreachable() {
    // Bind and immediately drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("listener addr");
    drop(listener);

    let client = client_for(addr);
    let error = client
        .fetch(&RequestKey::profile("aiko"))
        .await
        .expect_err("refused connection fails");
    assert!(matches!(error, ProviderError::Unreachable { .. }));
}

#[tokio::test]
async fn non_json_bodies_map_to_malformed() {
    let client = client_for(spawn_upstream().await);

    let error = client
        .fetch(&RequestKey::profile("mojibake"))
        .await
        .expect_err("html body fails");
    assert!(matches!(error, ProviderError::Malformed { .. }));
}

#[tokio::test]
async fn non_object_documents_map_to_malformed() {
    let client = client_for(spawn_upstream().await);

    let error = client
        .fetch(&RequestKey::profile("arr"))
        .await
        .expect_err("array body fails");
    match error {
        ProviderError::Malformed { reason } => {
            assert!(reason.contains("JSON object"), "{reason}")
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[tokio::test]
async fn list_requests_carry_status_bucket_and_page() {
    let client = client_for(spawn_upstream().await);

    let status = StatusFilter::parse(Medium::Anime, "completed").expect("status parses");
    let document = client
        .fetch(&RequestKey::anime_list("aiko", status, 3))
        .await
        .expect("fetch succeeds");
    assert_eq!(
        document.get("data"),
        Some(&json!({ "query": "status=2&page=3" }))
    );
}
