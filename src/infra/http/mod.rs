//! HTTP surface: router, handlers, middleware, and error bodies.

pub mod error;
mod middleware;
mod routes;

pub use routes::{CACHE_STATUS_HEADER, HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::store::StoreError;

/// Health probe response for the backing store. Degrades to 503 with a
/// diagnostic report instead of failing the whole process.
fn store_health_response(result: Result<(), StoreError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::store_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &error,
            )
            .attach(&mut response);
            response
        }
    }
}
