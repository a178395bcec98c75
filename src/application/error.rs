use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::provider::ProviderError;
use crate::application::store::StoreError;
use crate::domain::error::DomainError;
use crate::infra::http::error::{ApiErrorBody, ApiErrorMessage, codes};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure taxonomy the caller sees. Everything a request can go wrong with
/// collapses into one of these four.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("subject not found upstream")]
    NotFound,
    #[error("upstream fetch failed")]
    Upstream(#[source] ProviderError),
    #[error("cache store failed")]
    Store(#[source] StoreError),
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        AppError::BadRequest(error.public_detail().to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotFound => AppError::NotFound,
            other => AppError::Upstream(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        AppError::Store(error)
    }
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::NotFound => codes::NOT_FOUND,
            AppError::Upstream(_) => codes::UPSTREAM_ERROR,
            AppError::Store(_) => codes::STORE_UNAVAILABLE,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "Request could not be processed",
            AppError::NotFound => "Resource not found",
            AppError::Upstream(_) => "Upstream provider failed",
            AppError::Store(_) => "Cache store temporarily unavailable",
        }
    }

    /// Caller-safe detail. Validation problems are echoed back; upstream and
    /// store internals are not.
    fn public_hint(&self) -> Option<String> {
        match self {
            AppError::BadRequest(detail) => Some(detail.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.error_code().to_string(),
                message: self.presentation_message().to_string(),
                hint: self.public_hint(),
            },
        };
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
