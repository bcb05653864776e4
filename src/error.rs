use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// The four error kinds of the error-handling design, collapsed into one enum so the
/// router boundary is the only place that ever matches on a variant.
pub enum AppError {
    /// Transient upstream failure: feed fetch, LLM, vector, doc-store, edge cache.
    Upstream(String),
    /// Parse/validation failure on an individual item; callers skip and continue.
    Invalid(String),
    /// Contract violation at the router boundary (bad JSON, unknown route, bad method).
    Contract(String),
    /// Programmer error / unexpected failure deep in a handler.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Upstream(msg) => {
                tracing::warn!(%msg, "upstream failure reached router boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Contract(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(%msg, "unhandled internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<eyre::Error> for AppError {
    fn from(e: eyre::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::Contract(e.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

pub fn not_found(path: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("not found: {path}"),
        }),
    )
        .into_response()
}
