use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use flowline_graph::GraphError;

/// Admin-facing errors, rendered as `{ "error": message }` JSON.
#[derive(Debug)]
pub enum AdminError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AdminError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AdminError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            AdminError::NotFound(msg) => write!(f, "not found: {msg}"),
            AdminError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl From<GraphError> for AdminError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::FlowNotFound(_) | GraphError::PathNotFound => {
                AdminError::NotFound(err.to_string())
            }
            GraphError::InvalidFlow(_) | GraphError::InvalidPath(_) => {
                AdminError::BadRequest(err.to_string())
            }
            GraphError::PathNotUnique | GraphError::Corrupt(_) | GraphError::Database(_) => {
                AdminError::Internal(err.to_string())
            }
        }
    }
}
