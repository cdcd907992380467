use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Malformed id!")]
    MalformedId,
    #[error("{0}")]
    MissingField(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
    #[error("Unknown reaction type: {0}")]
    InvalidReaction(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

/// Renders an error as the JSON `{status, message}` body every API
/// failure uses.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        status: status.as_u16(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        error_response(status, self.to_string())
    }
}
